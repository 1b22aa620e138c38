use std::sync::{Arc, RwLock};

// BUFFER COMPONENT ------------------------------------------------------------

/// Bounded, append-only sample container that overwrites its oldest element
/// once full.
#[derive(Clone)]
pub struct RingBuffer {
    buffer: Vec<f64>,
    capacity: usize,
    end: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            capacity: capacity.max(1),
            end: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.buffer[self.end] = sample;
        self.end = (self.end + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Chronological snapshot of the most recent `n` samples. Returns `None`
    /// while fewer than `n` samples have been written, or when `n` exceeds
    /// the capacity; early cycles are "not ready" rather than an error.
    pub fn latest(&self, n: usize) -> Option<Vec<f64>> {
        if n > self.len || n > self.capacity {
            return None;
        }
        let mut out = Vec::with_capacity(n);
        let start = (self.end + self.capacity - n) % self.capacity;
        for i in 0..n {
            out.push(self.buffer[(start + i) % self.capacity]);
        }
        Some(out)
    }
}

// SHARED HANDLE ---------------------------------------------------------------

/// Single-writer, multi-reader handle shared between the acquisition
/// producer and the detectors. Readers only ever take snapshots, so a
/// coarse-grained read-write lock is sufficient.
#[derive(Clone)]
pub struct SharedSampleBuffer {
    inner: Arc<RwLock<RingBuffer>>,
}

impl SharedSampleBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RingBuffer::new(capacity))),
        }
    }

    pub fn push(&self, sample: f64) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push(sample);
    }

    pub fn latest(&self, n: usize) -> Option<Vec<f64>> {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.latest(n)
    }

    pub fn len(&self) -> usize {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.capacity()
    }
}
