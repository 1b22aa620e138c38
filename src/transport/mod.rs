use std::io::Write;
use std::net::TcpStream;
use std::sync::Mutex;

use colored::Colorize;
use log::debug;

use crate::errors::HardwareError;

/// Boundary to the stimulation hardware: one opaque synchronous call that
/// triggers a pre-programmed routine by index. Implementations own their
/// failure handling; callers never retry a fired command.
pub trait StimTransport: Send + Sync {
    fn fire(&self, function_index: u32) -> Result<(), HardwareError>;
}

/// Announces stimulation on the console. Stands in for real hardware in
/// demos and dry runs.
pub struct ConsoleTransport;

impl StimTransport for ConsoleTransport {
    fn fire(&self, function_index: u32) -> Result<(), HardwareError> {
        println!(
            "{} function {}",
            "STIM".red().bold(),
            function_index.to_string().yellow()
        );
        Ok(())
    }
}

/// Sends the function index to a stimulation server as big-endian bytes
/// over an established TCP connection.
pub struct TcpStimTransport {
    stream: Mutex<TcpStream>,
}

impl TcpStimTransport {
    pub fn connect(address: &str) -> Result<Self, HardwareError> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Mutex::new(stream),
        })
    }
}

impl StimTransport for TcpStimTransport {
    fn fire(&self, function_index: u32) -> Result<(), HardwareError> {
        let mut stream = self
            .stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stream.write_all(&function_index.to_be_bytes())?;
        stream.flush()?;
        debug!("sent stimulation function {function_index}");
        Ok(())
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Records fired indices; can be switched to fail every call.
    pub struct MockTransport {
        pub fired: Mutex<Vec<u32>>,
        pub failing: AtomicBool,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                fired: Mutex::new(Vec::new()),
                failing: AtomicBool::new(false),
            }
        }

        pub fn fail_next_calls(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn fired_count(&self) -> usize {
            self.fired.lock().unwrap().len()
        }
    }

    impl StimTransport for MockTransport {
        fn fire(&self, function_index: u32) -> Result<(), HardwareError> {
            self.fired.lock().unwrap().push(function_index);
            if self.failing.load(Ordering::SeqCst) {
                return Err(HardwareError::Rejected("mock transport failure".into()));
            }
            Ok(())
        }
    }
}
