use std::f64::consts::PI;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::buffer::SharedSampleBuffer;
use crate::config::DetectorConfig;
use crate::errors::ConfigError;
use crate::estimators::{self, PhaseEstimator};
use crate::transport::StimTransport;

const TWO_PI: f64 = 2.0 * PI;

/// What one polling cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Buffer not yet filled, estimator warming up, or a transient
    /// numerical problem; nothing to act on this cycle.
    NotReady,
    /// A phase estimate was produced but the fire condition did not hold.
    Monitored(f64),
    /// The stimulation command was issued at this phase.
    Fired(f64),
}

/// One closed-loop controller: owns an estimator, polls the shared buffer,
/// tracks the refractory gate and issues the fire command.
///
/// Two logical states: ARMED (`stim_ok`) and REFRACTORY. Created once per
/// configured target; runs until the process is terminated externally.
pub struct Detector {
    name: String,
    window_size: usize,
    // target phase arrives in [0, 2pi]; estimates live on the shifted
    // principal cycle, so the comparison happens against target - pi
    fire_threshold: f64,
    stim_function: u32,
    sample_period: Duration,
    estimator: Box<dyn PhaseEstimator>,
    buffer: SharedSampleBuffer,
    transport: Arc<dyn StimTransport>,
    prev_phase: Option<f64>,
    curr_phase: Option<f64>,
    stim_ok: bool,
}

impl Detector {
    pub fn new(
        config: &DetectorConfig,
        buffer: SharedSampleBuffer,
        transport: Arc<dyn StimTransport>,
    ) -> Result<Self, ConfigError> {
        if config.window_size == 0 {
            return Err(ConfigError::InvalidParameter(
                "window size must be at least 1".to_string(),
            ));
        }
        if config.window_size > buffer.capacity() {
            return Err(ConfigError::WindowExceedsBuffer {
                window: config.window_size,
                capacity: buffer.capacity(),
            });
        }
        if !(0.0..=TWO_PI).contains(&config.target_phase) {
            return Err(ConfigError::TargetPhaseOutOfRange(config.target_phase));
        }

        let estimator = estimators::build(config)?;
        info!("starting detector {}", config.name);

        Ok(Self {
            name: config.name.clone(),
            window_size: config.window_size,
            fire_threshold: config.target_phase - PI,
            stim_function: config.stim_function,
            sample_period: Duration::from_secs_f64(1.0 / config.fs),
            estimator,
            buffer,
            transport,
            prev_phase: None,
            curr_phase: None,
            stim_ok: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stim_ok(&self) -> bool {
        self.stim_ok
    }

    // Shift the phase history by one estimate. On a transient error the
    // history is left untouched and the cycle is skipped.
    fn update_phase(&mut self, window: &[f64]) -> Result<(), crate::errors::EstimateError> {
        let estimate = self.estimator.estimate_phase(window)?;
        self.prev_phase = self.curr_phase.take();
        self.curr_phase = estimate;
        Ok(())
    }

    // Re-arm the gate at a trough / cycle boundary.
    fn update_stim_ok(&mut self) {
        if let Some(curr) = self.curr_phase {
            if self.estimator.rearm_event(self.prev_phase, curr) {
                self.stim_ok = true;
            }
        }
    }

    /// One polling cycle: pull the latest window, estimate, update the
    /// gate, fire if armed and past the target phase.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let window = match self.buffer.latest(self.window_size) {
            Some(window) => window,
            None => return CycleOutcome::NotReady,
        };

        if let Err(err) = self.update_phase(&window) {
            debug!("{}: skipping cycle: {err}", self.name);
            return CycleOutcome::NotReady;
        }
        self.update_stim_ok();

        let curr = match self.curr_phase {
            Some(curr) => curr,
            None => return CycleOutcome::NotReady,
        };

        if self.stim_ok && curr >= self.fire_threshold {
            // enter REFRACTORY before the hardware call so a raised error
            // cannot cause a second command in the same cycle
            self.stim_ok = false;
            info!("{} STIM at phase {curr:.4}", self.name);
            if let Err(err) = self.transport.fire(self.stim_function) {
                // surfaced but non-fatal; a fired-but-unacknowledged command
                // is not retried to avoid double stimulation
                warn!("{}: stimulation call failed: {err}", self.name);
            }
            return CycleOutcome::Fired(curr);
        }

        CycleOutcome::Monitored(curr)
    }

    /// The tight polling loop. Never returns; the only supported
    /// cancellation is external process termination.
    pub fn run(&mut self) -> ! {
        loop {
            let started = Instant::now();
            self.run_cycle();
            let elapsed = started.elapsed();
            if elapsed > self.sample_period {
                warn!(
                    "{}: cycle overran the sample period ({elapsed:?} > {:?})",
                    self.name, self.sample_period
                );
            }
        }
    }
}
