pub mod detector;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::buffer::SharedSampleBuffer;
use crate::config::Config;
use crate::errors::ConfigError;
use crate::transport::StimTransport;

pub use detector::{CycleOutcome, Detector};

/// Build every configured detector, then run each on its own OS thread so a
/// stall in one loop cannot block another or the producer. Construction
/// errors are fatal and reported before any thread starts.
pub fn spawn_detectors(
    config: &Config,
    buffer: &SharedSampleBuffer,
    transport: Arc<dyn StimTransport>,
) -> Result<Vec<JoinHandle<()>>, ConfigError> {
    let mut detectors = Vec::with_capacity(config.detectors.len());
    for detector_config in &config.detectors {
        detectors.push(Detector::new(
            detector_config,
            buffer.clone(),
            transport.clone(),
        )?);
    }

    let mut handles = Vec::with_capacity(detectors.len());
    for mut detector in detectors {
        let handle = thread::Builder::new()
            .name(detector.name().to_string())
            .spawn(move || {
                detector.run();
            })?;
        handles.push(handle);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AcquisitionConfig, DetectorConfig, SignalSource};
    use crate::transport::mock::MockTransport;

    #[test]
    fn one_bad_detector_prevents_any_spawn() {
        let mut bad = DetectorConfig::example("bad");
        bad.low_cut = 50.0;
        bad.high_cut = 10.0;
        let config = Config {
            acquisition: AcquisitionConfig {
                fs: 1500.0,
                buffer_size: 1000,
                source: SignalSource::Simulated,
            },
            detectors: vec![DetectorConfig::example("good"), bad],
        };
        let buffer = SharedSampleBuffer::with_capacity(config.acquisition.buffer_size);
        let transport = Arc::new(MockTransport::new());
        let result = spawn_detectors(&config, &buffer, transport);
        assert!(matches!(result, Err(ConfigError::InvalidPassband { .. })));
    }
}
