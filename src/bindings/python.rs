use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::DetectorConfig;
use crate::estimators::{self, PhaseEstimator, PhaseMappingConfig};

/// Python handle around one configured phase estimator. Windows are plain
/// lists of floats; the returned phase is `None` while the estimator warms
/// up.
#[pyclass]
pub struct PyPhaseEstimator {
    estimator: Box<dyn PhaseEstimator>,
}

#[pymethods]
impl PyPhaseEstimator {
    #[new]
    #[pyo3(signature = (method, window_size, low_cut, high_cut, fs, filter_order=2, filter_family="butter".to_string()))]
    pub fn new(
        method: String,
        window_size: usize,
        low_cut: f64,
        high_cut: f64,
        fs: f64,
        filter_order: usize,
        filter_family: String,
    ) -> PyResult<Self> {
        let mut config = DetectorConfig::example("python");
        config.method = method
            .parse()
            .map_err(|err| PyValueError::new_err(format!("{err}")))?;
        config.window_size = window_size;
        config.low_cut = low_cut;
        config.high_cut = high_cut;
        config.fs = fs;
        config.filter_order = filter_order;
        config.filter_family = filter_family
            .parse()
            .map_err(|err| PyValueError::new_err(format!("{err}")))?;
        config.phase_mapping = PhaseMappingConfig::default();

        let estimator =
            estimators::build(&config).map_err(|err| PyValueError::new_err(format!("{err}")))?;
        Ok(Self { estimator })
    }

    pub fn estimate_phase(&mut self, window: Vec<f64>) -> PyResult<Option<f64>> {
        self.estimator
            .estimate_phase(&window)
            .map_err(|err| PyValueError::new_err(format!("{err}")))
    }

    pub fn rearm_event(&self, prev_phase: Option<f64>, curr_phase: f64) -> bool {
        self.estimator.rearm_event(prev_phase, curr_phase)
    }
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn phase_locked_stim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPhaseEstimator>()?;
    Ok(())
}
