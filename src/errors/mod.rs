use thiserror::Error;

/// Fatal configuration problems. Raised at construction time only; a
/// detector that fails construction never starts its loop.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown estimation method `{0}` (expected echt, ht or pm)")]
    UnknownMethod(String),

    #[error("unknown filter family `{0}` (expected butter, cheby1 or ellip)")]
    UnknownFamily(String),

    #[error("filter low cut {low} Hz must be below high cut {high} Hz")]
    InvalidPassband { low: f64, high: f64 },

    #[error("cutoff band ({low}, {high}) Hz must lie inside (0, {nyquist}) Hz")]
    CutoffOutOfRange { low: f64, high: f64, nyquist: f64 },

    #[error("target phase {0} must lie within [0, 2pi]")]
    TargetPhaseOutOfRange(f64),

    #[error("detector window size {window} exceeds data buffer capacity {capacity}")]
    WindowExceedsBuffer { window: usize, capacity: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Transient numerical problems inside a single estimation cycle. The
/// control loop skips the cycle, keeps its gate state and continues.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("estimation produced a non-finite phase")]
    NonFinitePhase,

    #[error("window length {got} does not match configured size {expected}")]
    WindowLengthMismatch { expected: usize, got: usize },
}

/// Failures of the hardware stimulation call. Surfaced but never fatal to
/// the loop; a fired-but-unacknowledged command is not retried.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("stimulation transport i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("stimulation command rejected: {0}")]
    Rejected(String),
}
