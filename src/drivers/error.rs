use thiserror::Error;
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("no frame marker found after scanning {scanned} candidate positions")]
    Framing { scanned: usize },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
    #[error("need at least {needed} samples, got {actual}")]
    InsufficientSamples { needed: usize, actual: usize },
    #[error("sample interval must be finite and greater than zero")]
    InvalidSampleInterval,
    #[error("transfer function denominator has a zero leading coefficient")]
    InvalidSystem,
    #[error("channel {0} is outside 1..=16")]
    UnknownChannel(usize),
    #[error("channel {0} is not in the additional channel list")]
    ChannelNotDisplayed(usize),
    #[error("roll duration {value} outside {min}..={max}")]
    InvalidRollDuration { value: usize, min: usize, max: usize },
    #[error("reconstruction is disabled for this session")]
    ReconstructionDisabled,
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
impl AcquisitionError {
    /// Errors after which the current tick should simply be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, AcquisitionError::Framing { .. })
    }
}
