// src/types.rs
use crate::config::CalibrationFile;
use crate::drivers::LinearTrend;
use crate::session::{CaptureSnapshot, TickOutput};
/// Operations a front end can request from a running acquisition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Zero the force window and return the filter to its cold state.
    ResetForce,
    Lock,
    Unlock,
    /// Select the 1-based channel fed to the reconstruction.
    SetChannel(usize),
    AddChannel(usize),
    RemoveChannel(usize),
    SetRollDuration(usize),
    GetMean,
    CalibrateOffset,
    CalibrateTrend,
    // engine only; a session treats it as a no-op
    Shutdown,
}
/// Result of applying a [`Command`].
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Applied,
    Mean { channel: usize, value: Option<f64> },
    /// Offsets were recomputed; the caller decides whether to persist the file.
    OffsetsCalibrated(CalibrationFile),
    TrendCalibrated {
        trend: LinearTrend,
        calibration: CalibrationFile,
    },
}
/// Messages sent from the acquisition thread.
#[derive(Clone, Debug)]
pub enum Event {
    Started,
    Tick(TickOutput),
    Outcome(Outcome),
    Error(String),
    Stopped(Box<CaptureSnapshot>),
}
