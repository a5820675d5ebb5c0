//! One acquisition run: pulls bytes, keeps the rolling windows and the force
//! reconstruction, and applies the operator commands.
use ndarray::Array2;
use serde::Serialize;
use crate::config::{
    AcquisitionConfig, CalibrationFile, CircuitConfig, ROLL_DURATION_MAX, ROLL_DURATION_MIN,
};
use crate::drivers::framing::CHANNELS;
use crate::drivers::{
    correct_matrix, decode_buffer, fit_linear_trend, AcquisitionError, ByteSource, FrameAssembler,
    FrameSynchronizer, LinearTrend, RollingMatrix, RollingSeries, StreamingLtiFilter,
};
use crate::types::{Command, Outcome};
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub locked: bool,
    /// 1-based channel fed to the reconstruction.
    pub channel: usize,
    pub additional_channels: Vec<usize>,
    pub roll_duration: usize,
    pub reconstruct: bool,
}
/// Data produced by one successful tick.
#[derive(Clone, Debug)]
pub struct TickOutput {
    /// Newly decoded volts, 16 x M, before offset correction.
    pub samples: Array2<f64>,
    /// Force reconstructed from the selected channel, one value per column.
    pub force: Option<Vec<f64>>,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaptureMetadata {
    pub sample_rate_hz: f64,
    /// Time covered by every sample decoded since the session started.
    pub duration_secs: f64,
    /// Time covered by the samples still in the window.
    pub window_secs: f64,
    pub channels: usize,
    pub samples_per_channel: usize,
    pub reconstructed: bool,
}
#[derive(Clone, Debug)]
pub struct CaptureSnapshot {
    pub samples: Array2<f64>,
    pub force: Option<Vec<f64>>,
    pub metadata: CaptureMetadata,
}
fn check_channel(channel: usize) -> Result<usize, AcquisitionError> {
    if (1..=CHANNELS).contains(&channel) {
        Ok(channel)
    } else {
        Err(AcquisitionError::UnknownChannel(channel))
    }
}
pub struct AcquisitionSession<S: ByteSource> {
    source: S,
    assembler: FrameAssembler,
    readings: RollingMatrix,
    force: RollingSeries,
    filter: StreamingLtiFilter,
    calibration: CalibrationFile,
    offsets: [f64; CHANNELS],
    circuit: CircuitConfig,
    state: SessionState,
    total_samples: usize,
}
impl<S: ByteSource> AcquisitionSession<S> {
    pub fn new(
        source: S,
        config: &AcquisitionConfig,
        calibration: CalibrationFile,
    ) -> Result<Self, AcquisitionError> {
        let display = &config.display;
        let state = SessionState {
            locked: false,
            channel: check_channel(display.channel)?,
            additional_channels: display.additional_channels.clone(),
            roll_duration: display.roll_duration,
            reconstruct: config.reconstruct,
        };
        log::info!(
            "Session ready: {} Hz, channel {}, window {} samples, reconstruct {}",
            config.circuit.sample_rate_hz,
            state.channel,
            state.roll_duration,
            state.reconstruct
        );
        Ok(Self {
            source,
            assembler: FrameAssembler::new(config.sync),
            readings: RollingMatrix::new(CHANNELS, display.roll_duration),
            force: RollingSeries::new(display.roll_duration),
            filter: StreamingLtiFilter::from_circuit(&config.circuit)?,
            offsets: calibration.offsets(),
            calibration,
            circuit: config.circuit,
            state,
            total_samples: 0,
        })
    }
    pub fn state(&self) -> &SessionState {
        &self.state
    }
    pub fn calibration(&self) -> &CalibrationFile {
        &self.calibration
    }
    pub fn offsets(&self) -> &[f64; CHANNELS] {
        &self.offsets
    }
    pub fn readings(&self) -> &RollingMatrix {
        &self.readings
    }
    pub fn force(&self) -> Vec<f64> {
        self.force.to_vec()
    }
    /// One acquisition step. `Ok(None)` means nothing new to show this tick.
    pub fn tick(&mut self) -> Result<Option<TickOutput>, AcquisitionError> {
        let chunk = self.source.read()?;
        if chunk.is_empty() {
            return Ok(None);
        }
        if self.state.locked {
            log::trace!("Locked, discarding {} bytes", chunk.len());
            return Ok(None);
        }
        self.assembler.push(&chunk);
        let samples = match self.assembler.drain_frames() {
            Ok(samples) => samples,
            Err(err) if err.is_transient() => {
                log::warn!("Skipping tick: {err}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if samples.ncols() == 0 {
            return Ok(None);
        }
        self.readings.append(&samples)?;
        self.total_samples += samples.ncols();
        let force = if self.state.reconstruct {
            let corrected = correct_matrix(&samples, &self.offsets)?;
            let input = corrected.row(self.state.channel - 1).to_vec();
            let out = self.filter.process(&input)?;
            self.force.append(&out);
            Some(out)
        } else {
            None
        };
        Ok(Some(TickOutput { samples, force }))
    }
    /// Applies `command`. On error the session is left as it was.
    pub fn apply(&mut self, command: Command) -> Result<Outcome, AcquisitionError> {
        match command {
            Command::ResetForce => {
                self.force.zero_fill();
                self.filter.reset();
                log::info!("Force reconstruction reset");
            }
            Command::Lock => {
                // bytes read while locked are dropped, so the pending tail is stale
                self.state.locked = true;
                self.assembler.reset();
            }
            Command::Unlock => self.state.locked = false,
            Command::SetChannel(channel) => self.state.channel = check_channel(channel)?,
            Command::AddChannel(channel) => {
                let channel = check_channel(channel)?;
                if !self.state.additional_channels.contains(&channel) {
                    self.state.additional_channels.push(channel);
                }
            }
            Command::RemoveChannel(channel) => {
                let at = self
                    .state
                    .additional_channels
                    .iter()
                    .position(|&c| c == channel)
                    .ok_or(AcquisitionError::ChannelNotDisplayed(channel))?;
                self.state.additional_channels.remove(at);
            }
            Command::SetRollDuration(value) => {
                if !(ROLL_DURATION_MIN..=ROLL_DURATION_MAX).contains(&value) {
                    return Err(AcquisitionError::InvalidRollDuration {
                        value,
                        min: ROLL_DURATION_MIN,
                        max: ROLL_DURATION_MAX,
                    });
                }
                self.state.roll_duration = value;
                self.readings.set_capacity(value);
                self.force.set_capacity(value);
            }
            Command::GetMean => {
                let channel = self.state.channel;
                return Ok(Outcome::Mean {
                    channel,
                    value: self.readings.mean(channel - 1),
                });
            }
            Command::CalibrateOffset => return self.calibrate_offset(),
            Command::CalibrateTrend => return self.calibrate_trend(),
            Command::Shutdown => {}
        }
        Ok(Outcome::Applied)
    }
    fn calibrate_offset(&mut self) -> Result<Outcome, AcquisitionError> {
        if self.readings.is_empty() {
            return Err(AcquisitionError::InsufficientSamples {
                needed: 1,
                actual: 0,
            });
        }
        let means: Vec<f64> = (0..CHANNELS)
            .filter_map(|channel| self.readings.mean(channel))
            .collect();
        self.calibration.set_offsets(&means);
        self.offsets = self.calibration.offsets();
        log::info!("Offsets calibrated over {} samples", self.readings.len());
        Ok(Outcome::OffsetsCalibrated(self.calibration.clone()))
    }
    fn calibrate_trend(&mut self) -> Result<Outcome, AcquisitionError> {
        if !self.state.reconstruct {
            return Err(AcquisitionError::ReconstructionDisabled);
        }
        let trend = fit_linear_trend(&self.force.to_vec())?;
        self.calibration.set_trend(trend);
        log::info!("Trend calibrated: a = {}, b = {}", trend.a, trend.b);
        Ok(Outcome::TrendCalibrated {
            trend,
            calibration: self.calibration.clone(),
        })
    }
    /// Force window with the selected channel's calibrated slope removed.
    pub fn detrended_force(&self) -> Vec<f64> {
        let a = self
            .calibration
            .entry(self.state.channel)
            .map_or(0.0, |entry| entry.a);
        LinearTrend { a, b: 0.0 }.remove_slope(&self.force.to_vec())
    }
    pub fn snapshot(&self) -> CaptureSnapshot {
        let samples = self.readings.to_array();
        CaptureSnapshot {
            metadata: CaptureMetadata {
                sample_rate_hz: self.circuit.sample_rate_hz,
                duration_secs: self.circuit.samples_to_seconds(self.total_samples),
                window_secs: self.circuit.samples_to_seconds(samples.ncols()),
                channels: samples.nrows(),
                samples_per_channel: samples.ncols(),
                reconstructed: self.state.reconstruct,
            },
            force: self.state.reconstruct.then(|| self.force.to_vec()),
            samples,
        }
    }
    pub fn close(&mut self) -> Result<(), AcquisitionError> {
        self.source.close()
    }
}
/// Decodes a whole raw capture in one pass, without rolling windows.
///
/// With reconstruction enabled the selected channel is offset-corrected and
/// filtered from a cold state.
pub fn replay_capture(
    bytes: &[u8],
    config: &AcquisitionConfig,
    calibration: &CalibrationFile,
) -> Result<CaptureSnapshot, AcquisitionError> {
    let channel = check_channel(config.display.channel)?;
    let samples = decode_buffer(&FrameSynchronizer::new(config.sync), bytes)?;
    let force = if config.reconstruct {
        let corrected = correct_matrix(&samples, &calibration.offsets())?;
        let input = corrected.row(channel - 1).to_vec();
        Some(StreamingLtiFilter::from_circuit(&config.circuit)?.process(&input)?)
    } else {
        None
    };
    let circuit = config.circuit;
    log::info!("Replayed {} samples per channel", samples.ncols());
    Ok(CaptureSnapshot {
        metadata: CaptureMetadata {
            sample_rate_hz: circuit.sample_rate_hz,
            duration_secs: circuit.samples_to_seconds(samples.ncols()),
            window_secs: circuit.samples_to_seconds(samples.ncols()),
            channels: samples.nrows(),
            samples_per_channel: samples.ncols(),
            reconstructed: config.reconstruct,
        },
        force,
        samples,
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalibrationEntry, DisplayConfig};
    use crate::drivers::framing::testing::encode_frame;
    use crate::drivers::framing::{SyncMode, FRAME_BYTES};
    use crate::drivers::{code_to_volts, ManualByteSource};
    fn frames(count: usize, code: u16) -> Vec<u8> {
        (0..count).flat_map(|_| encode_frame(&[code; CHANNELS])).collect()
    }
    fn config(reconstruct: bool) -> AcquisitionConfig {
        AcquisitionConfig {
            circuit: CircuitConfig {
                rf: 1e6,
                cf: 2e-9,
                d33: 3e-12,
                sample_rate_hz: 1000.0,
            },
            display: DisplayConfig {
                roll_duration: 2000,
                channel: 13,
                additional_channels: Vec::new(),
            },
            reconstruct,
            sync: SyncMode::Marker,
        }
    }
    fn calibration(offset: f64) -> CalibrationFile {
        CalibrationFile {
            channels: (1..=CHANNELS)
                .map(|number| CalibrationEntry {
                    number,
                    offset_mean: offset,
                    a: 0.0,
                    b: 0.0,
                })
                .collect(),
        }
    }
    fn session(
        chunks: Vec<Vec<u8>>,
        reconstruct: bool,
        offset: f64,
    ) -> AcquisitionSession<ManualByteSource> {
        AcquisitionSession::new(
            ManualByteSource::new(chunks),
            &config(reconstruct),
            calibration(offset),
        )
        .unwrap()
    }
    #[test]
    fn empty_read_and_short_accumulation_yield_nothing() {
        let data = frames(200, 160);
        let mut s = session(vec![Vec::new(), data[..1000].to_vec(), data[1000..].to_vec()], false, 0.0);
        assert!(s.tick().unwrap().is_none());
        assert!(s.tick().unwrap().is_none());
        let out = s.tick().unwrap().unwrap();
        assert_eq!(out.samples.dim(), (16, 200));
        assert!(out.force.is_none());
        assert_eq!(s.readings().len(), 200);
    }
    #[test]
    fn locked_session_discards_bytes() {
        let mut s = session(vec![frames(200, 160), frames(50, 160)], false, 0.0);
        s.apply(Command::Lock).unwrap();
        assert!(s.tick().unwrap().is_none());
        assert!(s.readings().is_empty());
        s.apply(Command::Unlock).unwrap();
        let out = s.tick().unwrap().unwrap();
        assert_eq!(out.samples.ncols(), 50);
        assert_eq!(s.readings().len(), 50);
    }
    #[test]
    fn mid_frame_lock_resyncs_on_unlock() {
        let level = code_to_volts(160);
        let data = frames(300, 160);
        let cut = 200 * FRAME_BYTES + 50;
        let resume = 203 * FRAME_BYTES + 51;
        let mut s = session(
            vec![data[..cut].to_vec(), data[cut..resume].to_vec(), data[resume..].to_vec()],
            true,
            level,
        );
        assert_eq!(s.tick().unwrap().unwrap().samples.ncols(), 200);
        s.apply(Command::Lock).unwrap();
        assert!(s.tick().unwrap().is_none());
        s.apply(Command::Unlock).unwrap();
        let out = s.tick().unwrap().unwrap();
        // frames 201..=203 were cut by the lock; decoding restarts at frame 204
        assert_eq!(out.samples.ncols(), 96);
        let window = s.readings().to_array();
        assert_eq!(window.ncols(), 296);
        assert!(window.iter().all(|&v| v == level));
        assert!(s.force().iter().all(|f| f.abs() < 1e-9));
    }
    #[test]
    fn offset_matched_input_reconstructs_zero_force() {
        let level = code_to_volts(160);
        let mut s = session(vec![frames(200, 160)], true, level);
        let out = s.tick().unwrap().unwrap();
        let force = out.force.unwrap();
        assert_eq!(force.len(), 200);
        assert!(force.iter().all(|f| f.abs() < 1e-9));
    }
    #[test]
    fn force_follows_offset_step() {
        let mut s = session(vec![frames(200, 160), frames(100, 170)], true, code_to_volts(160));
        s.tick().unwrap();
        let out = s.tick().unwrap().unwrap();
        let force = out.force.unwrap();
        assert!(force[0] > 0.0);
        assert!(force.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(s.force().len(), 300);
    }
    #[test]
    fn channel_commands_validate_input() {
        let mut s = session(Vec::new(), false, 0.0);
        assert!(matches!(
            s.apply(Command::SetChannel(17)),
            Err(AcquisitionError::UnknownChannel(17))
        ));
        s.apply(Command::SetChannel(4)).unwrap();
        s.apply(Command::AddChannel(2)).unwrap();
        s.apply(Command::AddChannel(2)).unwrap();
        assert_eq!(s.state().additional_channels, vec![2]);
        assert!(matches!(
            s.apply(Command::RemoveChannel(5)),
            Err(AcquisitionError::ChannelNotDisplayed(5))
        ));
        s.apply(Command::RemoveChannel(2)).unwrap();
        assert_eq!(s.state().channel, 4);
        assert!(s.state().additional_channels.is_empty());
    }
    #[test]
    fn roll_duration_bounds_and_trim() {
        let mut s = session(vec![frames(200, 160), frames(2000, 160)], false, 0.0);
        s.tick().unwrap();
        s.tick().unwrap();
        assert_eq!(s.readings().len(), 2000);
        assert!(s.apply(Command::SetRollDuration(100)).is_err());
        assert_eq!(s.state().roll_duration, 2000);
        s.apply(Command::SetRollDuration(400_000)).unwrap();
        assert_eq!(s.readings().capacity(), 400_000);
    }
    #[test]
    fn calibrate_offset_uses_window_means() {
        let mut s = session(vec![frames(200, 1000)], false, 0.0);
        assert!(s.apply(Command::CalibrateOffset).is_err());
        s.tick().unwrap();
        let Outcome::OffsetsCalibrated(file) = s.apply(Command::CalibrateOffset).unwrap() else {
            panic!("expected offsets");
        };
        let expected = code_to_volts(1000);
        assert!(file.channels.iter().all(|e| (e.offset_mean - expected).abs() < 1e-12));
        assert!(s.offsets().iter().all(|o| (o - expected).abs() < 1e-12));
        let Outcome::Mean { channel, value } = s.apply(Command::GetMean).unwrap() else {
            panic!("expected a mean");
        };
        assert_eq!(channel, 13);
        assert!((value.unwrap() - expected).abs() < 1e-12);
    }
    #[test]
    fn calibrate_trend_and_reset_force() {
        let mut plain = session(Vec::new(), false, 0.0);
        assert!(matches!(
            plain.apply(Command::CalibrateTrend),
            Err(AcquisitionError::ReconstructionDisabled)
        ));
        let mut s = session(vec![frames(200, 170)], true, code_to_volts(160));
        s.tick().unwrap();
        let Outcome::TrendCalibrated { trend, calibration } =
            s.apply(Command::CalibrateTrend).unwrap()
        else {
            panic!("expected a trend");
        };
        // constant input through an integrator gives a straight ramp
        let per_sample = code_to_volts(10) / (1e6 * 3e-12) / 1000.0;
        assert!((trend.a - per_sample).abs() < 1e-6 * per_sample);
        assert!(calibration.channels.iter().all(|e| e.a == trend.a));
        assert!(s.detrended_force().windows(2).all(|w| (w[1] - w[0]).abs() < 1e-6));
        s.apply(Command::ResetForce).unwrap();
        assert!(s.force().iter().all(|&f| f == 0.0));
        assert_eq!(s.force().len(), 200);
    }
    #[test]
    fn replay_matches_streamed_session() {
        let mut bytes = vec![9u8, 77, 3];
        bytes.extend(frames(200, 170));
        let config = config(true);
        let calibration = calibration(code_to_volts(160));
        let snapshot = replay_capture(&bytes, &config, &calibration).unwrap();
        assert_eq!(snapshot.samples.dim(), (16, 200));
        assert!((snapshot.metadata.duration_secs - 0.2).abs() < 1e-12);
        let mut s = session(vec![bytes], true, code_to_volts(160));
        s.tick().unwrap();
        let streamed = s.force();
        let replayed = snapshot.force.unwrap();
        assert_eq!(replayed.len(), streamed.len());
        assert!(replayed.iter().zip(&streamed).all(|(a, b)| (a - b).abs() < 1e-9));
        assert!(replay_capture(&[1u8; 3000], &config, &calibration).is_err());
    }
    #[test]
    fn snapshot_reports_shape_and_duration() {
        let mut s = session(vec![frames(250, 160)], true, 0.0);
        s.tick().unwrap();
        let snapshot = s.snapshot();
        assert_eq!(snapshot.samples.dim(), (16, 250));
        assert_eq!(snapshot.force.as_ref().map(Vec::len), Some(250));
        assert_eq!(snapshot.metadata.samples_per_channel, 250);
        assert!((snapshot.metadata.duration_secs - 0.25).abs() < 1e-12);
        s.close().unwrap();
        assert!(s.tick().is_err());
    }
}
