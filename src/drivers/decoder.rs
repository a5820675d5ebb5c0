use ndarray::Array2;
use crate::drivers::framing::{FrameSynchronizer, CHANNELS, GROUP_BYTES, TRIPLET_BYTES};
use crate::drivers::AcquisitionError;
/// ADC reference voltage.
pub const FULL_SCALE_VOLTS: f64 = 3.3;
/// Codes per full scale (12-bit converter).
pub const ADC_COUNTS: u16 = 4096;
/// Rows the decoded matrix is rolled upwards by to line physical wiring up with
/// logical channel numbers.
pub const ROW_ROLL: usize = 2;
/// Bank whose triplets are decoded (bytes 4 and 5 of every group).
pub const DEFAULT_BANK: usize = 1;
pub fn code_to_volts(code: u16) -> f64 {
    f64::from(code) * FULL_SCALE_VOLTS / f64::from(ADC_COUNTS)
}
/// Nearest 12-bit code for `volts`, clamped to the converter range.
pub fn volts_to_code(volts: f64) -> u16 {
    let code = (volts * f64::from(ADC_COUNTS) / FULL_SCALE_VOLTS).round();
    code.clamp(0.0, f64::from(ADC_COUNTS - 1)) as u16
}
/// Turns a frame-aligned byte buffer into a channels x samples voltage matrix.
#[derive(Clone, Copy, Debug)]
pub struct FrameDecoder {
    bank: usize,
}
impl Default for FrameDecoder {
    fn default() -> Self {
        Self { bank: DEFAULT_BANK }
    }
}
impl FrameDecoder {
    /// Flat code sequence, one code per group, all channels interleaved.
    ///
    /// A trailing group that holds its high byte but not its low byte is dropped.
    pub fn codes(&self, buffer: &[u8]) -> Vec<u16> {
        let high_offset = self.bank * TRIPLET_BYTES + 1;
        let highs = buffer.iter().skip(high_offset).step_by(GROUP_BYTES);
        let lows = buffer.iter().skip(high_offset + 1).step_by(GROUP_BYTES);
        highs
            .zip(lows)
            .map(|(&high, &low)| (u16::from(high) << 8) + u16::from(low))
            .collect()
    }
    /// Decodes `buffer`, which must start on a frame boundary.
    ///
    /// Codes beyond the last multiple of 16 are discarded, so a buffer shorter
    /// than one frame yields a 16 x 0 matrix. Misaligned input is not detected.
    pub fn decode(&self, buffer: &[u8]) -> Array2<f64> {
        let codes = self.codes(buffer);
        let columns = codes.len() / CHANNELS;
        Array2::from_shape_fn((CHANNELS, columns), |(row, column)| {
            let physical = (row + ROW_ROLL) % CHANNELS;
            code_to_volts(codes[column * CHANNELS + physical])
        })
    }
}
/// Synchronises on `buffer`, drops everything before the first frame and decodes
/// the remainder in one pass.
pub fn decode_buffer(
    synchronizer: &FrameSynchronizer,
    buffer: &[u8],
) -> Result<Array2<f64>, AcquisitionError> {
    let start = synchronizer.find_start(buffer)?;
    Ok(FrameDecoder::default().decode(&buffer[start..]))
}
