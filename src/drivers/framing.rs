//! Frame synchronisation for the 16-channel front end.
//!
//! The firmware emits an undelimited stream. Each frame is 16 groups of 9 bytes;
//! group `k` carries three `(channel id, high, low)` triplets for channels `k`,
//! `16 + k` and `32 + k`. The only framing the stream offers is those id bytes,
//! so a frame start is recognised by the ids of its first four triplets.
//!
//! This is a heuristic: the id pattern can occur inside sample data, and the
//! first match wins. [`SyncMode::Strict`] narrows the window for false matches by
//! also checking the ids of several whole frames after the candidate.
use serde::{Deserialize, Serialize};
use crate::drivers::AcquisitionError;
/// Logical channels decoded per frame.
pub const CHANNELS: usize = 16;
/// ADC banks interleaved in each group.
pub const BANKS: usize = 3;
/// Bytes per `(id, high, low)` triplet.
pub const TRIPLET_BYTES: usize = 3;
/// Bytes per channel group (one triplet per bank).
pub const GROUP_BYTES: usize = BANKS * TRIPLET_BYTES;
/// Bytes per complete frame.
pub const FRAME_BYTES: usize = GROUP_BYTES * CHANNELS;
/// Zero-valued candidates left unscanned at the tail of a buffer, so a match
/// always has a full frame behind it.
pub const SCAN_MARGIN: usize = 100;
/// `(offset within frame, expected byte)` pairs that mark a frame start.
pub const FRAME_MARKER: [(usize, u8); 4] = [(0, 0), (3, 16), (6, 32), (9, 1)];
/// Stream slot (triplet index within a frame) of each of the 48 firmware channels.
pub const FIRMWARE_SLOT_ORDER: [usize; BANKS * CHANNELS] = slot_order();
const fn slot_order() -> [usize; BANKS * CHANNELS] {
    let mut order = [0usize; BANKS * CHANNELS];
    let mut channel = 0;
    while channel < BANKS * CHANNELS {
        let bank = channel / CHANNELS;
        let group = channel % CHANNELS;
        order[channel] = group * BANKS + bank;
        channel += 1;
    }
    order
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SyncMode {
    /// Accept the first position matching [`FRAME_MARKER`].
    #[default]
    Marker,
    /// Additionally require `frames` consecutive frames with valid channel ids.
    Strict { frames: usize },
}
/// True when the four marker bytes sit at `pos`.
pub fn marker_at(buffer: &[u8], pos: usize) -> bool {
    FRAME_MARKER
        .iter()
        .all(|&(offset, expected)| buffer.get(pos + offset) == Some(&expected))
}
/// Checks every channel-id byte of `frames` frames starting at `pos`.
pub fn layout_at(buffer: &[u8], pos: usize, frames: usize) -> bool {
    if buffer.len() < pos + frames * FRAME_BYTES {
        return false;
    }
    (0..frames).all(|frame| {
        let base = pos + frame * FRAME_BYTES;
        (0..BANKS * CHANNELS).all(|channel| {
            let at = base + FIRMWARE_SLOT_ORDER[channel] * TRIPLET_BYTES;
            buffer[at] as usize == channel
        })
    })
}
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSynchronizer {
    mode: SyncMode,
}
impl FrameSynchronizer {
    pub fn new(mode: SyncMode) -> Self {
        Self { mode }
    }
    /// Index of the first frame start in `buffer`.
    ///
    /// Only zero bytes are considered as candidates, and the last
    /// [`SCAN_MARGIN`] of them are skipped. Trimming is left to the caller.
    pub fn find_start(&self, buffer: &[u8]) -> Result<usize, AcquisitionError> {
        let zeros: Vec<usize> = buffer
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| (b == 0).then_some(i))
            .collect();
        let scanned = zeros.len().saturating_sub(SCAN_MARGIN);
        zeros[..scanned]
            .iter()
            .copied()
            .find(|&pos| {
                marker_at(buffer, pos)
                    && match self.mode {
                        SyncMode::Marker => true,
                        SyncMode::Strict { frames } => layout_at(buffer, pos, frames),
                    }
            })
            .ok_or(AcquisitionError::Framing { scanned })
    }
}
/// [`FrameSynchronizer::find_start`] with the default marker-only mode.
pub fn find_frame_start(buffer: &[u8]) -> Result<usize, AcquisitionError> {
    FrameSynchronizer::default().find_start(buffer)
}
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    /// Encodes one frame in the firmware layout. `codes[k]` is the 12-bit code
    /// of group `k` in every bank.
    pub fn encode_frame(codes: &[u16; CHANNELS]) -> Vec<u8> {
        let mut frame = vec![0u8; FRAME_BYTES];
        for channel in 0..BANKS * CHANNELS {
            let at = FIRMWARE_SLOT_ORDER[channel] * TRIPLET_BYTES;
            let code = codes[channel % CHANNELS];
            frame[at] = channel as u8;
            frame[at + 1] = (code >> 8) as u8;
            frame[at + 2] = (code & 0xff) as u8;
        }
        frame
    }
    /// `count` frames; group `k` of frame `n` carries code `base + k + n`.
    pub fn ramp_frames(count: usize, base: u16) -> Vec<u8> {
        (0..count)
            .flat_map(|n| {
                let mut codes = [0u16; CHANNELS];
                for (k, code) in codes.iter_mut().enumerate() {
                    *code = (base + k as u16 + n as u16) & 0x0fff;
                }
                encode_frame(&codes)
            })
            .collect()
    }
}
