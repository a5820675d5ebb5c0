use ndarray::Array2;
use crate::drivers::decoder::FrameDecoder;
use crate::drivers::framing::{layout_at, FrameSynchronizer, SyncMode, CHANNELS, FRAME_BYTES};
use crate::drivers::AcquisitionError;
/// Bytes accumulated before the first synchronisation attempt.
pub const DEFAULT_MIN_SYNC_BYTES: usize = 4096;
/// Unsynchronised bytes kept before the oldest half is thrown away.
pub const DEFAULT_MAX_BACKLOG: usize = 256 * 1024;
/// Stitches reads of arbitrary size into whole decoded frames.
///
/// Bytes that do not yet form a complete frame stay pending until the next push.
#[derive(Debug)]
pub struct FrameAssembler {
    pending: Vec<u8>,
    synchronizer: FrameSynchronizer,
    decoder: FrameDecoder,
    synced: bool,
    min_sync_bytes: usize,
    max_backlog: usize,
}
impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(SyncMode::default())
    }
}
impl FrameAssembler {
    pub fn new(mode: SyncMode) -> Self {
        Self::with_limits(mode, DEFAULT_MIN_SYNC_BYTES, DEFAULT_MAX_BACKLOG)
    }
    pub fn with_limits(mode: SyncMode, min_sync_bytes: usize, max_backlog: usize) -> Self {
        Self {
            pending: Vec::new(),
            synchronizer: FrameSynchronizer::new(mode),
            decoder: FrameDecoder::default(),
            synced: false,
            min_sync_bytes,
            max_backlog: max_backlog.max(min_sync_bytes),
        }
    }
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    pub fn is_synced(&self) -> bool {
        self.synced
    }
    /// Drops pending bytes and forces a fresh synchronisation.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.synced = false;
    }
    /// Decodes every complete frame currently pending.
    ///
    /// Returns a 16 x 0 matrix while still accumulating. A frame whose channel-id
    /// bytes do not all match the firmware layout ends the batch and drops sync,
    /// so the next call resynchronises from there.
    pub fn drain_frames(&mut self) -> Result<Array2<f64>, AcquisitionError> {
        if !self.synced {
            if self.pending.len() < self.min_sync_bytes {
                return Ok(Array2::zeros((CHANNELS, 0)));
            }
            match self.synchronizer.find_start(&self.pending) {
                Ok(start) => {
                    self.pending.drain(..start);
                    self.synced = true;
                    log::info!("Frame sync acquired, discarded {start} leading bytes");
                }
                Err(err) => {
                    if self.pending.len() > self.max_backlog {
                        let drop = self.pending.len() - self.max_backlog / 2;
                        self.pending.drain(..drop);
                        log::warn!("No frame marker in backlog, dropped {drop} bytes");
                    }
                    return Err(err);
                }
            }
        }
        let whole = self.pending.len() / FRAME_BYTES;
        let aligned = (0..whole)
            .take_while(|frame| layout_at(&self.pending, frame * FRAME_BYTES, 1))
            .count();
        if aligned < whole {
            log::warn!("Frame layout broken after {aligned} frames, resynchronising");
            self.synced = false;
        }
        let bytes = aligned * FRAME_BYTES;
        let samples = self.decoder.decode(&self.pending[..bytes]);
        self.pending.drain(..bytes);
        log::debug!("Decoded {aligned} frames, {} bytes pending", self.pending.len());
        Ok(samples)
    }
}
