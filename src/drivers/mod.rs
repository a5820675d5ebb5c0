// src/drivers/mod.rs
pub mod buffer;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod framing;
pub mod offset;
pub mod pipeline;
pub mod source;
pub mod trend;
pub use buffer::{RollingMatrix, RollingSeries};
pub use decoder::{code_to_volts, decode_buffer, volts_to_code, FrameDecoder};
pub use error::AcquisitionError;
pub use filter::{FilterState, LtiSystem, StreamingLtiFilter, TransferFunction};
pub use framing::{find_frame_start, FrameSynchronizer, SyncMode, CHANNELS, FRAME_BYTES};
pub use offset::{channel_means, correct_matrix, correct_series};
pub use pipeline::FrameAssembler;
pub use source::{ByteSource, ManualByteSource, SerialByteSource};
pub use trend::{fit_linear_trend, LinearTrend};
