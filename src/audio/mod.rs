pub mod cpal_sink;
pub mod format;
#[cfg(test)]
pub mod mock;
pub mod policy;
pub mod sink;
pub mod spdif_out;
pub mod stream_out;
pub mod wav_sink;
pub mod writer;

pub use cpal_sink::CpalSink;
pub use format::{AudioFormat, ChannelMask, StreamConfig};
pub use sink::DeviceSink;
pub use spdif_out::SpdifStreamOut;
pub use wav_sink::WavSink;
pub use writer::WriteStats;
