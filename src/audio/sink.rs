use super::format::StreamConfig;
use crate::error::Result;
use std::time::Instant;

/// Identifies an output stream to the device layer
pub type IoHandle = i32;

/// Output device routing bits
pub type DeviceType = u32;

pub const DEVICE_OUT_HDMI: DeviceType = 0x400;

/// Trait for the device-side write channel of an output stream
///
/// Implementations wrap a driver or file. They serialize their own writes, so
/// callers need no extra locking. A single `write` may accept fewer bytes than
/// offered; an `Err` marks a failed write.
pub trait DeviceSink {
    /// Open the device. The sink may adjust `config` to what it actually uses.
    fn open(
        &mut self,
        handle: IoHandle,
        devices: DeviceType,
        config: &mut StreamConfig,
        address: &str,
    ) -> Result<()>;

    /// Write up to `buffer.len()` bytes, returning how many were accepted
    fn write(&mut self, buffer: &[u8]) -> Result<usize>;

    fn flush(&mut self) -> Result<()>;

    fn standby(&mut self) -> Result<()>;

    /// Bytes per device frame
    fn frame_size(&self) -> Result<usize>;

    /// Largest number of bytes a single `write` will take
    fn buffer_size(&self) -> Result<usize>;

    /// Device frames rendered so far, as a wrapping 32-bit counter
    fn render_position(&self) -> Result<u32>;

    /// Device frames presented and the time they were observed
    fn presentation_position(&self) -> Result<(u64, Instant)>;

    /// Configuration the device is currently running with
    fn audio_properties(&self) -> Result<StreamConfig>;
}
