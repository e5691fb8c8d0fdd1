use super::format::{AudioFormat, StreamConfig};
use super::sink::{DeviceSink, DeviceType, IoHandle};
use crate::error::{Error, Result};
use std::time::Instant;

/// Managed access to a device output stream
///
/// Borrows the sink for its whole lifetime and never tears it down; the
/// device manager that owns the sink does that. Positions reported upward
/// are scaled from device frames to application frames.
pub struct StreamOut<'a, S: DeviceSink + ?Sized> {
    sink: &'a mut S,
    opened: bool,
    frames_written: u64,
    frames_written_at_standby: u64,
    render_position: u64,
    rate_multiplier: u32,
    proportional_frames: bool,
    frame_size: usize,
    buffer_size: usize,
    expect_retrograde: bool,
    config_format: AudioFormat,
}

impl<'a, S: DeviceSink + ?Sized> StreamOut<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            opened: false,
            frames_written: 0,
            frames_written_at_standby: 0,
            render_position: 0,
            rate_multiplier: 1,
            proportional_frames: false,
            frame_size: 0,
            buffer_size: 0,
            expect_retrograde: false,
            config_format: AudioFormat::Default,
        }
    }

    pub(crate) fn set_rate_multiplier(&mut self, rate_multiplier: u32) {
        self.rate_multiplier = rate_multiplier.max(1);
    }

    pub fn open(
        &mut self,
        handle: IoHandle,
        devices: DeviceType,
        config: &mut StreamConfig,
        address: &str,
    ) -> Result<()> {
        let mut status = self.sink.open(handle, devices, config, address);
        tracing::debug!("StreamOut::open() sink configured for {}, status {:?}", config, status);

        // Some sinks do not know IEC 61937 but take the bursts as PCM.
        if status.is_err() && config.format == AudioFormat::Iec61937 {
            let mut pcm_config = StreamConfig {
                format: AudioFormat::Pcm16Bit,
                ..*config
            };
            status = self.sink.open(handle, devices, &mut pcm_config, address);
            tracing::debug!("StreamOut::open() treat IEC61937 as PCM, status {:?}", status);
        }

        self.config_format = config.format;
        status?;

        // The sink is open from here on; without a frame size the stream
        // stays unusable and the caller has to treat the open as failed.
        self.frame_size = match self.sink.frame_size() {
            Ok(0) => {
                tracing::error!("StreamOut::open() sink opened but reported a zero frame size");
                return Err(Error::Device("sink reported a zero frame size".to_string()));
            }
            Ok(size) => size,
            Err(e) => {
                tracing::error!("StreamOut::open() sink opened but frame size query failed: {}", e);
                return Err(e);
            }
        };
        self.buffer_size = self.sink.buffer_size().unwrap_or_else(|e| {
            tracing::warn!("Failed to query sink buffer size: {}", e);
            0
        });
        self.proportional_frames = config.format.has_proportional_frames();
        self.opened = true;
        Ok(())
    }

    pub fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        if !self.opened {
            return Err(Error::NoInit);
        }
        let written = self.sink.write(buffer)?;
        if written > 0 {
            self.frames_written += (written / self.frame_size) as u64;
        }
        Ok(written)
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.opened {
            return Err(Error::NoInit);
        }
        self.render_position = 0;
        self.expect_retrograde = false;
        self.frames_written = 0;
        self.frames_written_at_standby = 0;
        match self.sink.flush() {
            Err(Error::InvalidOperation) => Ok(()),
            status => status,
        }
    }

    pub fn standby(&mut self) -> Result<()> {
        if !self.opened {
            return Err(Error::NoInit);
        }
        self.render_position = 0;
        self.expect_retrograde = false;
        if self.config_format != AudioFormat::Iec61937 {
            self.frames_written_at_standby = self.frames_written;
        }
        self.sink.standby()
    }

    /// Allow the next backwards step of the device position, which happens
    /// when the device starts counting again between gapless tracks.
    pub fn presentation_complete(&mut self) {
        self.expect_retrograde = true;
    }

    /// Frames rendered, in application frames.
    pub fn render_position(&mut self) -> Result<u64> {
        if !self.opened {
            return Err(Error::NoInit);
        }
        let device_position = self.sink.render_position()?;

        // Extend the 32-bit device counter using wrapping arithmetic,
        // e.g. 100 - 0xFFFFFFF0 = 116.
        let truncated = self.render_position as u32;
        let delta = device_position.wrapping_sub(truncated) as i32;
        if delta > 0 {
            self.render_position += delta as u64;
        } else if self.expect_retrograde {
            self.expect_retrograde = false;
            self.render_position = self
                .render_position
                .saturating_sub(delta.unsigned_abs() as u64);
        }

        Ok(self.render_position / self.rate_multiplier as u64)
    }

    /// Low 32 bits of [`StreamOut::render_position`].
    pub fn render_position_u32(&mut self) -> Result<u32> {
        self.render_position().map(|frames| frames as u32)
    }

    pub fn presentation_position(&self) -> Result<(u64, Instant)> {
        if !self.opened {
            return Err(Error::NoInit);
        }
        let (device_frames, timestamp) = self.sink.presentation_position()?;

        if !self.proportional_frames {
            return Ok((device_frames, timestamp));
        }
        // Frames before the last standby were already presented.
        let adjusted = device_frames.saturating_sub(self.frames_written_at_standby);
        Ok((adjusted / self.rate_multiplier as u64, timestamp))
    }

    /// Properties of the device side, as reported by the sink.
    pub fn audio_properties(&self) -> Result<StreamConfig> {
        if !self.opened {
            return Err(Error::NoInit);
        }
        self.sink.audio_properties()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }
}
