use super::format::{AudioFormat, StreamConfig};
use super::sink::{DeviceSink, DeviceType, IoHandle};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Instant;

/// Recording sink for tests
///
/// Write results can be scripted; once the script runs out every write
/// accepts up to `buffer_size` bytes.
#[derive(Default)]
pub struct MockSink {
    pub buffer_size: usize,
    pub frame_size: usize,
    pub write_script: VecDeque<Result<usize>>,
    pub open_error: Option<Error>,
    pub flush_error: Option<Error>,
    pub frame_size_error: Option<Error>,
    pub reject_iec61937: bool,
    /// Successive render positions; the last one repeats
    pub render_positions: RefCell<VecDeque<u32>>,
    pub presentation_frames: u64,

    pub opened: Vec<(StreamConfig, String)>,
    pub offered: Vec<usize>,
    pub written: Vec<u8>,
    pub flushes: usize,
    pub standbys: usize,
}

impl MockSink {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            frame_size: 4,
            ..Default::default()
        }
    }

    pub fn render_positions(self, positions: impl IntoIterator<Item = u32>) -> Self {
        self.render_positions.borrow_mut().extend(positions);
        self
    }

    pub fn script(mut self, results: impl IntoIterator<Item = Result<usize>>) -> Self {
        self.write_script.extend(results);
        self
    }
}

impl DeviceSink for MockSink {
    fn open(
        &mut self,
        _handle: IoHandle,
        _devices: DeviceType,
        config: &mut StreamConfig,
        address: &str,
    ) -> Result<()> {
        self.opened.push((*config, address.to_string()));
        if let Some(e) = self.open_error.clone() {
            return Err(e);
        }
        if self.reject_iec61937 && config.format == AudioFormat::Iec61937 {
            return Err(Error::BadValue("IEC 61937 not supported".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        self.offered.push(buffer.len());
        let accepted = match self.write_script.pop_front() {
            Some(result) => result?,
            None => buffer.len().min(self.buffer_size),
        };
        self.written
            .extend_from_slice(&buffer[..accepted.min(buffer.len())]);
        Ok(accepted)
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        match self.flush_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn standby(&mut self) -> Result<()> {
        self.standbys += 1;
        Ok(())
    }

    fn frame_size(&self) -> Result<usize> {
        match self.frame_size_error.clone() {
            Some(e) => Err(e),
            None => Ok(self.frame_size),
        }
    }

    fn buffer_size(&self) -> Result<usize> {
        Ok(self.buffer_size)
    }

    fn render_position(&self) -> Result<u32> {
        let mut positions = self.render_positions.borrow_mut();
        let position = positions.front().copied().unwrap_or(0);
        if positions.len() > 1 {
            positions.pop_front();
        }
        Ok(position)
    }

    fn presentation_position(&self) -> Result<(u64, Instant)> {
        Ok((self.presentation_frames, Instant::now()))
    }

    fn audio_properties(&self) -> Result<StreamConfig> {
        self.opened
            .last()
            .map(|(config, _)| *config)
            .ok_or(Error::NoInit)
    }
}
