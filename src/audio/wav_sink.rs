use super::format::{AudioFormat, StreamConfig};
use super::sink::{DeviceSink, DeviceType, IoHandle};
use crate::error::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

/// Sink that records device output to a WAV file
///
/// Bursts land in the file as 16-bit PCM at the device rate, which is how
/// IEC 61937 captures are usually stored. Each write takes at most
/// `chunk_limit` bytes, rounded down to whole frames.
pub struct WavSink {
    path: PathBuf,
    chunk_limit: usize,
    writer: Option<WavWriter<BufWriter<File>>>,
    config: StreamConfig,
    frames_written: u64,
}

impl WavSink {
    pub fn new(path: PathBuf, chunk_limit: usize) -> Self {
        Self {
            path,
            chunk_limit,
            writer: None,
            config: StreamConfig::default(),
            frames_written: 0,
        }
    }

    /// Finish the WAV header and close the file.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| Error::Device(format!("Failed to finalize WAV: {}", e)))?;
            tracing::info!("Wrote {} frames to {:?}", self.frames_written, self.path);
        }
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut WavWriter<BufWriter<File>>> {
        self.writer.as_mut().ok_or(Error::NoInit)
    }

    fn bytes_per_frame(&self) -> usize {
        self.config.channel_mask.channel_count() as usize * 2
    }
}

impl DeviceSink for WavSink {
    fn open(
        &mut self,
        _handle: IoHandle,
        _devices: DeviceType,
        config: &mut StreamConfig,
        _address: &str,
    ) -> Result<()> {
        if !matches!(config.format, AudioFormat::Iec61937 | AudioFormat::Pcm16Bit) {
            return Err(Error::BadValue(format!("WAV sink cannot store format {}", config.format)));
        }
        let channels = config.channel_mask.channel_count();
        if channels == 0 || config.sample_rate == 0 {
            return Err(Error::BadValue(format!("invalid WAV layout: {}", config)));
        }

        let spec = WavSpec {
            channels,
            sample_rate: config.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&self.path, spec)
            .map_err(|e| Error::Device(format!("Failed to create WAV writer: {}", e)))?;

        tracing::info!("WAV sink opened {:?} with {}", self.path, config);
        self.writer = Some(writer);
        self.config = *config;
        self.frames_written = 0;
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        if self.writer.is_none() {
            return Err(Error::NoInit);
        }
        let frame = self.bytes_per_frame();
        let accepted = buffer.len().min(self.chunk_limit) / frame * frame;

        let writer = self.writer()?;
        for sample in buffer[..accepted].chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(|e| Error::Device(format!("Failed to write sample: {}", e)))?;
        }

        self.frames_written += (accepted / frame) as u64;
        Ok(accepted)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?
            .flush()
            .map_err(|e| Error::Device(format!("Failed to flush WAV: {}", e)))
    }

    fn standby(&mut self) -> Result<()> {
        self.flush()
    }

    fn frame_size(&self) -> Result<usize> {
        match self.writer {
            Some(_) => Ok(self.bytes_per_frame()),
            None => Err(Error::NoInit),
        }
    }

    fn buffer_size(&self) -> Result<usize> {
        Ok(self.chunk_limit)
    }

    fn render_position(&self) -> Result<u32> {
        Ok(self.frames_written as u32)
    }

    fn presentation_position(&self) -> Result<(u64, Instant)> {
        Ok((self.frames_written, Instant::now()))
    }

    fn audio_properties(&self) -> Result<StreamConfig> {
        match self.writer {
            Some(_) => Ok(self.config),
            None => Err(Error::NoInit),
        }
    }
}
