use super::format::{AudioFormat, StreamConfig};
use super::sink::{DeviceSink, DeviceType, IoHandle};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate};
use ringbuf::{HeapProd, HeapRb, traits::*};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Device buffering between writes and the output callback
const RING_DURATION_MS: u64 = 200;
/// Longest a write blocks waiting for room in the ring
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);
const WRITE_POLL: Duration = Duration::from_millis(2);

/// Sink playing 16-bit frames on a cpal output device
///
/// Writes land in a ring buffer drained by the device callback. A write
/// blocks until at least one frame fits, then takes only what fits.
pub struct CpalSink {
    chunk_limit: usize,
    producer: Option<HeapProd<i16>>,
    stream: Option<cpal::Stream>,
    playing: bool,
    played_frames: Arc<AtomicU64>,
    discard: Arc<AtomicBool>,
    config: StreamConfig,
}

impl CpalSink {
    pub fn new(chunk_limit: usize) -> Self {
        Self {
            chunk_limit,
            producer: None,
            stream: None,
            playing: false,
            played_frames: Arc::new(AtomicU64::new(0)),
            discard: Arc::new(AtomicBool::new(false)),
            config: StreamConfig::default(),
        }
    }

    fn find_device(address: &str) -> Result<cpal::Device> {
        let host = cpal::default_host();
        if address.is_empty() || address == "default" {
            return host
                .default_output_device()
                .ok_or_else(|| Error::Device("No output audio device available".to_string()));
        }

        let devices = host
            .output_devices()
            .map_err(|e| Error::Device(format!("Failed to list output devices: {}", e)))?;
        for device in devices {
            if device.name().is_ok_and(|name| name == address) {
                return Ok(device);
            }
        }
        Err(Error::Device(format!("No output device named {:?}", address)))
    }

    fn bytes_per_frame(&self) -> usize {
        self.config.channel_mask.channel_count() as usize * 2
    }

    fn ensure_playing(&mut self) -> Result<()> {
        if !self.playing {
            let stream = self.stream.as_ref().ok_or(Error::NoInit)?;
            stream
                .play()
                .map_err(|e| Error::Device(format!("Failed to start audio stream: {}", e)))?;
            self.playing = true;
        }
        Ok(())
    }
}

impl DeviceSink for CpalSink {
    fn open(
        &mut self,
        _handle: IoHandle,
        _devices: DeviceType,
        config: &mut StreamConfig,
        address: &str,
    ) -> Result<()> {
        if !matches!(config.format, AudioFormat::Iec61937 | AudioFormat::Pcm16Bit) {
            return Err(Error::BadValue(format!("cannot play format {}", config.format)));
        }
        let channels = config.channel_mask.channel_count();
        let device = Self::find_device(address)?;

        let device_config = cpal::StreamConfig {
            channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let ring_samples =
            config.sample_rate as usize * channels as usize * RING_DURATION_MS as usize / 1000;
        let ring = HeapRb::<i16>::new(ring_samples.max(1));
        let (producer, mut consumer) = ring.split();

        let played = self.played_frames.clone();
        let discard = self.discard.clone();
        let stream = device
            .build_output_stream(
                &device_config,
                move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
                    if discard.swap(false, Ordering::AcqRel) {
                        consumer.clear();
                    }
                    let n = consumer.pop_slice(data);
                    data[n..].fill(0);
                    played.fetch_add((n / channels as usize) as u64, Ordering::Relaxed);
                },
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::Device(format!("Failed to build output stream: {}", e)))?;

        tracing::info!("Output device opened with {}", config);
        self.producer = Some(producer);
        self.stream = Some(stream);
        self.playing = false;
        self.played_frames.store(0, Ordering::Relaxed);
        self.config = *config;
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        self.ensure_playing()?;
        let frame = self.bytes_per_frame();
        let wanted = buffer.len().min(self.chunk_limit) / frame * frame;
        if wanted == 0 {
            return Ok(0);
        }

        let producer = self.producer.as_mut().ok_or(Error::NoInit)?;
        let frame_samples = frame / 2;
        let deadline = Instant::now() + WRITE_TIMEOUT;
        while producer.vacant_len() < frame_samples {
            if Instant::now() >= deadline {
                return Err(Error::Device("output device stopped consuming".to_string()));
            }
            std::thread::sleep(WRITE_POLL);
        }

        let room = producer.vacant_len() / frame_samples * frame;
        let accepted = wanted.min(room);
        let samples: Vec<i16> = buffer[..accepted]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        producer.push_slice(&samples);
        Ok(accepted)
    }

    fn flush(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::NoInit);
        }
        self.discard.store(true, Ordering::Release);
        Ok(())
    }

    fn standby(&mut self) -> Result<()> {
        let stream = self.stream.as_ref().ok_or(Error::NoInit)?;
        if self.playing {
            stream
                .pause()
                .map_err(|e| Error::Device(format!("Failed to pause audio stream: {}", e)))?;
            self.playing = false;
        }
        Ok(())
    }

    fn frame_size(&self) -> Result<usize> {
        match self.stream {
            Some(_) => Ok(self.bytes_per_frame()),
            None => Err(Error::NoInit),
        }
    }

    fn buffer_size(&self) -> Result<usize> {
        Ok(self.chunk_limit)
    }

    fn render_position(&self) -> Result<u32> {
        Ok(self.played_frames.load(Ordering::Relaxed) as u32)
    }

    fn presentation_position(&self) -> Result<(u64, Instant)> {
        Ok((self.played_frames.load(Ordering::Relaxed), Instant::now()))
    }

    fn audio_properties(&self) -> Result<StreamConfig> {
        match self.stream {
            Some(_) => Ok(self.config),
            None => Err(Error::NoInit),
        }
    }
}
