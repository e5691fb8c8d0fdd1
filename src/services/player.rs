use crate::audio::sink::{DEVICE_OUT_HDMI, IoHandle};
use crate::audio::{CpalSink, DeviceSink, SpdifStreamOut, StreamConfig, WavSink, WriteStats};
use crate::config::Config;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const IO_HANDLE: IoHandle = 1;

/// Summary of one playback run
#[derive(Debug, Clone)]
pub struct PlaybackReport {
    pub properties: StreamConfig,
    pub bytes_consumed: u64,
    pub render_position: Option<u64>,
    pub presented_frames: Option<u64>,
    pub stats: WriteStats,
}

/// Streams a compressed file through a burst output stream
///
/// Runs synchronously; spawn it on a blocking thread. Setting the stop flag
/// ends playback after the current write.
pub struct Player {
    config: Config,
    stop: Arc<AtomicBool>,
}

impl Player {
    pub fn new(config: Config, stop: Arc<AtomicBool>) -> Self {
        Self { config, stop }
    }

    pub fn run(&self) -> Result<PlaybackReport> {
        match self.config.output.as_str() {
            "wav" => {
                let mut sink = WavSink::new(
                    PathBuf::from(&self.config.wav_path),
                    self.config.sink_buffer_bytes,
                );
                let report = self.play(&mut sink)?;
                sink.finalize()?;
                Ok(report)
            }
            _ => {
                let mut sink = CpalSink::new(self.config.sink_buffer_bytes);
                self.play(&mut sink)
            }
        }
    }

    fn play<S: DeviceSink>(&self, sink: &mut S) -> Result<PlaybackReport> {
        let format = self.config.audio_format()?;
        let application = StreamConfig::new(format, self.config.sample_rate, self.config.channels()?);

        let mut out = SpdifStreamOut::new(sink, format);
        out.open(
            IO_HANDLE,
            DEVICE_OUT_HDMI,
            &application,
            &self.config.device_address,
        )
        .context("Failed to open burst output stream")?;

        let mut input = File::open(&self.config.input_path)
            .with_context(|| format!("Failed to open input: {}", self.config.input_path))?;
        let mut chunk = vec![0u8; self.config.read_chunk_bytes];
        let mut bytes_consumed = 0u64;

        tracing::info!("Playing {}", self.config.input_path);
        loop {
            if self.stop.load(Ordering::Relaxed) {
                tracing::info!("Playback stopped");
                out.flush().context("Failed to flush output stream")?;
                break;
            }

            let n = input.read(&mut chunk).context("Failed to read input")?;
            if n == 0 {
                tracing::info!("End of input");
                break;
            }
            bytes_consumed += out.write(&chunk[..n])? as u64;
        }

        let render_position = out.render_position().ok();
        let presented_frames = out.presentation_position().ok().map(|(frames, _)| frames);
        out.standby().context("Failed to put output stream in standby")?;

        Ok(PlaybackReport {
            properties: out.audio_properties(),
            bytes_consumed,
            render_position,
            presented_frames,
            stats: out.write_stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, ChannelMask};
    use crate::spdif::ac3::tests::ac3_frame;

    #[test]
    fn test_plays_file_into_wav() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ac3");
        let wav = dir.path().join("out.wav");

        let mut stream = Vec::new();
        for _ in 0..3 {
            stream.extend(ac3_frame(8, 0, 0x3C));
        }
        std::fs::write(&input, &stream).unwrap();

        let config = Config {
            input_path: input.to_string_lossy().into_owned(),
            format: "ac3".to_string(),
            channel_mask: "stereo".to_string(),
            output: "wav".to_string(),
            wav_path: wav.to_string_lossy().into_owned(),
            read_chunk_bytes: 100,
            ..Config::default()
        };
        let player = Player::new(config, Arc::new(AtomicBool::new(false)));
        let report = player.run().unwrap();

        assert_eq!(report.bytes_consumed, stream.len() as u64);
        assert_eq!(
            report.properties,
            StreamConfig::new(AudioFormat::Ac3, 48000, ChannelMask::STEREO)
        );
        assert_eq!(report.stats.bursts, 3);
        assert_eq!(report.stats.short_bursts, 0);
        assert_eq!(report.render_position, Some(3 * 1536));

        let reader = hound::WavReader::open(&wav).unwrap();
        assert_eq!(reader.spec().sample_rate, 48000);
        assert_eq!(reader.len(), 3 * 6144 / 2);
    }

    #[test]
    fn test_stop_flag_ends_playback() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ac3");
        std::fs::write(&input, ac3_frame(8, 0, 0x3C)).unwrap();

        let config = Config {
            input_path: input.to_string_lossy().into_owned(),
            output: "wav".to_string(),
            wav_path: dir.path().join("out.wav").to_string_lossy().into_owned(),
            ..Config::default()
        };
        let player = Player::new(config, Arc::new(AtomicBool::new(true)));
        let report = player.run().unwrap();

        assert_eq!(report.bytes_consumed, 0);
        assert_eq!(report.stats.bursts, 0);
    }
}
