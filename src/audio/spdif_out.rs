use super::format::{AudioFormat, StreamConfig};
use super::policy::resolve_device_config;
use super::sink::{DeviceSink, DeviceType, IoHandle};
use super::stream_out::StreamOut;
use super::writer::{WriteStats, write_data_burst};
use crate::error::Result;
use crate::spdif::SpdifEncoder;
use std::time::Instant;

/// Output stream for compressed audio on a PCM-only link
///
/// Compressed writes are wrapped in IEC 61937 data bursts and pushed to the
/// sink. The device runs with the burst configuration while queries answer
/// with what the application opened, so positions and durations stay in
/// application frames.
///
/// Not reentrant: one producer drives a stream at a time.
pub struct SpdifStreamOut<'a, S: DeviceSink + ?Sized> {
    stream: StreamOut<'a, S>,
    encoder: SpdifEncoder,
    application: StreamConfig,
    stats: WriteStats,
}

impl<'a, S: DeviceSink + ?Sized> SpdifStreamOut<'a, S> {
    pub fn new(sink: &'a mut S, format: AudioFormat) -> Self {
        Self {
            stream: StreamOut::new(sink),
            encoder: SpdifEncoder::new(format),
            application: StreamConfig::default(),
            stats: WriteStats::default(),
        }
    }

    pub fn open(
        &mut self,
        handle: IoHandle,
        devices: DeviceType,
        config: &StreamConfig,
        address: &str,
    ) -> Result<()> {
        self.application = *config;
        let device = resolve_device_config(config).inspect_err(|e| {
            tracing::error!("SpdifStreamOut::open() cannot carry format {}: {}", config.format, e);
        })?;
        self.stream.set_rate_multiplier(device.rate_multiplier);

        // Logged before the open because the sink may rewrite the config.
        let mut device_config = device.config;
        tracing::info!("SpdifStreamOut::open() application requested {}", config);
        tracing::info!("SpdifStreamOut::open() device configured for {}", device_config);

        let status = self.stream.open(handle, devices, &mut device_config, address);
        tracing::info!("SpdifStreamOut::open() status = {:?}", status);
        status
    }

    /// Frame compressed bytes and deliver every completed burst before
    /// returning. Returns the number of input bytes consumed.
    pub fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        let stream = &mut self.stream;
        let stats = &mut self.stats;
        let mut deliver = |burst: &[u8]| {
            let chunk_limit = stream.buffer_size();
            write_data_burst(burst, chunk_limit, stats, |chunk| stream.write(chunk))
        };
        self.encoder.write(buffer, &mut deliver)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.encoder.reset();
        self.stream.flush()
    }

    pub fn standby(&mut self) -> Result<()> {
        self.encoder.reset();
        self.stream.standby()
    }

    /// Format, rate and channel mask as the application opened them.
    pub fn audio_properties(&self) -> StreamConfig {
        self.application
    }

    /// What the sink is actually running with.
    pub fn device_properties(&self) -> Result<StreamConfig> {
        self.stream.audio_properties()
    }

    pub fn render_position(&mut self) -> Result<u64> {
        self.stream.render_position()
    }

    pub fn presentation_position(&self) -> Result<(u64, Instant)> {
        self.stream.presentation_position()
    }

    pub fn presentation_complete(&mut self) {
        self.stream.presentation_complete();
    }

    pub fn write_stats(&self) -> WriteStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ChannelMask;
    use crate::audio::mock::MockSink;
    use crate::audio::sink::DEVICE_OUT_HDMI;
    use crate::error::Error;
    use crate::spdif::ac3::tests::ac3_frame;
    use crate::spdif::{SYNC_WORD_1, SYNC_WORD_2};

    fn ac3_stereo() -> StreamConfig {
        StreamConfig::new(AudioFormat::Ac3, 48000, ChannelMask::STEREO)
    }

    #[test]
    fn test_open_forwards_device_config() {
        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::EAc3Joc);
        let config = StreamConfig::new(AudioFormat::EAc3Joc, 48000, ChannelMask::SURROUND_5_1);

        out.open(7, DEVICE_OUT_HDMI, &config, "hdmi:0").unwrap();
        assert_eq!(out.audio_properties(), config);
        assert_eq!(
            out.device_properties(),
            Ok(StreamConfig::new(AudioFormat::Iec61937, 192000, ChannelMask::STEREO))
        );
        drop(out);

        assert_eq!(sink.opened.len(), 1);
        assert_eq!(sink.opened[0].1, "hdmi:0");
    }

    #[test]
    fn test_open_dts_hd() {
        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::DtsHd);
        let config = StreamConfig::new(AudioFormat::DtsHd, 44100, ChannelMask::SURROUND_5_1);

        out.open(7, DEVICE_OUT_HDMI, &config, "").unwrap();
        drop(out);

        assert_eq!(
            sink.opened[0].0,
            StreamConfig::new(AudioFormat::Iec61937, 192000, ChannelMask::SURROUND_7_1)
        );
    }

    #[test]
    fn test_unsupported_format_never_reaches_sink() {
        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Other(0x4242_0000));
        let config = StreamConfig::new(AudioFormat::Other(0x4242_0000), 48000, ChannelMask::STEREO);

        assert_eq!(
            out.open(1, DEVICE_OUT_HDMI, &config, ""),
            Err(Error::UnsupportedFormat(AudioFormat::Other(0x4242_0000)))
        );
        assert_eq!(out.audio_properties(), config);
        drop(out);
        assert!(sink.opened.is_empty());
    }

    #[test]
    fn test_rejected_open_reports_requested_config() {
        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Aac);
        let config = StreamConfig::new(AudioFormat::Aac, 44100, ChannelMask::STEREO);

        assert!(out.open(1, DEVICE_OUT_HDMI, &config, "").is_err());
        assert_eq!(out.audio_properties(), config);
        assert_eq!(out.device_properties(), Err(Error::NoInit));
    }

    #[test]
    fn test_sink_open_status_is_returned_unchanged() {
        let mut sink = MockSink::new(1024);
        sink.open_error = Some(Error::Device("no hdmi".to_string()));
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Ac3);

        assert_eq!(
            out.open(1, DEVICE_OUT_HDMI, &ac3_stereo(), ""),
            Err(Error::Device("no hdmi".to_string()))
        );
    }

    #[test]
    fn test_properties_stay_at_application_rate() {
        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Ac3);
        out.open(1, DEVICE_OUT_HDMI, &ac3_stereo(), "").unwrap();
        assert_eq!(out.audio_properties(), ac3_stereo());

        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::EAc3);
        let config = StreamConfig::new(AudioFormat::EAc3, 48000, ChannelMask::STEREO);
        out.open(1, DEVICE_OUT_HDMI, &config, "").unwrap();
        assert_eq!(out.audio_properties().sample_rate, 48000);
        assert_eq!(out.device_properties().unwrap().sample_rate, 192000);
    }

    #[test]
    fn test_write_returns_bytes_consumed() {
        let mut sink = MockSink::new(1024);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Ac3);
        out.open(1, DEVICE_OUT_HDMI, &ac3_stereo(), "").unwrap();
        let frame = ac3_frame(4, 0, 0x5A);

        assert_eq!(out.write(&frame[..50]), Ok(50));
        assert_eq!(out.write_stats().bursts, 0);
        assert_eq!(out.write(&frame[50..]), Ok(frame.len() - 50));

        let stats = out.write_stats();
        assert_eq!(stats.bursts, 1);
        assert_eq!(stats.bytes_written, 6144);
        drop(out);

        // 6144 bytes in chunks of at most 1024
        assert_eq!(sink.offered, vec![1024; 6]);
        assert_eq!(sink.written.len(), 6144);
        assert_eq!(&sink.written[..4], &[0x72, 0xF8, 0x1F, 0x4E]);
    }

    #[test]
    fn test_short_sink_truncates_after_retry_budget() {
        let mut sink = MockSink::new(256).script(std::iter::repeat_n(Ok(100), 20));
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Ac3);
        out.open(1, DEVICE_OUT_HDMI, &ac3_stereo(), "").unwrap();

        let frame = ac3_frame(0, 0, 0x01);
        assert_eq!(out.write(&frame), Ok(frame.len()));

        let stats = out.write_stats();
        assert_eq!(stats.bytes_written, 1000);
        assert_eq!(stats.retries_exhausted, 1);
        drop(out);
        assert_eq!(sink.offered.len(), 10);
    }

    #[test]
    fn test_flush_and_standby_start_a_fresh_burst() {
        let mut sink = MockSink::new(8192);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::Ac3);
        out.open(1, DEVICE_OUT_HDMI, &ac3_stereo(), "").unwrap();
        let stale = ac3_frame(0, 0, 0xEE);
        let fresh = ac3_frame(0, 0, 0x11);

        out.write(&stale[..40]).unwrap();
        out.flush().unwrap();
        out.write(&fresh).unwrap();

        out.write(&stale[..90]).unwrap();
        out.standby().unwrap();
        out.write(&fresh).unwrap();
        drop(out);

        assert_eq!(sink.flushes, 1);
        assert_eq!(sink.standbys, 1);
        assert_eq!(sink.written.len(), 2 * 6144);
        for burst in sink.written.chunks(6144) {
            assert_eq!(u16::from_le_bytes([burst[0], burst[1]]), SYNC_WORD_1);
            assert_eq!(u16::from_le_bytes([burst[2], burst[3]]), SYNC_WORD_2);
            // payload is the fresh frame, byte-swapped
            assert_eq!(&burst[8..10], &[0x77, 0x0B]);
            assert!(burst[14..8 + fresh.len()].iter().all(|&b| b == 0x11));
            assert!(!burst.contains(&0xEE));
        }
    }

    #[test]
    fn test_render_position_in_application_frames() {
        let mut sink = MockSink::new(1024).render_positions([192000]);
        let mut out = SpdifStreamOut::new(&mut sink, AudioFormat::EAc3);
        let config = StreamConfig::new(AudioFormat::EAc3, 48000, ChannelMask::STEREO);
        out.open(1, DEVICE_OUT_HDMI, &config, "").unwrap();

        assert_eq!(out.render_position(), Ok(48000));
    }
}
