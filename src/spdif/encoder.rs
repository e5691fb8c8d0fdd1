use super::ac3::{self, Syntax};
use super::{
    BYTES_PER_STEREO_FRAME, BurstSink, FrameInfo, PREAMBLE_BYTES, SYNC_WORD_1, SYNC_WORD_2, Scan,
    data_type, dts,
};
use crate::audio::AudioFormat;
use crate::error::{Error, Result};

/// Stereo frame rate DTS-HD bursts are timed against (192 kHz, 8 channels)
const DTS_HD_RATE: u64 = 768_000;
const DTS_HD_START_CODE: [u8; 10] = [0, 0, 0, 0, 0, 0, 0, 0, 0xFE, 0xFE];
const DTS_HD_HEADER_BYTES: usize = 12;
const DTS_HD_LENGTH_ALIGN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Ac3,
    EAc3,
    Dts,
    DtsHd,
}

/// Preamble values and size of one burst
struct BurstLayout {
    pc: u16,
    pd: u16,
    period_bytes: usize,
    dts_hd_header: bool,
}

impl Framing {
    fn for_format(format: AudioFormat) -> Option<Self> {
        match format {
            AudioFormat::Ac3 => Some(Self::Ac3),
            AudioFormat::EAc3 | AudioFormat::EAc3Joc => Some(Self::EAc3),
            AudioFormat::Dts => Some(Self::Dts),
            AudioFormat::DtsHd => Some(Self::DtsHd),
            _ => None,
        }
    }

    fn scan(self, data: &[u8]) -> Scan {
        match self {
            Self::Ac3 => ac3::scan(data, Syntax::Ac3),
            Self::EAc3 => ac3::scan(data, Syntax::EAc3),
            Self::Dts => dts::scan(data, false),
            Self::DtsHd => dts::scan(data, true),
        }
    }

    /// E-AC3 bursts collect six audio blocks of the first program plus every
    /// other substream interleaved with them, so a burst is only known to be
    /// complete when the first program's next frame begins.
    fn starts_burst(self, frame: &FrameInfo, collected_samples: u32) -> bool {
        match self {
            Self::EAc3 => {
                frame.independent
                    && frame.substream_id == 0
                    && collected_samples >= ac3::SAMPLES_PER_SYNC_FRAME
            }
            _ => true,
        }
    }

    fn one_frame_per_burst(self) -> bool {
        self != Self::EAc3
    }

    fn layout(self, first: &FrameInfo, samples: u32, payload_len: usize) -> Option<BurstLayout> {
        let layout = match self {
            Self::Ac3 => BurstLayout {
                pc: data_type::AC3 | (first.type_info as u16) << 8,
                pd: (payload_len * 8) as u16,
                period_bytes: ac3::SAMPLES_PER_SYNC_FRAME as usize * BYTES_PER_STEREO_FRAME,
                dts_hd_header: false,
            },
            Self::EAc3 => BurstLayout {
                pc: data_type::EAC3,
                pd: payload_len as u16,
                period_bytes: 4 * ac3::SAMPLES_PER_SYNC_FRAME as usize * BYTES_PER_STEREO_FRAME,
                dts_hd_header: false,
            },
            Self::Dts => {
                let pc = match samples {
                    512 => data_type::DTS_TYPE_I,
                    1024 => data_type::DTS_TYPE_II,
                    2048 => data_type::DTS_TYPE_III,
                    _ => return None,
                };
                BurstLayout {
                    pc,
                    pd: (payload_len * 8) as u16,
                    period_bytes: samples as usize * BYTES_PER_STEREO_FRAME,
                    dts_hd_header: false,
                }
            }
            Self::DtsHd => {
                let period = DTS_HD_RATE * samples as u64 / first.sample_rate as u64;
                let subtype: u16 = match period {
                    512 => 0,
                    1024 => 1,
                    2048 => 2,
                    4096 => 3,
                    8192 => 4,
                    16384 => 5,
                    _ => return None,
                };
                let out_bytes = DTS_HD_HEADER_BYTES + payload_len;
                let length_code = (out_bytes + PREAMBLE_BYTES).next_multiple_of(DTS_HD_LENGTH_ALIGN)
                    - PREAMBLE_BYTES;
                BurstLayout {
                    pc: data_type::DTS_TYPE_IV | subtype << 8,
                    pd: length_code as u16,
                    period_bytes: period as usize * BYTES_PER_STEREO_FRAME,
                    dts_hd_header: true,
                }
            }
        };
        Some(layout)
    }
}

/// Wraps compressed frames into IEC 61937 data bursts.
///
/// Input is buffered until whole frames are available, so every call
/// consumes all of its input. Partial frames and partially collected bursts
/// stay in the encoder until the next call or [`SpdifEncoder::reset`].
pub struct SpdifEncoder {
    format: AudioFormat,
    framing: Option<Framing>,
    pending: Vec<u8>,
    payload: Vec<u8>,
    first_frame: Option<FrameInfo>,
    collected_samples: u32,
    burst: Vec<u8>,
}

impl SpdifEncoder {
    pub fn new(format: AudioFormat) -> Self {
        let framing = Framing::for_format(format);
        if framing.is_none() {
            tracing::warn!("No IEC 61937 framing for format {}", format);
        }
        Self {
            format,
            framing,
            pending: Vec::new(),
            payload: Vec::new(),
            first_frame: None,
            collected_samples: 0,
            burst: Vec::new(),
        }
    }

    pub fn is_format_supported(format: AudioFormat) -> bool {
        Framing::for_format(format).is_some()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Bytes held back waiting for the rest of a frame or burst
    pub fn residue(&self) -> usize {
        self.pending.len() + self.payload.len()
    }

    /// Consume compressed bytes, sending every completed burst to `out`
    /// before returning.
    pub fn write(&mut self, data: &[u8], out: &mut impl BurstSink) -> Result<usize> {
        let framing = self.framing.ok_or(Error::UnsupportedFormat(self.format))?;
        self.pending.extend_from_slice(data);

        let mut offset = 0;
        loop {
            match framing.scan(&self.pending[offset..]) {
                Scan::NeedMore => break,
                Scan::Skip(skipped) => {
                    tracing::trace!("Skipping {} unsynchronized bytes", skipped);
                    offset += skipped;
                }
                Scan::Frame(frame) => {
                    if self.first_frame.is_some()
                        && framing.starts_burst(&frame, self.collected_samples)
                    {
                        self.send_burst(framing, out);
                    }
                    self.first_frame.get_or_insert(frame);
                    self.payload
                        .extend_from_slice(&self.pending[offset..offset + frame.len]);
                    self.collected_samples += frame.samples;
                    offset += frame.len;

                    if framing.one_frame_per_burst() {
                        self.send_burst(framing, out);
                    }
                }
            }
        }

        self.pending.drain(..offset);
        Ok(data.len())
    }

    /// Drop partial frames and any burst being collected.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.payload.clear();
        self.first_frame = None;
        self.collected_samples = 0;
    }

    fn send_burst(&mut self, framing: Framing, out: &mut impl BurstSink) {
        let Some(first) = self.first_frame.take() else {
            return;
        };
        let samples = std::mem::take(&mut self.collected_samples);

        match framing.layout(&first, samples, self.payload.len()) {
            Some(layout) if self.fill_burst(&layout) => {
                let written = out.write_data_burst(&self.burst);
                if written < self.burst.len() {
                    tracing::debug!("Burst truncated to {} of {} bytes", written, self.burst.len());
                }
            }
            Some(_) => {}
            None => tracing::warn!(
                "Dropping {} byte burst: no layout for {} samples at {} Hz",
                self.payload.len(),
                samples,
                first.sample_rate
            ),
        }
        self.payload.clear();
    }

    fn fill_burst(&mut self, layout: &BurstLayout) -> bool {
        let header_len = if layout.dts_hd_header {
            DTS_HD_HEADER_BYTES
        } else {
            0
        };
        let data_len = header_len + self.payload.len();
        if PREAMBLE_BYTES + data_len.next_multiple_of(2) > layout.period_bytes {
            tracing::warn!(
                "Dropping {} byte payload, burst period is {} bytes",
                data_len,
                layout.period_bytes
            );
            return false;
        }

        self.burst.clear();
        for word in [SYNC_WORD_1, SYNC_WORD_2, layout.pc, layout.pd] {
            self.burst.extend_from_slice(&word.to_le_bytes());
        }

        let start = self.burst.len();
        if layout.dts_hd_header {
            self.burst.extend_from_slice(&DTS_HD_START_CODE);
            self.burst
                .extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        }
        self.burst.extend_from_slice(&self.payload);
        if data_len % 2 == 1 {
            self.burst.push(0);
        }
        // big-endian bitstream into little-endian 16-bit words
        for pair in self.burst[start..].chunks_exact_mut(2) {
            pair.swap(0, 1);
        }

        self.burst.resize(layout.period_bytes, 0);
        true
    }
}
