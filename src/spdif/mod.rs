//! IEC 61937 data burst framing
//!
//! Compressed frames are wrapped in bursts that look like 16-bit PCM to the
//! device: a four word preamble, the byte-swapped payload, then zero padding
//! up to the repetition period of the format.

pub mod ac3;
pub mod dts;
pub mod encoder;

pub use encoder::SpdifEncoder;

/// Preamble word Pa
pub const SYNC_WORD_1: u16 = 0xF872;
/// Preamble word Pb
pub const SYNC_WORD_2: u16 = 0x4E1F;
/// Bytes in the Pa, Pb, Pc, Pd preamble
pub const PREAMBLE_BYTES: usize = 8;
/// Bytes per 16-bit stereo frame on the burst link
pub const BYTES_PER_STEREO_FRAME: usize = 4;

/// IEC 61937 data types carried in Pc bits 0-6
pub mod data_type {
    pub const AC3: u16 = 1;
    pub const DTS_TYPE_I: u16 = 11;
    pub const DTS_TYPE_II: u16 = 12;
    pub const DTS_TYPE_III: u16 = 13;
    pub const DTS_TYPE_IV: u16 = 17;
    pub const EAC3: u16 = 21;
}

/// Destination for finished bursts
pub trait BurstSink {
    /// Deliver one burst, returning the bytes the output accepted.
    fn write_data_burst(&mut self, burst: &[u8]) -> usize;
}

impl<F> BurstSink for F
where
    F: FnMut(&[u8]) -> usize,
{
    fn write_data_burst(&mut self, burst: &[u8]) -> usize {
        self(burst)
    }
}

/// Result of looking for a frame at the start of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// Not enough bytes to decide
    NeedMore,
    /// No usable frame starts here; drop this many bytes
    Skip(usize),
    Frame(FrameInfo),
}

/// What a scanner learned from a frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Total frame length in bytes
    pub len: usize,
    /// Audio samples per channel this frame adds to the burst
    pub samples: u32,
    pub sample_rate: u32,
    /// Starts a new program rather than extending the previous frame
    pub independent: bool,
    /// Program the frame belongs to when several are interleaved
    pub substream_id: u8,
    /// Format specific bits for Pc (AC3 bitstream mode)
    pub type_info: u8,
}

/// Skip to the next occurrence of `sync`, keeping a possible partial match
/// at the tail.
pub(crate) fn seek_sync(data: &[u8], sync: &[u8]) -> Scan {
    if data.len() < sync.len() {
        return Scan::NeedMore;
    }
    match data.windows(sync.len()).position(|w| w == sync) {
        Some(0) => Scan::NeedMore,
        Some(pos) => Scan::Skip(pos),
        None => Scan::Skip(data.len() - (sync.len() - 1)),
    }
}

/// Read `count` bits (at most 32) MSB first starting at `bit_offset`.
pub(crate) fn read_bits(data: &[u8], bit_offset: usize, count: usize) -> u32 {
    let mut value = 0u32;
    for bit in bit_offset..bit_offset + count {
        let byte = data[bit / 8];
        value = (value << 1) | ((byte >> (7 - bit % 8)) & 1) as u32;
    }
    value
}
