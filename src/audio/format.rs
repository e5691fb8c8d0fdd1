use std::fmt;
use std::str::FromStr;

/// Audio data format, carrying the platform's numeric format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    #[default]
    Default,
    Pcm16Bit,
    Mp3,
    Aac,
    Ac3,
    EAc3,
    EAc3Joc,
    Dts,
    DtsHd,
    /// Compressed audio wrapped in IEC 61937 data bursts
    Iec61937,
    Other(u32),
}

impl AudioFormat {
    pub fn from_code(code: u32) -> Self {
        match code {
            0x0000_0000 => Self::Default,
            0x0000_0001 => Self::Pcm16Bit,
            0x0100_0000 => Self::Mp3,
            0x0400_0000 => Self::Aac,
            0x0900_0000 => Self::Ac3,
            0x0A00_0000 => Self::EAc3,
            0x0A00_0001 => Self::EAc3Joc,
            0x0B00_0000 => Self::Dts,
            0x0C00_0000 => Self::DtsHd,
            0x0D00_0000 => Self::Iec61937,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Default => 0x0000_0000,
            Self::Pcm16Bit => 0x0000_0001,
            Self::Mp3 => 0x0100_0000,
            Self::Aac => 0x0400_0000,
            Self::Ac3 => 0x0900_0000,
            Self::EAc3 => 0x0A00_0000,
            Self::EAc3Joc => 0x0A00_0001,
            Self::Dts => 0x0B00_0000,
            Self::DtsHd => 0x0C00_0000,
            Self::Iec61937 => 0x0D00_0000,
            Self::Other(code) => *code,
        }
    }

    /// True when the byte count of a buffer maps linearly onto frames.
    pub fn has_proportional_frames(&self) -> bool {
        matches!(self, Self::Pcm16Bit | Self::Iec61937)
    }

    /// Bytes per sample for proportional formats.
    pub fn bytes_per_sample(&self) -> Option<usize> {
        match self {
            Self::Pcm16Bit | Self::Iec61937 => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.code())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pcm16" | "pcm_16_bit" => Ok(Self::Pcm16Bit),
            "mp3" => Ok(Self::Mp3),
            "aac" => Ok(Self::Aac),
            "ac3" => Ok(Self::Ac3),
            "eac3" | "e-ac3" => Ok(Self::EAc3),
            "eac3-joc" | "e-ac3-joc" => Ok(Self::EAc3Joc),
            "dts" => Ok(Self::Dts),
            "dts-hd" | "dtshd" => Ok(Self::DtsHd),
            "iec61937" => Ok(Self::Iec61937),
            other => Err(format!("unknown audio format: {}", other)),
        }
    }
}

/// Output channel mask, one bit per speaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    pub const NONE: Self = Self(0x0);
    pub const STEREO: Self = Self(0x3);
    pub const SURROUND_5_1: Self = Self(0x3F);
    pub const SURROUND_7_1: Self = Self(0x63F);

    pub fn channel_count(&self) -> u16 {
        self.0.count_ones() as u16
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for ChannelMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stereo" => Ok(Self::STEREO),
            "5.1" => Ok(Self::SURROUND_5_1),
            "7.1" => Ok(Self::SURROUND_7_1),
            other => Err(format!("unknown channel layout: {}", other)),
        }
    }
}

/// Format, rate and channel layout of one side of an output stream.
///
/// The default value is what a stream reports before it has been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamConfig {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channel_mask: ChannelMask,
}

impl StreamConfig {
    pub fn new(format: AudioFormat, sample_rate: u32, channel_mask: ChannelMask) -> Self {
        Self {
            format,
            sample_rate,
            channel_mask,
        }
    }

    /// Bytes per frame, or None when the format is not frame-proportional.
    pub fn frame_size(&self) -> Option<usize> {
        self.format
            .bytes_per_sample()
            .map(|bytes| bytes * self.channel_mask.channel_count() as usize)
    }
}

impl fmt::Display for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sampleRate {}, format {}, channelMask {}",
            self.sample_rate, self.format, self.channel_mask
        )
    }
}
