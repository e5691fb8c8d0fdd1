use super::format::{AudioFormat, ChannelMask, StreamConfig};
use crate::error::{Error, Result};

/// Device rate used for DTS-HD regardless of the application rate.
pub const DTS_HD_DEVICE_RATE: u32 = 192_000;

/// Device side of a burst stream, derived from the application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub config: StreamConfig,
    /// Device frames per application frame
    pub rate_multiplier: u32,
}

/// Map a compressed application config onto the configuration the device
/// must be opened with to carry its data bursts.
///
/// The device format is always IEC 61937.
pub fn resolve_device_config(application: &StreamConfig) -> Result<DeviceConfig> {
    let (rate_multiplier, sample_rate, channel_mask) = match application.format {
        // Some data bursts run at a higher sample rate.
        AudioFormat::EAc3 | AudioFormat::EAc3Joc => {
            let sample_rate = application.sample_rate.checked_mul(4).ok_or_else(|| {
                Error::BadValue(format!("sample rate {} too high", application.sample_rate))
            })?;
            (4, sample_rate, ChannelMask::STEREO)
        }
        AudioFormat::Ac3 | AudioFormat::Dts => {
            (1, application.sample_rate, ChannelMask::STEREO)
        }
        AudioFormat::DtsHd => (1, DTS_HD_DEVICE_RATE, ChannelMask::SURROUND_7_1),
        other => return Err(Error::UnsupportedFormat(other)),
    };

    Ok(DeviceConfig {
        config: StreamConfig::new(AudioFormat::Iec61937, sample_rate, channel_mask),
        rate_multiplier,
    })
}
