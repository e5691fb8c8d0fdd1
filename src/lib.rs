//! Compressed audio output over PCM-only links.
//!
//! Encoded AC3, E-AC3 and DTS streams are wrapped in IEC 61937 data bursts
//! and pushed through a [`audio::DeviceSink`] that only understands 16-bit
//! PCM. [`audio::SpdifStreamOut`] negotiates the burst configuration with the
//! device while reporting the application's own format upward.

pub mod audio;
pub mod config;
pub mod error;
pub mod services;
pub mod spdif;

pub use audio::{AudioFormat, ChannelMask, SpdifStreamOut, StreamConfig};
pub use error::{Error, Result};
