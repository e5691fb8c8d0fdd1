//! AC3 and E-AC3 sync frame scanning

use super::{FrameInfo, Scan, seek_sync};

pub const SYNC: [u8; 2] = [0x0B, 0x77];

/// Audio samples per channel in a six block sync frame
pub const SAMPLES_PER_SYNC_FRAME: u32 = 1536;
const SAMPLES_PER_BLOCK: u32 = 256;
const HEADER_BYTES: usize = 6;

const SAMPLE_RATES: [u32; 3] = [48000, 44100, 32000];
const REDUCED_SAMPLE_RATES: [u32; 3] = [24000, 22050, 16000];
const BLOCKS_PER_FRAME: [u32; 4] = [1, 2, 3, 6];

/// Nominal bit rates in kbit/s, indexed by frmsizecod / 2
const BIT_RATES: [u32; 19] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
];

/// Which of the two bitstream syntaxes to accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Ac3,
    EAc3,
}

/// Length in 16-bit words of an AC3 frame.
fn ac3_frame_words(fscod: usize, frmsizecod: usize) -> usize {
    let bit_rate = BIT_RATES[frmsizecod / 2] as usize;
    match fscod {
        0 => bit_rate * 2,
        // 44.1 kHz frames alternate in length to keep the average bit rate
        1 => bit_rate * 1000 * 1536 / 44100 / 16 + (frmsizecod & 1),
        _ => bit_rate * 3,
    }
}

pub fn scan(data: &[u8], syntax: Syntax) -> Scan {
    if !data.starts_with(&SYNC) {
        return seek_sync(data, &SYNC);
    }
    if data.len() < HEADER_BYTES {
        return Scan::NeedMore;
    }

    let bsid = data[5] >> 3;
    let info = match bsid {
        0..=10 => {
            let fscod = (data[4] >> 6) as usize;
            let frmsizecod = (data[4] & 0x3F) as usize;
            if fscod == 3 || frmsizecod > 37 {
                return Scan::Skip(SYNC.len());
            }
            FrameInfo {
                len: ac3_frame_words(fscod, frmsizecod) * 2,
                samples: SAMPLES_PER_SYNC_FRAME,
                sample_rate: SAMPLE_RATES[fscod],
                independent: true,
                substream_id: 0,
                type_info: data[5] & 0x07,
            }
        }
        11..=16 => {
            let strmtyp = data[2] >> 6;
            let substreamid = (data[2] >> 3) & 0x07;
            let frmsiz = (((data[2] & 0x07) as usize) << 8) | data[3] as usize;
            let fscod = (data[4] >> 6) as usize;
            let (sample_rate, blocks) = if fscod == 3 {
                let fscod2 = ((data[4] >> 4) & 0x03) as usize;
                if fscod2 == 3 {
                    return Scan::Skip(SYNC.len());
                }
                (REDUCED_SAMPLE_RATES[fscod2], 6)
            } else {
                let numblkscod = ((data[4] >> 4) & 0x03) as usize;
                (SAMPLE_RATES[fscod], BLOCKS_PER_FRAME[numblkscod])
            };
            // dependent substreams ride along with their independent frame
            let independent = strmtyp != 1;
            let samples = if independent && substreamid == 0 {
                blocks * SAMPLES_PER_BLOCK
            } else {
                0
            };
            FrameInfo {
                len: (frmsiz + 1) * 2,
                samples,
                sample_rate,
                independent,
                substream_id: substreamid,
                type_info: 0,
            }
        }
        _ => return Scan::Skip(SYNC.len()),
    };

    let wanted = if bsid <= 10 { Syntax::Ac3 } else { Syntax::EAc3 };
    if wanted != syntax {
        tracing::debug!("Skipping {:?} frame in {:?} stream", wanted, syntax);
        return Scan::Skip(SYNC.len());
    }
    if data.len() < info.len {
        return Scan::NeedMore;
    }
    Scan::Frame(info)
}
