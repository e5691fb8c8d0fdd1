//! DTS core and DTS-HD extension substream scanning

use super::{FrameInfo, Scan, read_bits, seek_sync};

/// 16-bit big-endian core sync word
pub const SYNC: [u8; 4] = [0x7F, 0xFE, 0x80, 0x01];
/// Extension substream sync word
pub const EXSS_SYNC: [u8; 4] = [0x64, 0x58, 0x20, 0x25];

const CORE_HEADER_BYTES: usize = 9;
const MIN_CORE_FRAME_BYTES: usize = 96;
/// Enough to read the extension substream size in either header layout
const EXSS_HEADER_BYTES: usize = 10;

const SAMPLE_RATES: [u32; 16] = [
    0, 8000, 16000, 32000, 0, 0, 11025, 22050, 44100, 0, 0, 12000, 24000, 48000, 0, 0,
];

/// Scan a core frame. With `with_extension`, an extension substream directly
/// after the core is treated as part of the same frame.
pub fn scan(data: &[u8], with_extension: bool) -> Scan {
    if !data.starts_with(&SYNC) {
        return seek_sync(data, &SYNC);
    }
    if data.len() < CORE_HEADER_BYTES {
        return Scan::NeedMore;
    }

    // sync(32) ftype(1) short(5) cpf(1) nblks(7) fsize(14) amode(6) sfreq(4)
    let nblks = read_bits(data, 39, 7);
    let fsize = read_bits(data, 46, 14) as usize;
    let sfreq = read_bits(data, 66, 4) as usize;

    let core_len = fsize + 1;
    let sample_rate = SAMPLE_RATES[sfreq];
    if core_len < MIN_CORE_FRAME_BYTES || sample_rate == 0 {
        return Scan::Skip(SYNC.len());
    }

    let mut info = FrameInfo {
        len: core_len,
        samples: (nblks + 1) * 32,
        sample_rate,
        independent: true,
        substream_id: 0,
        type_info: 0,
    };

    if with_extension {
        match extension_len(&data[core_len.min(data.len())..]) {
            Some(ext_len) => info.len += ext_len,
            None => return Scan::NeedMore,
        }
    }

    if data.len() < info.len {
        return Scan::NeedMore;
    }
    Scan::Frame(info)
}

/// Length of an extension substream at the start of `data`, zero when none
/// follows, or None when more bytes are needed to tell.
fn extension_len(data: &[u8]) -> Option<usize> {
    if data.len() < EXSS_SYNC.len() {
        return None;
    }
    if !data.starts_with(&EXSS_SYNC) {
        return Some(0);
    }
    if data.len() < EXSS_HEADER_BYTES {
        return None;
    }

    // user(8) index(2) header_size_type(1) header_size(8|12) fsize(16|20)
    let offset = 32 + 8 + 2;
    let wide = read_bits(data, offset, 1) == 1;
    let fsize = if wide {
        read_bits(data, offset + 1 + 12, 20)
    } else {
        read_bits(data, offset + 1 + 8, 16)
    };
    Some(fsize as usize + 1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn write_bits(data: &mut [u8], bit_offset: usize, count: usize, value: u32) {
        for i in 0..count {
            let bit = (value >> (count - 1 - i)) & 1;
            let pos = bit_offset + i;
            data[pos / 8] &= !(0x80 >> (pos % 8));
            data[pos / 8] |= (bit as u8) << (7 - pos % 8);
        }
    }

    /// DTS core frame at 48 kHz
    pub fn core_frame(len: usize, samples: u32, fill: u8) -> Vec<u8> {
        let mut frame = vec![fill; len];
        frame[..4].copy_from_slice(&SYNC);
        write_bits(&mut frame, 32, 7, 0);
        write_bits(&mut frame, 39, 7, samples / 32 - 1);
        write_bits(&mut frame, 46, 14, (len - 1) as u32);
        write_bits(&mut frame, 60, 6, 9);
        write_bits(&mut frame, 66, 4, 13);
        frame
    }

    /// Extension substream with the narrow header layout
    pub fn exss_frame(len: usize, fill: u8) -> Vec<u8> {
        let mut frame = vec![fill; len];
        frame[..4].copy_from_slice(&EXSS_SYNC);
        write_bits(&mut frame, 32, 11, 0);
        write_bits(&mut frame, 43, 8, 15);
        write_bits(&mut frame, 51, 16, (len - 1) as u32);
        frame
    }

    #[test]
    fn test_scan_core() {
        let frame = core_frame(1024, 512, 0x11);
        match scan(&frame, false) {
            Scan::Frame(info) => {
                assert_eq!(info.len, 1024);
                assert_eq!(info.samples, 512);
                assert_eq!(info.sample_rate, 48000);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(scan(&frame[..500], false), Scan::NeedMore);
    }

    #[test]
    fn test_scan_with_extension() {
        let mut data = core_frame(1024, 512, 0x11);
        data.extend(exss_frame(300, 0x22));
        match scan(&data, true) {
            Scan::Frame(info) => assert_eq!(info.len, 1324),
            other => panic!("unexpected {:?}", other),
        }

        // a following core frame means no extension
        let mut data = core_frame(1024, 512, 0x11);
        data.extend(core_frame(1024, 512, 0x11));
        match scan(&data, true) {
            Scan::Frame(info) => assert_eq!(info.len, 1024),
            other => panic!("unexpected {:?}", other),
        }

        // cannot tell yet
        let data = core_frame(1024, 512, 0x11);
        assert_eq!(scan(&data, true), Scan::NeedMore);
    }

    #[test]
    fn test_wide_extension_header() {
        let mut exss = vec![0u8; 64];
        exss[..4].copy_from_slice(&EXSS_SYNC);
        write_bits(&mut exss, 42, 1, 1);
        write_bits(&mut exss, 43, 12, 20);
        write_bits(&mut exss, 55, 20, 63);
        assert_eq!(extension_len(&exss), Some(64));
    }

    #[test]
    fn test_invalid_rate_is_skipped() {
        let mut frame = core_frame(1024, 512, 0);
        write_bits(&mut frame, 66, 4, 0);
        assert_eq!(scan(&frame, false), Scan::Skip(4));
    }
}
