use std::io::{Read, Seek, SeekFrom};

use pcap_parser::Linktype;

use super::error::PcapSourceError;
use super::layout;

/// Container format of a capture file, told apart by its first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Legacy,
    PcapNg,
}

/// Peek at the capture format and rewind the reader to the start.
///
/// # Errors
/// Returns `PcapSourceError::Io` when fewer than four bytes can be read or
/// the reader cannot be rewound.
pub fn detect_format<R: Read + Seek>(reader: &mut R) -> Result<CaptureFormat, PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(format_for_magic(&magic))
}

pub fn format_for_magic(magic: &[u8; 4]) -> CaptureFormat {
    if magic == &layout::PCAPNG_MAGIC {
        CaptureFormat::PcapNg
    } else {
        CaptureFormat::Legacy
    }
}

/// Linktype of a PCAPNG interface; unknown interfaces are treated as Ethernet.
pub fn linktype_for_interface(linktypes: &[Linktype], if_id: u32) -> Linktype {
    linktypes
        .get(if_id as usize)
        .copied()
        .unwrap_or(Linktype::ETHERNET)
}

/// PCAPNG timestamps are split 64-bit microsecond counts.
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32) -> f64 {
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    ts as f64 * 1e-6
}

pub fn legacy_ts_to_seconds(ts_sec: u32, ts_usec: u32) -> f64 {
    f64::from(ts_sec) + f64::from(ts_usec) * 1e-6
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use pcap_parser::Linktype;

    use super::*;

    #[test]
    fn detects_pcapng_and_rewinds() {
        let mut cursor = Cursor::new([0x0a, 0x0d, 0x0d, 0x0a, 0x01]);
        assert_eq!(detect_format(&mut cursor).unwrap(), CaptureFormat::PcapNg);
        let mut first = [0u8; 1];
        cursor.read_exact(&mut first).unwrap();
        assert_eq!(first[0], 0x0a);
    }

    #[test]
    fn other_magic_is_legacy() {
        assert_eq!(
            format_for_magic(&[0xd4, 0xc3, 0xb2, 0xa1]),
            CaptureFormat::Legacy
        );
    }

    #[test]
    fn short_file_is_io_error() {
        let mut cursor = Cursor::new([0x0a, 0x0d, 0x0d]);
        let err = detect_format(&mut cursor).unwrap_err();
        assert!(matches!(err, PcapSourceError::Io(_)));
    }

    #[test]
    fn unknown_interface_defaults_to_ethernet() {
        let linktypes = [Linktype::RAW];
        assert_eq!(linktype_for_interface(&linktypes, 0), Linktype::RAW);
        assert_eq!(linktype_for_interface(&linktypes, 3), Linktype::ETHERNET);
    }

    #[test]
    fn timestamps_convert_to_seconds() {
        assert!((pcapng_ts_to_seconds(0, 2_500_000) - 2.5).abs() < f64::EPSILON);
        assert!((legacy_ts_to_seconds(3, 250_000) - 3.25).abs() < 1e-9);
    }
}
