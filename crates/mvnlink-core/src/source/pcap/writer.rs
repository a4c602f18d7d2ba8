use std::fs;
use std::net::SocketAddrV4;
use std::path::Path;

use etherparse::PacketBuilder;

use super::error::PcapSourceError;
use super::layout;

const SOURCE_MAC: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
const DESTINATION_MAC: [u8; 6] = [0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f];
const IPV4_TTL: u8 = 64;

/// In-memory PCAPNG writer with a single Ethernet interface.
///
/// Used to produce replayable captures of MXTP traffic for fixtures and
/// tests. Blocks are written big-endian.
///
/// # Examples
/// ```
/// use std::net::SocketAddrV4;
/// use mvnlink_core::source::CaptureWriter;
///
/// let mut writer = CaptureWriter::new();
/// let src: SocketAddrV4 = "10.0.0.1:50000".parse().unwrap();
/// let dst: SocketAddrV4 = "10.0.0.2:9763".parse().unwrap();
/// writer.push_udp(0, src, dst, b"MXTP").unwrap();
/// assert_eq!(writer.packet_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureWriter {
    buffer: Vec<u8>,
    packets: usize,
}

impl Default for CaptureWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureWriter {
    pub fn new() -> Self {
        let mut buffer = Vec::new();
        append_block(&mut buffer, layout::BLOCK_SECTION_HEADER, &section_header_body());
        append_block(
            &mut buffer,
            layout::BLOCK_INTERFACE_DESCRIPTION,
            &interface_description_body(),
        );
        Self { buffer, packets: 0 }
    }

    /// Append a raw Ethernet frame captured at `ts_us` microseconds.
    pub fn push_frame(&mut self, ts_us: u64, frame: &[u8]) -> Result<(), PcapSourceError> {
        if frame.len() > layout::SNAP_LEN as usize {
            return Err(PcapSourceError::PacketTooLarge { len: frame.len() });
        }
        append_block(
            &mut self.buffer,
            layout::BLOCK_ENHANCED_PACKET,
            &enhanced_packet_body(ts_us, frame),
        );
        self.packets += 1;
        Ok(())
    }

    /// Wrap `payload` in Ethernet, IPv4 and UDP headers and append it.
    pub fn push_udp(
        &mut self,
        ts_us: u64,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        payload: &[u8],
    ) -> Result<(), PcapSourceError> {
        let frame = udp_frame(src, dst, payload)?;
        self.push_frame(ts_us, &frame)
    }

    pub fn packet_count(&self) -> usize {
        self.packets
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_to(&self, path: &Path) -> Result<(), PcapSourceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &self.buffer)?;
        Ok(())
    }
}

/// Build an Ethernet II frame carrying one IPv4/UDP datagram.
pub fn udp_frame(
    src: SocketAddrV4,
    dst: SocketAddrV4,
    payload: &[u8],
) -> Result<Vec<u8>, PcapSourceError> {
    let builder = PacketBuilder::ethernet2(SOURCE_MAC, DESTINATION_MAC)
        .ipv4(src.ip().octets(), dst.ip().octets(), IPV4_TTL)
        .udp(src.port(), dst.port());
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut frame, payload)
        .map_err(|err| PcapSourceError::Pcap {
            context: "udp frame build",
            message: err.to_string(),
        })?;
    Ok(frame)
}

fn append_block(output: &mut Vec<u8>, block_type: u32, body: &[u8]) {
    let total_len = (layout::BLOCK_FRAMING_LEN + body.len()) as u32;
    output.extend_from_slice(&block_type.to_be_bytes());
    output.extend_from_slice(&total_len.to_be_bytes());
    output.extend_from_slice(body);
    output.extend_from_slice(&total_len.to_be_bytes());
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    body.extend_from_slice(&layout::BYTE_ORDER_MAGIC.to_be_bytes());
    body.extend_from_slice(&layout::SECTION_VERSION_MAJOR.to_be_bytes());
    body.extend_from_slice(&layout::SECTION_VERSION_MINOR.to_be_bytes());
    // Section length unknown.
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_description_body() -> Vec<u8> {
    let mut body = Vec::with_capacity(8);
    body.extend_from_slice(&layout::LINKTYPE_ETHERNET.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&layout::SNAP_LEN.to_be_bytes());
    body
}

fn enhanced_packet_body(ts_us: u64, data: &[u8]) -> Vec<u8> {
    let ts_high = (ts_us >> 32) as u32;
    let ts_low = ts_us as u32;
    let cap_len = data.len() as u32;
    let pad_len = (4 - data.len() % 4) % 4;
    let mut body = Vec::with_capacity(20 + data.len() + pad_len);
    // Interface 0.
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(data);
    body.resize(body.len() + pad_len, 0);
    body
}
