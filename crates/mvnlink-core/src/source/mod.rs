//! Where raw bytes come from.
//!
//! `PacketSource` yields link-layer packets (capture files). `DatagramSource`
//! yields UDP payloads, either extracted from a packet source or read from a
//! live socket. The replay loop only sees `DatagramSource`.

mod pcap;
mod udp;

use std::net::SocketAddr;

pub use pcap::error::PcapSourceError;
pub use pcap::writer::udp_frame;
pub use pcap::{CaptureWriter, PcapFileSource};
pub use udp::error::UdpError;
pub use udp::{UdpCaptureSource, UdpPacket, UdpSocketSource, parse_udp_packet};

use pcap_parser::Linktype;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct PacketEvent {
    /// Capture timestamp in seconds, when the source has one.
    pub ts: Option<f64>,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError>;
}

/// One UDP payload, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DatagramEvent {
    pub ts: Option<f64>,
    pub origin: Option<SocketAddr>,
    pub payload: Vec<u8>,
}

pub trait DatagramSource {
    /// Next datagram, or `None` once the source is exhausted.
    fn next_datagram(&mut self) -> Result<Option<DatagramEvent>, SourceError>;

    /// Link-layer packets seen so far; equal to datagrams for sockets.
    fn packets_seen(&self) -> u64;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<PcapSourceError> for SourceError {
    fn from(value: PcapSourceError) -> Self {
        match value {
            PcapSourceError::Io(err) => SourceError::Io(err),
            PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
            other @ PcapSourceError::PacketTooLarge { .. } => SourceError::Pcap(other.to_string()),
        }
    }
}
