//! UDP payload extraction and live UDP input.

pub mod capture;
pub mod error;
pub mod packet;
pub mod socket;

pub use capture::UdpCaptureSource;
pub use packet::{UdpPacket, parse_udp_packet};
pub use socket::UdpSocketSource;
