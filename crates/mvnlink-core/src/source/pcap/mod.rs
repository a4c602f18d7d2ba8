//! PCAP/PCAPNG capture files.
//!
//! `PcapFileSource` replays packets from a PCAP or PCAPNG file as raw
//! link-layer frames; `CaptureWriter` produces PCAPNG files of UDP
//! datagrams so streams can be recorded and replayed later.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;
pub mod writer;

pub use parser::PcapFileSource;
pub use writer::CaptureWriter;
