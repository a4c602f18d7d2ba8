use std::fs::File;
use std::path::Path;

use log::trace;
use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};

use crate::source::{PacketEvent, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    CaptureFormat, detect_format, legacy_ts_to_seconds, linktype_for_interface,
    pcapng_ts_to_seconds,
};

/// Packet source backed by a PCAP or PCAPNG file.
pub struct PcapFileSource {
    inner: PcapReader,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let inner = create_reader(file)?;
        Ok(Self { inner })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        Ok(self.inner.next_packet()?)
    }
}

fn create_reader(mut file: File) -> Result<PcapReader, PcapSourceError> {
    match detect_format(&mut file)? {
        CaptureFormat::PcapNg => {
            let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
                .map_err(|e| pcap_error("pcapng reader init", e))?;
            Ok(PcapReader::Ng {
                reader,
                linktypes: Vec::new(),
            })
        }
        CaptureFormat::Legacy => {
            let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
                .map_err(|e| pcap_error("pcap reader init", e))?;
            Ok(PcapReader::Legacy {
                reader,
                linktype: None,
            })
        }
    }
}

fn pcap_error<E: std::fmt::Display>(context: &'static str, err: E) -> PcapSourceError {
    PcapSourceError::Pcap {
        context,
        message: err.to_string(),
    }
}

impl PcapReader {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, PcapSourceError> {
        loop {
            let step = match self {
                PcapReader::Legacy { reader, linktype } => match reader.next() {
                    Ok((offset, block)) => {
                        let event = match block {
                            PcapBlockOwned::LegacyHeader(header) => {
                                *linktype = Some(header.network);
                                None
                            }
                            PcapBlockOwned::Legacy(packet) => Some(PacketEvent {
                                ts: Some(legacy_ts_to_seconds(packet.ts_sec, packet.ts_usec)),
                                linktype: linktype.unwrap_or(Linktype::ETHERNET),
                                data: packet.data.to_vec(),
                            }),
                            _ => None,
                        };
                        reader.consume(offset);
                        Step::Block(event)
                    }
                    Err(PcapError::Eof) => Step::Eof,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| pcap_error("pcap reader refill", e))?;
                        Step::Block(None)
                    }
                    Err(e) => return Err(pcap_error("pcap reader next", e)),
                },
                PcapReader::Ng { reader, linktypes } => match reader.next() {
                    Ok((offset, block)) => {
                        let event = match block {
                            PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                                linktypes.push(intf.linktype);
                                None
                            }
                            PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                                Some(PacketEvent {
                                    ts: Some(pcapng_ts_to_seconds(packet.ts_high, packet.ts_low)),
                                    linktype: linktype_for_interface(linktypes, packet.if_id),
                                    data: packet.data.to_vec(),
                                })
                            }
                            _ => None,
                        };
                        reader.consume(offset);
                        Step::Block(event)
                    }
                    Err(PcapError::Eof) => Step::Eof,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| pcap_error("pcapng reader refill", e))?;
                        Step::Block(None)
                    }
                    Err(e) => return Err(pcap_error("pcapng reader next", e)),
                },
            };

            match step {
                Step::Block(Some(event)) => {
                    trace!("captured packet of {} bytes", event.data.len());
                    return Ok(Some(event));
                }
                Step::Block(None) => continue,
                Step::Eof => return Ok(None),
            }
        }
    }
}

enum Step {
    Block(Option<PacketEvent>),
    Eof,
}
