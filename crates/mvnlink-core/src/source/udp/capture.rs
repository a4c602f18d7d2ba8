use log::trace;

use crate::source::{DatagramEvent, DatagramSource, PacketSource, SourceError};

use super::packet::parse_udp_packet;

/// UDP payloads extracted from a packet source.
///
/// Frames that are not UDP, cannot be sliced, or are addressed to another
/// port are skipped. With `port: None` every UDP datagram is yielded.
pub struct UdpCaptureSource<S> {
    inner: S,
    port: Option<u16>,
    packets: u64,
}

impl<S: PacketSource> UdpCaptureSource<S> {
    pub fn new(inner: S, port: Option<u16>) -> Self {
        Self {
            inner,
            port,
            packets: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PacketSource> DatagramSource for UdpCaptureSource<S> {
    fn next_datagram(&mut self) -> Result<Option<DatagramEvent>, SourceError> {
        while let Some(packet) = self.inner.next_packet()? {
            self.packets += 1;
            let udp = match parse_udp_packet(packet.linktype, &packet.data) {
                Ok(Some(udp)) => udp,
                Ok(None) => continue,
                Err(err) => {
                    trace!("skipping packet {}: {err}", self.packets);
                    continue;
                }
            };
            if self.port.is_some_and(|port| udp.destination.port() != port) {
                continue;
            }
            return Ok(Some(DatagramEvent {
                ts: packet.ts,
                origin: Some(udp.source),
                payload: udp.payload.to_vec(),
            }));
        }
        Ok(None)
    }

    fn packets_seen(&self) -> u64 {
        self.packets
    }
}
