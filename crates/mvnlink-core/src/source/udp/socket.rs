use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use log::debug;
use time::OffsetDateTime;

use crate::source::{DatagramEvent, DatagramSource, SourceError};

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM_LEN: usize = 65_535;

/// Live UDP socket. A read timeout, when set, ends the stream.
#[derive(Debug)]
pub struct UdpSocketSource {
    socket: UdpSocket,
    buffer: Vec<u8>,
    received: u64,
}

impl UdpSocketSource {
    pub fn bind(addr: SocketAddr, timeout: Option<Duration>) -> Result<Self, SourceError> {
        let socket = UdpSocket::bind(addr)?;
        Self::from_socket(socket, timeout)
    }

    pub fn from_socket(socket: UdpSocket, timeout: Option<Duration>) -> Result<Self, SourceError> {
        socket.set_read_timeout(timeout)?;
        Ok(Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM_LEN],
            received: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SourceError> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramSource for UdpSocketSource {
    fn next_datagram(&mut self) -> Result<Option<DatagramEvent>, SourceError> {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((len, origin)) => {
                self.received += 1;
                let now = OffsetDateTime::now_utc();
                Ok(Some(DatagramEvent {
                    ts: Some(now.unix_timestamp_nanos() as f64 * 1e-9),
                    origin: Some(origin),
                    payload: self.buffer[..len].to_vec(),
                }))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                debug!("socket read timed out after {} datagrams", self.received);
                Ok(None)
            }
            Err(err) => Err(SourceError::Io(err)),
        }
    }

    fn packets_seen(&self) -> u64 {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receives_then_times_out() {
        let mut source = UdpSocketSource::bind(
            "127.0.0.1:0".parse().unwrap(),
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        let target = source.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"MXTP", target).unwrap();

        let event = source.next_datagram().unwrap().unwrap();
        assert_eq!(event.payload, b"MXTP");
        assert_eq!(event.origin, Some(sender.local_addr().unwrap()));
        assert!(event.ts.is_some());

        assert!(source.next_datagram().unwrap().is_none());
        assert_eq!(source.packets_seen(), 1);
    }
}
