use thiserror::Error;

/// Errors raised while reading or writing capture files.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error ({context}): {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },
    #[error("packet of {len} bytes does not fit a capture block")]
    PacketTooLarge { len: usize },
}
