use thiserror::Error;

/// Errors returned while decoding an MXTP frame.
///
/// Every variant aborts the current frame only; the next frame decodes from
/// a clean state.
///
/// # Examples
/// ```
/// use mvnlink_core::protocols::mxtp::DecodeError;
///
/// let err = DecodeError::UnknownType { code: 0x24 };
/// assert!(err.to_string().contains("unknown datagram type"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated at byte {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("invalid record count: {count} (max {max})")]
    InvalidCount { count: usize, max: usize },
    #[error("unknown datagram type: 0x{code:02x}")]
    UnknownType { code: u8 },
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

/// Errors returned when building a frame with [`super::FrameBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("record has {actual} values, datagram expects {expected}")]
    FieldCount { expected: usize, actual: usize },
    #[error("too many records: {count} (max {max})")]
    TooManyRecords { count: usize, max: usize },
}
