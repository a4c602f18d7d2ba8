use serde::Serialize;

use super::error::DecodeError;
use super::layout;
use super::reader::HeaderReader;

/// Decoded MXTP frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub type_code: u8,
    pub sample_counter: u32,
    /// Index of this datagram within its sample, flag bit cleared.
    pub datagram_index: u8,
    pub last_datagram: bool,
    /// Declared number of records in the body.
    pub item_count: u8,
    /// Milliseconds since the start of the recording day.
    pub time_code_ms: u32,
    /// Character id; selects the avatar channel.
    pub avatar_index: u8,
    pub body_segments: u8,
    pub props: u8,
    pub finger_segments: u8,
    /// Body size announced by the sender. Reported, not enforced.
    pub payload_size: u16,
}

/// Parse the fixed header and return it with the body that follows.
///
/// # Errors
/// `Truncated` when fewer than 24 bytes are present, `InvalidHeader` when
/// the signature is not `MXTP` or the type code is not hexadecimal.
pub fn parse_header(payload: &[u8]) -> Result<(FrameHeader, &[u8]), DecodeError> {
    let reader = HeaderReader::new(payload);
    reader.require_len(layout::HEADER_LEN)?;

    let signature = reader.read_signature()?;
    if signature != layout::SIGNATURE {
        return Err(DecodeError::InvalidHeader {
            reason: format!("bad signature {:02x?}", signature),
        });
    }

    let type_code = reader.read_type_code()?;
    let sample_counter = reader.read_u32_be(layout::SAMPLE_COUNTER_RANGE.clone())?;
    let datagram_counter = reader.read_u8(layout::DATAGRAM_COUNTER_OFFSET)?;
    let item_count = reader.read_u8(layout::ITEM_COUNT_OFFSET)?;
    let time_code_ms = reader.read_u32_be(layout::TIME_CODE_RANGE.clone())?;
    let avatar_index = reader.read_u8(layout::CHARACTER_ID_OFFSET)?;
    let body_segments = reader.read_u8(layout::BODY_SEGMENT_COUNT_OFFSET)?;
    let props = reader.read_u8(layout::PROP_COUNT_OFFSET)?;
    let finger_segments = reader.read_u8(layout::FINGER_SEGMENT_COUNT_OFFSET)?;
    let payload_size = reader.read_u16_be(layout::PAYLOAD_SIZE_RANGE.clone())?;

    let header = FrameHeader {
        type_code,
        sample_counter,
        datagram_index: datagram_counter & !layout::LAST_DATAGRAM_FLAG,
        last_datagram: datagram_counter & layout::LAST_DATAGRAM_FLAG != 0,
        item_count,
        time_code_ms,
        avatar_index,
        body_segments,
        props,
        finger_segments,
        payload_size,
    };
    Ok((header, reader.body()?))
}
