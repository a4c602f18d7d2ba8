use super::datagram::DatagramKind;
use super::error::EncodeError;
use super::layout;

/// Builds raw MXTP frames from wire-level field values.
///
/// Values are written exactly as given: no scaling or axis conversion is
/// undone, so a builder fed decoded records does not reproduce the input.
///
/// # Examples
/// ```
/// use mvnlink_core::protocols::mxtp::{DatagramKind, FrameBuilder, parse_header};
///
/// let mut builder = FrameBuilder::new(DatagramKind::VirtualMarkers);
/// builder.avatar(1).record(256 + 1, &[1.0, 2.0, 3.0])?;
/// let frame = builder.build();
/// let (header, body) = parse_header(&frame)?;
/// assert_eq!(header.avatar_index, 1);
/// assert_eq!(body.len(), 16);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    type_code: u8,
    arity: Option<usize>,
    sample_counter: u32,
    datagram_counter: u8,
    time_code_ms: u32,
    avatar_index: u8,
    body_segments: u8,
    declared_count: Option<u8>,
    records: usize,
    body: Vec<u8>,
}

impl FrameBuilder {
    pub fn new(kind: DatagramKind) -> Self {
        Self {
            arity: Some(kind.sample_arity()),
            ..Self::with_type_code(kind.type_code())
        }
    }

    /// Builder for an arbitrary type code; records are not width-checked.
    pub fn with_type_code(type_code: u8) -> Self {
        Self {
            type_code,
            arity: None,
            sample_counter: 0,
            datagram_counter: layout::LAST_DATAGRAM_FLAG,
            time_code_ms: 0,
            avatar_index: 0,
            body_segments: layout::BODY_SEGMENTS as u8,
            declared_count: None,
            records: 0,
            body: Vec::new(),
        }
    }

    pub fn avatar(&mut self, index: u8) -> &mut Self {
        self.avatar_index = index;
        self
    }

    pub fn sample_counter(&mut self, counter: u32) -> &mut Self {
        self.sample_counter = counter;
        self
    }

    pub fn time_code_ms(&mut self, time_code_ms: u32) -> &mut Self {
        self.time_code_ms = time_code_ms;
        self
    }

    /// Override the header item count instead of counting pushed records.
    pub fn declared_count(&mut self, count: u8) -> &mut Self {
        self.declared_count = Some(count);
        self
    }

    /// Append one record: the id field followed by its float fields.
    pub fn record(&mut self, id: i32, values: &[f32]) -> Result<&mut Self, EncodeError> {
        if let Some(expected) = self.arity {
            if values.len() != expected {
                return Err(EncodeError::FieldCount {
                    expected,
                    actual: values.len(),
                });
            }
        }
        if self.records >= layout::MAX_RECORDS {
            return Err(EncodeError::TooManyRecords {
                count: self.records + 1,
                max: layout::MAX_RECORDS,
            });
        }
        self.body.extend_from_slice(&id.to_be_bytes());
        for value in values {
            self.body.extend_from_slice(&value.to_be_bytes());
        }
        self.records += 1;
        Ok(self)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut frame = vec![0u8; layout::HEADER_LEN];
        frame[layout::SIGNATURE_RANGE.clone()].copy_from_slice(layout::SIGNATURE);
        let code = format!("{:02X}", self.type_code);
        frame[layout::TYPE_CODE_RANGE.clone()].copy_from_slice(code.as_bytes());
        frame[layout::SAMPLE_COUNTER_RANGE.clone()]
            .copy_from_slice(&self.sample_counter.to_be_bytes());
        frame[layout::DATAGRAM_COUNTER_OFFSET] = self.datagram_counter;
        frame[layout::ITEM_COUNT_OFFSET] = self.declared_count.unwrap_or(self.records as u8);
        frame[layout::TIME_CODE_RANGE.clone()].copy_from_slice(&self.time_code_ms.to_be_bytes());
        frame[layout::CHARACTER_ID_OFFSET] = self.avatar_index;
        frame[layout::BODY_SEGMENT_COUNT_OFFSET] = self.body_segments;
        let payload_size = u16::try_from(self.body.len()).unwrap_or(u16::MAX);
        frame[layout::PAYLOAD_SIZE_RANGE.clone()].copy_from_slice(&payload_size.to_be_bytes());
        frame.extend_from_slice(&self.body);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::FrameBuilder;
    use crate::protocols::mxtp::datagram::DatagramKind;
    use crate::protocols::mxtp::error::EncodeError;
    use crate::protocols::mxtp::header::parse_header;

    #[test]
    fn builds_header_fields() {
        let mut builder = FrameBuilder::new(DatagramKind::TrackerKinematics);
        builder.sample_counter(7).time_code_ms(1234).avatar(1);
        builder.record(3, &[0.0; 16]).unwrap();
        let frame = builder.build();

        let (header, body) = parse_header(&frame).unwrap();
        assert_eq!(header.type_code, 0x23);
        assert_eq!(header.sample_counter, 7);
        assert_eq!(header.time_code_ms, 1234);
        assert_eq!(header.item_count, 1);
        assert!(header.last_datagram);
        assert_eq!(usize::from(header.payload_size), body.len());
        assert_eq!(body.len(), 68);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let mut builder = FrameBuilder::new(DatagramKind::EulerPose);
        let err = builder.record(1, &[0.0; 7]).unwrap_err();
        assert_eq!(
            err,
            EncodeError::FieldCount {
                expected: 6,
                actual: 7
            }
        );
    }

    #[test]
    fn raw_type_code_is_written_as_hex() {
        let frame = FrameBuilder::with_type_code(0x24).build();
        assert_eq!(&frame[4..6], b"24");
    }
}
