use super::error::DecodeError;
use super::layout;

/// Fixed-width scalar that can be read from the wire.
///
/// All MXTP fields are big-endian. Implemented for `i32`, `u32` and `f32`.
pub trait WireScalar: Sized + sealed::Sealed {
    const WIDTH: usize;

    fn from_be_slice(bytes: &[u8]) -> Self;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
}

impl WireScalar for i32 {
    const WIDTH: usize = 4;

    fn from_be_slice(bytes: &[u8]) -> Self {
        i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl WireScalar for u32 {
    const WIDTH: usize = 4;

    fn from_be_slice(bytes: &[u8]) -> Self {
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl WireScalar for f32 {
    const WIDTH: usize = 4;

    fn from_be_slice(bytes: &[u8]) -> Self {
        f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Forward-only cursor over a datagram body.
///
/// # Examples
/// ```
/// use mvnlink_core::protocols::mxtp::ByteReader;
///
/// let bytes = [0, 0, 0, 5, 0x3f, 0x80, 0, 0];
/// let mut reader = ByteReader::new(&bytes);
/// assert_eq!(reader.read::<i32>().unwrap(), 5);
/// assert_eq!(reader.read::<f32>().unwrap(), 1.0);
/// assert_eq!(reader.remaining(), 0);
/// ```
pub struct ByteReader<'a> {
    payload: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            payload,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.payload.len() - self.position
    }

    pub fn read<T: WireScalar>(&mut self) -> Result<T, DecodeError> {
        let bytes = self.take(T::WIDTH)?;
        Ok(T::from_be_slice(bytes))
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3], DecodeError> {
        self.read_array()
    }

    pub fn read_quat(&mut self) -> Result<[f32; 4], DecodeError> {
        self.read_array()
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut out = [0.0f32; N];
        for value in out.iter_mut() {
            *value = self.read::<f32>()?;
        }
        Ok(out)
    }

    /// Hand out the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                offset: self.position,
                needed: len,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.payload[start..self.position])
    }
}

/// Offset-based access to the fixed 24-byte frame header.
pub struct HeaderReader<'a> {
    payload: &'a [u8],
}

impl<'a> HeaderReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DecodeError> {
        if self.payload.len() < needed {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed,
                available: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(DecodeError::Truncated {
                offset,
                needed: 1,
                available: self.payload.len().saturating_sub(offset),
            })
    }

    pub fn read_u16_be(&self, range: std::ops::Range<usize>) -> Result<u16, DecodeError> {
        let bytes = self.read_slice(range)?;
        if bytes.len() != 2 {
            return Err(DecodeError::InvalidHeader {
                reason: format!("expected a 2-byte field, got {}", bytes.len()),
            });
        }
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_be(&self, range: std::ops::Range<usize>) -> Result<u32, DecodeError> {
        let bytes = self.read_slice(range)?;
        if bytes.len() != 4 {
            return Err(DecodeError::InvalidHeader {
                reason: format!("expected a 4-byte field, got {}", bytes.len()),
            });
        }
        Ok(u32::from_be_slice(bytes))
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], DecodeError> {
        self.payload
            .get(range.clone())
            .ok_or(DecodeError::Truncated {
                offset: range.start,
                needed: range.len(),
                available: self.payload.len().saturating_sub(range.start),
            })
    }

    pub fn read_signature(&self) -> Result<&'a [u8], DecodeError> {
        self.read_slice(layout::SIGNATURE_RANGE.clone())
    }

    /// Decode the two ASCII hex digits that carry the datagram type.
    pub fn read_type_code(&self) -> Result<u8, DecodeError> {
        let bytes = self.read_slice(layout::TYPE_CODE_RANGE.clone())?;
        // from_str_radix alone would accept a leading sign.
        if !bytes.iter().all(u8::is_ascii_hexdigit) {
            return Err(DecodeError::InvalidHeader {
                reason: format!("type code is not hexadecimal: {:02x?}", bytes),
            });
        }
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidHeader {
            reason: format!("type code is not ASCII: {:02x?}", bytes),
        })?;
        u8::from_str_radix(text, 16).map_err(|_| DecodeError::InvalidHeader {
            reason: format!("type code is not hexadecimal: {text:?}"),
        })
    }

    /// Body bytes following the header.
    pub fn body(&self) -> Result<&'a [u8], DecodeError> {
        self.require_len(layout::HEADER_LEN)?;
        Ok(&self.payload[layout::HEADER_LEN..])
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteReader, HeaderReader};
    use crate::protocols::mxtp::error::DecodeError;
    use crate::protocols::mxtp::layout;

    #[test]
    fn reads_scalars_big_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-2i32).to_be_bytes());
        bytes.extend_from_slice(&7u32.to_be_bytes());
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(reader.read::<i32>().unwrap(), -2);
        assert_eq!(reader.read::<u32>().unwrap(), 7);
        assert_eq!(reader.read::<f32>().unwrap(), 1.5);
        assert_eq!(reader.position(), 12);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn short_read_reports_truncation_without_advancing() {
        let bytes = [0u8; 6];
        let mut reader = ByteReader::new(&bytes);
        reader.read::<u32>().unwrap();

        let err = reader.read::<f32>().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 4,
                needed: 4,
                available: 2,
            }
        );
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn read_vec3_consumes_twelve_bytes() {
        let mut bytes = Vec::new();
        for value in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_vec3().unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(reader.remaining(), 4);
        assert!(reader.read_quat().is_err());
    }

    #[test]
    fn type_code_is_ascii_hex() {
        let mut header = [0u8; layout::HEADER_LEN];
        header[layout::SIGNATURE_RANGE.clone()].copy_from_slice(layout::SIGNATURE);
        header[layout::TYPE_CODE_RANGE.clone()].copy_from_slice(b"21");
        let reader = HeaderReader::new(&header);
        assert_eq!(reader.read_type_code().unwrap(), 0x21);

        for bad in [b"zz", b"+1", b"-1", b" 1"] {
            header[layout::TYPE_CODE_RANGE.clone()].copy_from_slice(bad);
            let reader = HeaderReader::new(&header);
            assert!(
                matches!(
                    reader.read_type_code(),
                    Err(DecodeError::InvalidHeader { .. })
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn body_requires_full_header() {
        let header = [0u8; layout::HEADER_LEN - 1];
        let reader = HeaderReader::new(&header);
        assert!(matches!(
            reader.body(),
            Err(DecodeError::Truncated { needed, .. }) if needed == layout::HEADER_LEN
        ));
    }
}
