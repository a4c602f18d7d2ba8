//! MXTP (MVN network streaming) datagram decoding.
//!
//! A frame is a fixed 24-byte header followed by `item_count` fixed-size
//! records of one datagram type. The header names the type and the avatar;
//! the body is decoded by the matching record layout, normalized once
//! (meters, Z-up, degrees) and flattened into the channel sample.
//!
//! All multi-byte fields are big-endian. Truncated bodies, record counts
//! above 30 and unknown type codes are frame-level errors.

pub mod datagram;
pub mod error;
pub mod header;
pub mod layout;
pub mod reader;
pub mod records;
pub mod transform;
pub mod writer;

pub use datagram::{Datagram, DatagramKind, DecodeOptions, FieldGroup};
pub use error::{DecodeError, EncodeError};
pub use header::{FrameHeader, parse_header};
pub use reader::{ByteReader, WireScalar};
pub use records::{
    AngularSegmentRecord, EulerPoseRecord, LinearSegmentRecord, QuaternionPoseRecord, RawSensor,
    Record, TrackerRecord, VirtualMarkerRecord,
};
pub use writer::FrameBuilder;
