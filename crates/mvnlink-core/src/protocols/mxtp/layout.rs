pub const SIGNATURE: &[u8; 4] = b"MXTP";

pub const SIGNATURE_RANGE: std::ops::Range<usize> = 0..4;
pub const TYPE_CODE_RANGE: std::ops::Range<usize> = 4..6;
pub const SAMPLE_COUNTER_RANGE: std::ops::Range<usize> = 6..10;
pub const DATAGRAM_COUNTER_OFFSET: usize = 10;
pub const ITEM_COUNT_OFFSET: usize = 11;
pub const TIME_CODE_RANGE: std::ops::Range<usize> = 12..16;
pub const CHARACTER_ID_OFFSET: usize = 16;
pub const BODY_SEGMENT_COUNT_OFFSET: usize = 17;
pub const PROP_COUNT_OFFSET: usize = 18;
pub const FINGER_SEGMENT_COUNT_OFFSET: usize = 19;
pub const PAYLOAD_SIZE_RANGE: std::ops::Range<usize> = 22..24;
pub const HEADER_LEN: usize = 24;

/// Set on the datagram counter of the last datagram belonging to a sample.
pub const LAST_DATAGRAM_FLAG: u8 = 0x80;

pub const TYPE_POSE_EULER: u8 = 0x01;
pub const TYPE_POSE_QUATERNION: u8 = 0x02;
pub const TYPE_POSE_POSITIONS: u8 = 0x03;
pub const TYPE_LINEAR_SEGMENT_KINEMATICS: u8 = 0x21;
pub const TYPE_ANGULAR_SEGMENT_KINEMATICS: u8 = 0x22;
pub const TYPE_TRACKER_KINEMATICS: u8 = 0x23;

/// Every record field is a 32-bit integer or float.
pub const FIELD_WIDTH: usize = 4;

/// Protocol ceiling on records per datagram (segment ids run 1..=30).
pub const MAX_RECORDS: usize = 30;
/// Segments in a full body without fingers.
pub const BODY_SEGMENTS: usize = 23;
/// Motion trackers on a full body suit.
pub const BODY_TRACKERS: usize = 17;

/// Pose positions are streamed in centimeters.
pub const POSITION_SCALE: f32 = 100.0;

/// Virtual marker ids are `POINT_ID_SEGMENT_STRIDE * segment + local point`.
pub const POINT_ID_SEGMENT_STRIDE: i32 = 256;

pub const MAX_AVATARS: u8 = 2;
pub const DEFAULT_PORT: u16 = 9763;
