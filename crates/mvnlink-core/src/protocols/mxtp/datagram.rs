use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use super::layout;
use super::reader::ByteReader;
use super::records::{
    AngularSegmentRecord, EulerPoseRecord, LinearSegmentRecord, QuaternionPoseRecord, Record,
    TrackerRecord, VirtualMarkerRecord,
};

/// The closed set of datagram layouts this decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatagramKind {
    EulerPose,
    QuaternionPose,
    VirtualMarkers,
    LinearSegmentKinematics,
    AngularSegmentKinematics,
    TrackerKinematics,
}

/// A named run of consecutive float fields in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGroup {
    pub name: &'static str,
    pub width: usize,
}

const fn group(name: &'static str, width: usize) -> FieldGroup {
    FieldGroup { name, width }
}

pub const EULER_POSE_FIELDS: &[FieldGroup] = &[group("position", 3), group("rotation", 3)];
pub const QUATERNION_POSE_FIELDS: &[FieldGroup] =
    &[group("position", 3), group("orientation", 4)];
pub const VIRTUAL_MARKER_FIELDS: &[FieldGroup] = &[group("position", 3)];
pub const LINEAR_SEGMENT_FIELDS: &[FieldGroup] = &[
    group("position", 3),
    group("velocity", 3),
    group("acceleration", 3),
];
pub const ANGULAR_SEGMENT_FIELDS: &[FieldGroup] = &[
    group("orientation", 4),
    group("angular_velocity", 3),
    group("angular_acceleration", 3),
];
pub const TRACKER_FIELDS: &[FieldGroup] = &[
    group("rotation", 4),
    group("free_acceleration", 3),
    group("acceleration", 3),
    group("gyroscope", 3),
    group("magnetometer", 3),
];

impl DatagramKind {
    pub const ALL: [DatagramKind; 6] = [
        DatagramKind::EulerPose,
        DatagramKind::QuaternionPose,
        DatagramKind::VirtualMarkers,
        DatagramKind::LinearSegmentKinematics,
        DatagramKind::AngularSegmentKinematics,
        DatagramKind::TrackerKinematics,
    ];

    pub fn type_code(self) -> u8 {
        match self {
            DatagramKind::EulerPose => layout::TYPE_POSE_EULER,
            DatagramKind::QuaternionPose => layout::TYPE_POSE_QUATERNION,
            DatagramKind::VirtualMarkers => layout::TYPE_POSE_POSITIONS,
            DatagramKind::LinearSegmentKinematics => layout::TYPE_LINEAR_SEGMENT_KINEMATICS,
            DatagramKind::AngularSegmentKinematics => layout::TYPE_ANGULAR_SEGMENT_KINEMATICS,
            DatagramKind::TrackerKinematics => layout::TYPE_TRACKER_KINEMATICS,
        }
    }

    pub fn from_type_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_code() == code)
    }

    /// Short label used on the command line and in reports.
    pub fn label(self) -> &'static str {
        match self {
            DatagramKind::EulerPose => "euler",
            DatagramKind::QuaternionPose => "quaternion",
            DatagramKind::VirtualMarkers => "markers",
            DatagramKind::LinearSegmentKinematics => "linear",
            DatagramKind::AngularSegmentKinematics => "angular",
            DatagramKind::TrackerKinematics => "tracker",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// Sample values in flatten order, excluding the leading id field.
    pub fn field_groups(self) -> &'static [FieldGroup] {
        match self {
            DatagramKind::EulerPose => EULER_POSE_FIELDS,
            DatagramKind::QuaternionPose => QUATERNION_POSE_FIELDS,
            DatagramKind::VirtualMarkers => VIRTUAL_MARKER_FIELDS,
            DatagramKind::LinearSegmentKinematics => LINEAR_SEGMENT_FIELDS,
            DatagramKind::AngularSegmentKinematics => ANGULAR_SEGMENT_FIELDS,
            DatagramKind::TrackerKinematics => TRACKER_FIELDS,
        }
    }

    /// Floats one record contributes to a flattened sample.
    pub fn sample_arity(self) -> usize {
        self.field_groups().iter().map(|group| group.width).sum()
    }

    /// Wire size of one record: the id plus every sample field.
    pub fn bytes_per_record(self) -> usize {
        layout::FIELD_WIDTH * (1 + self.sample_arity())
    }

    pub fn max_records_per_frame(self) -> usize {
        match self {
            DatagramKind::TrackerKinematics => layout::BODY_TRACKERS,
            _ => layout::BODY_SEGMENTS,
        }
    }

    /// Fixed channel width for this datagram's sink channels.
    pub fn channel_width(self) -> usize {
        self.sample_arity() * self.max_records_per_frame()
    }
}

/// Decode settings shared by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Divisor turning wire pose positions into meters.
    pub position_scale: f32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            position_scale: layout::POSITION_SCALE,
        }
    }
}

/// Records of one decoded datagram body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum Datagram {
    EulerPose(Vec<EulerPoseRecord>),
    QuaternionPose(Vec<QuaternionPoseRecord>),
    VirtualMarkers(Vec<VirtualMarkerRecord>),
    LinearSegmentKinematics(Vec<LinearSegmentRecord>),
    AngularSegmentKinematics(Vec<AngularSegmentRecord>),
    TrackerKinematics(Vec<TrackerRecord>),
}

impl Datagram {
    /// Decode `count` records of `kind` from `reader`.
    ///
    /// Consumes exactly `count * kind.bytes_per_record()` bytes on success.
    ///
    /// # Examples
    /// ```
    /// use mvnlink_core::protocols::mxtp::{ByteReader, Datagram, DatagramKind, DecodeOptions};
    ///
    /// let mut body = 5i32.to_be_bytes().to_vec();
    /// body.extend_from_slice(&[0u8; 36]);
    /// let mut reader = ByteReader::new(&body);
    /// let datagram = Datagram::decode(
    ///     DatagramKind::LinearSegmentKinematics,
    ///     &mut reader,
    ///     1,
    ///     &DecodeOptions::default(),
    /// )?;
    /// assert_eq!(datagram.flatten(), vec![0.0; 9]);
    /// # Ok::<(), mvnlink_core::protocols::mxtp::DecodeError>(())
    /// ```
    ///
    /// # Errors
    /// `InvalidCount` when `count` exceeds the protocol ceiling, `Truncated`
    /// when the reader runs out mid-record. No partial datagram is returned.
    pub fn decode(
        kind: DatagramKind,
        reader: &mut ByteReader<'_>,
        count: usize,
        options: &DecodeOptions,
    ) -> Result<Self, DecodeError> {
        if count > layout::MAX_RECORDS {
            return Err(DecodeError::InvalidCount {
                count,
                max: layout::MAX_RECORDS,
            });
        }

        let datagram = match kind {
            DatagramKind::EulerPose => Datagram::EulerPose(decode_records(reader, count, options)?),
            DatagramKind::QuaternionPose => {
                Datagram::QuaternionPose(decode_records(reader, count, options)?)
            }
            DatagramKind::VirtualMarkers => {
                Datagram::VirtualMarkers(decode_records(reader, count, options)?)
            }
            DatagramKind::LinearSegmentKinematics => {
                Datagram::LinearSegmentKinematics(decode_records(reader, count, options)?)
            }
            DatagramKind::AngularSegmentKinematics => {
                Datagram::AngularSegmentKinematics(decode_records(reader, count, options)?)
            }
            DatagramKind::TrackerKinematics => {
                Datagram::TrackerKinematics(decode_records(reader, count, options)?)
            }
        };
        Ok(datagram)
    }

    pub fn kind(&self) -> DatagramKind {
        match self {
            Datagram::EulerPose(_) => DatagramKind::EulerPose,
            Datagram::QuaternionPose(_) => DatagramKind::QuaternionPose,
            Datagram::VirtualMarkers(_) => DatagramKind::VirtualMarkers,
            Datagram::LinearSegmentKinematics(_) => DatagramKind::LinearSegmentKinematics,
            Datagram::AngularSegmentKinematics(_) => DatagramKind::AngularSegmentKinematics,
            Datagram::TrackerKinematics(_) => DatagramKind::TrackerKinematics,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Datagram::EulerPose(records) => records.len(),
            Datagram::QuaternionPose(records) => records.len(),
            Datagram::VirtualMarkers(records) => records.len(),
            Datagram::LinearSegmentKinematics(records) => records.len(),
            Datagram::AngularSegmentKinematics(records) => records.len(),
            Datagram::TrackerKinematics(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate every record's sample values in field-group order.
    pub fn flatten(&self) -> Vec<f32> {
        match self {
            Datagram::EulerPose(records) => flatten_records(records),
            Datagram::QuaternionPose(records) => flatten_records(records),
            Datagram::VirtualMarkers(records) => flatten_records(records),
            Datagram::LinearSegmentKinematics(records) => flatten_records(records),
            Datagram::AngularSegmentKinematics(records) => flatten_records(records),
            Datagram::TrackerKinematics(records) => flatten_records(records),
        }
    }
}

fn decode_records<R: Record>(
    reader: &mut ByteReader<'_>,
    count: usize,
    options: &DecodeOptions,
) -> Result<Vec<R>, DecodeError> {
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(R::read(reader, options)?);
    }
    Ok(records)
}

fn flatten_records<R: Record>(records: &[R]) -> Vec<f32> {
    let mut out = Vec::with_capacity(records.len() * R::KIND.sample_arity());
    for record in records {
        record.flatten_into(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_body(kind: DatagramKind, count: usize) -> Vec<u8> {
        vec![0u8; kind.bytes_per_record() * count]
    }

    #[test]
    fn record_sizes_match_wire_table() {
        let expected = [
            (DatagramKind::EulerPose, 28, 6),
            (DatagramKind::QuaternionPose, 32, 7),
            (DatagramKind::VirtualMarkers, 16, 3),
            (DatagramKind::LinearSegmentKinematics, 40, 9),
            (DatagramKind::AngularSegmentKinematics, 44, 10),
            (DatagramKind::TrackerKinematics, 68, 16),
        ];
        for (kind, bytes, arity) in expected {
            assert_eq!(kind.bytes_per_record(), bytes, "{kind:?}");
            assert_eq!(kind.sample_arity(), arity, "{kind:?}");
        }
    }

    #[test]
    fn field_group_order_is_fixed() {
        let names = |kind: DatagramKind| {
            kind.field_groups()
                .iter()
                .map(|group| group.name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(DatagramKind::EulerPose), ["position", "rotation"]);
        assert_eq!(
            names(DatagramKind::AngularSegmentKinematics),
            ["orientation", "angular_velocity", "angular_acceleration"]
        );
        assert_eq!(
            names(DatagramKind::TrackerKinematics),
            [
                "rotation",
                "free_acceleration",
                "acceleration",
                "gyroscope",
                "magnetometer"
            ]
        );
    }

    #[test]
    fn type_codes_round_trip() {
        for kind in DatagramKind::ALL {
            assert_eq!(DatagramKind::from_type_code(kind.type_code()), Some(kind));
            assert_eq!(DatagramKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(DatagramKind::from_type_code(0x24), None);
    }

    #[test]
    fn channel_widths() {
        assert_eq!(DatagramKind::EulerPose.channel_width(), 23 * 6);
        assert_eq!(DatagramKind::TrackerKinematics.channel_width(), 17 * 16);
    }

    #[test]
    fn decode_consumes_exact_bytes() {
        for kind in DatagramKind::ALL {
            for count in [0usize, 1, 3, layout::MAX_RECORDS] {
                let mut body = zero_body(kind, count);
                body.extend_from_slice(&[0xAA; 5]);
                let mut reader = ByteReader::new(&body);
                let datagram =
                    Datagram::decode(kind, &mut reader, count, &DecodeOptions::default()).unwrap();
                assert_eq!(datagram.kind(), kind);
                assert_eq!(datagram.len(), count);
                assert_eq!(reader.position(), count * kind.bytes_per_record());
                assert_eq!(datagram.flatten().len(), count * kind.sample_arity());
            }
        }
    }

    #[test]
    fn decode_short_body_is_truncated() {
        for kind in DatagramKind::ALL {
            let body = zero_body(kind, 2);
            let mut reader = ByteReader::new(&body[..body.len() - 1]);
            let err =
                Datagram::decode(kind, &mut reader, 2, &DecodeOptions::default()).unwrap_err();
            assert!(matches!(err, DecodeError::Truncated { .. }), "{kind:?}");
        }
    }

    #[test]
    fn decode_rejects_count_above_ceiling() {
        let body = zero_body(DatagramKind::VirtualMarkers, layout::MAX_RECORDS + 1);
        let mut reader = ByteReader::new(&body);
        let err = Datagram::decode(
            DatagramKind::VirtualMarkers,
            &mut reader,
            layout::MAX_RECORDS + 1,
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidCount {
                count: 31,
                max: 30
            }
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn virtual_marker_normalizes_position() {
        let mut body = (256 * 3 + 1i32).to_be_bytes().to_vec();
        for value in [256_000.0f32, 512_000.0, 0.0] {
            body.extend_from_slice(&value.to_be_bytes());
        }
        let mut reader = ByteReader::new(&body);
        let options = DecodeOptions {
            position_scale: 1000.0,
        };
        let datagram =
            Datagram::decode(DatagramKind::VirtualMarkers, &mut reader, 1, &options).unwrap();
        assert_eq!(datagram.flatten(), vec![256.0, 0.0, 512.0]);
    }

    #[test]
    fn linear_segment_zero_record() {
        let mut body = 5i32.to_be_bytes().to_vec();
        body.extend_from_slice(&[0u8; 36]);
        let mut reader = ByteReader::new(&body);
        let datagram = Datagram::decode(
            DatagramKind::LinearSegmentKinematics,
            &mut reader,
            1,
            &DecodeOptions::default(),
        )
        .unwrap();
        match &datagram {
            Datagram::LinearSegmentKinematics(records) => {
                assert_eq!(records[0].segment_id, 5);
                assert_eq!(records[0].position, [0.0; 3]);
                assert_eq!(records[0].velocity, [0.0; 3]);
                assert_eq!(records[0].acceleration, [0.0; 3]);
            }
            other => panic!("unexpected datagram {other:?}"),
        }
        assert_eq!(datagram.flatten().len(), 9);
    }

    #[test]
    fn euler_identity_survives_axis_change() {
        let body = zero_body(DatagramKind::EulerPose, 1);
        let mut reader = ByteReader::new(&body);
        let datagram =
            Datagram::decode(DatagramKind::EulerPose, &mut reader, 1, &DecodeOptions::default())
                .unwrap();
        let flat = datagram.flatten();
        for angle in &flat[3..] {
            assert!(angle.abs() < 1e-4);
        }
    }
}
