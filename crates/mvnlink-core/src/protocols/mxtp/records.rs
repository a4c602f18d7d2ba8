//! Per-datagram record layouts.
//!
//! Each record type reads its fields in wire order, applies its transform
//! once, and flattens in the field-group order published by
//! [`DatagramKind::field_groups`].

use serde::Serialize;

use super::datagram::{DatagramKind, DecodeOptions};
use super::error::DecodeError;
use super::layout;
use super::reader::ByteReader;
use super::transform::{
    Quat, Vec3, rad_to_deg_all, resolve_euler_axes, scale_vec3, y_up_to_z_up,
};

/// One fixed-size record of a datagram body.
pub trait Record: Sized {
    const KIND: DatagramKind;

    /// Read one record and normalize it.
    fn read(reader: &mut ByteReader<'_>, options: &DecodeOptions) -> Result<Self, DecodeError>;

    /// Append this record's sample values.
    fn flatten_into(&self, out: &mut Vec<f32>);
}

/// Segment pose with Euler rotation (type 0x01).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EulerPoseRecord {
    pub segment_id: i32,
    /// Meters, Z-up.
    pub position: Vec3,
    /// Roll/pitch/yaw degrees, Z-up.
    pub rotation: Vec3,
}

impl Record for EulerPoseRecord {
    const KIND: DatagramKind = DatagramKind::EulerPose;

    fn read(reader: &mut ByteReader<'_>, options: &DecodeOptions) -> Result<Self, DecodeError> {
        let segment_id = reader.read::<i32>()?;
        let position = reader.read_vec3()?;
        let rotation = reader.read_vec3()?;
        Ok(Self {
            segment_id,
            position: y_up_to_z_up(scale_vec3(position, options.position_scale)),
            rotation: resolve_euler_axes(rotation),
        })
    }

    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.rotation);
    }
}

/// Segment pose with quaternion orientation (type 0x02).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuaternionPoseRecord {
    pub segment_id: i32,
    /// Sent Z-up; passed through unchanged.
    pub position: Vec3,
    /// Wire components scaled by 180/π, as the channel consumers expect.
    pub orientation: Quat,
}

impl Record for QuaternionPoseRecord {
    const KIND: DatagramKind = DatagramKind::QuaternionPose;

    fn read(reader: &mut ByteReader<'_>, _options: &DecodeOptions) -> Result<Self, DecodeError> {
        let segment_id = reader.read::<i32>()?;
        let position = reader.read_vec3()?;
        let orientation = reader.read_quat()?;
        Ok(Self {
            segment_id,
            position,
            orientation: rad_to_deg_all(orientation),
        })
    }

    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.orientation);
    }
}

/// Virtual optical marker (type 0x03).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualMarkerRecord {
    pub point_id: i32,
    /// Meters, Z-up.
    pub position: Vec3,
}

impl VirtualMarkerRecord {
    /// Segment the marker is attached to.
    ///
    /// # Examples
    /// ```
    /// use mvnlink_core::protocols::mxtp::VirtualMarkerRecord;
    ///
    /// let marker = VirtualMarkerRecord { point_id: 256 * 7 + 3, position: [0.0; 3] };
    /// assert_eq!(marker.segment_id(), 7);
    /// assert_eq!(marker.local_point_id(), 3);
    /// ```
    pub fn segment_id(&self) -> i32 {
        self.point_id / layout::POINT_ID_SEGMENT_STRIDE
    }

    pub fn local_point_id(&self) -> i32 {
        self.point_id % layout::POINT_ID_SEGMENT_STRIDE
    }
}

impl Record for VirtualMarkerRecord {
    const KIND: DatagramKind = DatagramKind::VirtualMarkers;

    fn read(reader: &mut ByteReader<'_>, options: &DecodeOptions) -> Result<Self, DecodeError> {
        let point_id = reader.read::<i32>()?;
        let position = reader.read_vec3()?;
        Ok(Self {
            point_id,
            position: y_up_to_z_up(scale_vec3(position, options.position_scale)),
        })
    }

    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
    }
}

/// Segment position, velocity and acceleration (type 0x21), Z-up meters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearSegmentRecord {
    pub segment_id: i32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl Record for LinearSegmentRecord {
    const KIND: DatagramKind = DatagramKind::LinearSegmentKinematics;

    fn read(reader: &mut ByteReader<'_>, _options: &DecodeOptions) -> Result<Self, DecodeError> {
        Ok(Self {
            segment_id: reader.read::<i32>()?,
            position: reader.read_vec3()?,
            velocity: reader.read_vec3()?,
            acceleration: reader.read_vec3()?,
        })
    }

    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.velocity);
        out.extend_from_slice(&self.acceleration);
    }
}

/// Segment orientation and angular rates (type 0x22), degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngularSegmentRecord {
    pub segment_id: i32,
    pub orientation: Quat,
    /// Degrees per second.
    pub angular_velocity: Vec3,
    /// Degrees per second squared.
    pub angular_acceleration: Vec3,
}

impl Record for AngularSegmentRecord {
    const KIND: DatagramKind = DatagramKind::AngularSegmentKinematics;

    fn read(reader: &mut ByteReader<'_>, _options: &DecodeOptions) -> Result<Self, DecodeError> {
        let segment_id = reader.read::<i32>()?;
        let orientation = reader.read_quat()?;
        let angular_velocity = reader.read_vec3()?;
        let angular_acceleration = reader.read_vec3()?;
        Ok(Self {
            segment_id,
            orientation: rad_to_deg_all(orientation),
            angular_velocity: rad_to_deg_all(angular_velocity),
            angular_acceleration: rad_to_deg_all(angular_acceleration),
        })
    }

    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.orientation);
        out.extend_from_slice(&self.angular_velocity);
        out.extend_from_slice(&self.angular_acceleration);
    }
}

/// Raw sensor-frame readings of one tracker. No normalization applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSensor {
    pub rotation: Quat,
    pub free_acceleration: Vec3,
    pub acceleration: Vec3,
    pub gyroscope: Vec3,
    pub magnetometer: Vec3,
}

/// Motion tracker kinematics (type 0x23).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerRecord {
    pub segment_id: i32,
    pub sensor: RawSensor,
}

impl Record for TrackerRecord {
    const KIND: DatagramKind = DatagramKind::TrackerKinematics;

    fn read(reader: &mut ByteReader<'_>, _options: &DecodeOptions) -> Result<Self, DecodeError> {
        let segment_id = reader.read::<i32>()?;
        let sensor = RawSensor {
            rotation: reader.read_quat()?,
            free_acceleration: reader.read_vec3()?,
            acceleration: reader.read_vec3()?,
            gyroscope: reader.read_vec3()?,
            magnetometer: reader.read_vec3()?,
        };
        Ok(Self { segment_id, sensor })
    }

    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.sensor.rotation);
        out.extend_from_slice(&self.sensor.free_acceleration);
        out.extend_from_slice(&self.sensor.acceleration);
        out.extend_from_slice(&self.sensor.gyroscope);
        out.extend_from_slice(&self.sensor.magnetometer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: i32, values: &[f32]) -> Vec<u8> {
        let mut bytes = id.to_be_bytes().to_vec();
        for value in values {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes
    }

    fn read_one<R: Record>(bytes: &[u8], options: &DecodeOptions) -> R {
        let mut reader = ByteReader::new(bytes);
        let record = R::read(&mut reader, options).unwrap();
        assert_eq!(reader.remaining(), 0, "{:?} left bytes", R::KIND);
        record
    }

    #[test]
    fn euler_scales_and_swaps_position() {
        let bytes = body(1, &[100.0, 200.0, 300.0, 0.0, 0.0, 0.0]);
        let record: EulerPoseRecord = read_one(&bytes, &DecodeOptions::default());
        assert_eq!(record.segment_id, 1);
        assert_eq!(record.position, [1.0, -3.0, 2.0]);
        for angle in record.rotation {
            assert!(angle.abs() < 1e-4);
        }
    }

    #[test]
    fn quaternion_components_are_converted_to_degrees() {
        let pi = std::f32::consts::PI;
        let bytes = body(4, &[0.1, 0.2, 0.3, pi, 0.0, pi / 2.0, -pi]);
        let record: QuaternionPoseRecord = read_one(&bytes, &DecodeOptions::default());
        assert_eq!(record.position, [0.1, 0.2, 0.3]);
        let expected = [180.0, 0.0, 90.0, -180.0];
        for (actual, expected) in record.orientation.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn angular_groups_are_converted_to_degrees() {
        let rad = 1.0f32.to_radians();
        let values = [rad; 10];
        let bytes = body(9, &values);
        let record: AngularSegmentRecord = read_one(&bytes, &DecodeOptions::default());
        let mut flat = Vec::new();
        record.flatten_into(&mut flat);
        assert_eq!(flat.len(), 10);
        for value in flat {
            assert!((value - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn tracker_values_pass_through_in_order() {
        let values: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let bytes = body(2, &values);
        let record: TrackerRecord = read_one(&bytes, &DecodeOptions::default());
        assert_eq!(record.segment_id, 2);
        assert_eq!(record.sensor.rotation, [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(record.sensor.magnetometer, [13.0, 14.0, 15.0]);
        let mut flat = Vec::new();
        record.flatten_into(&mut flat);
        assert_eq!(flat, values);
    }

    #[test]
    fn marker_point_id_splits_into_segment_and_point() {
        let bytes = body(256 * 12 + 5, &[0.0, 0.0, 0.0]);
        let record: VirtualMarkerRecord = read_one(&bytes, &DecodeOptions::default());
        assert_eq!(record.segment_id(), 12);
        assert_eq!(record.local_point_id(), 5);
    }

    #[test]
    fn short_record_is_truncated() {
        let bytes = body(1, &[0.0; 8]);
        let mut reader = ByteReader::new(&bytes);
        let err = LinearSegmentRecord::read(&mut reader, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }
}
