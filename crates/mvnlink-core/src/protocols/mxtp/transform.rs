//! Unit and axis-system conversions applied while decoding.
//!
//! All functions are pure and total. Quaternions are `[w, x, y, z]`; Euler
//! triples are `[roll, pitch, yaw]` in degrees, composed Z-Y-X.

pub type Vec3 = [f32; 3];
pub type Quat = [f32; 4];

/// Convert a scaled wire position component to meters.
///
/// # Examples
/// ```
/// use mvnlink_core::protocols::mxtp::transform::scale_position;
///
/// assert_eq!(scale_position(250.0, 100.0), 2.5);
/// ```
pub fn scale_position(raw: f32, scale: f32) -> f32 {
    raw / scale
}

pub fn scale_vec3(v: Vec3, scale: f32) -> Vec3 {
    v.map(|component| scale_position(component, scale))
}

/// Rotate a right-handed Y-up vector into the right-handed Z-up frame.
///
/// # Examples
/// ```
/// use mvnlink_core::protocols::mxtp::transform::y_up_to_z_up;
///
/// assert_eq!(y_up_to_z_up([1.0, 2.0, 3.0]), [1.0, -3.0, 2.0]);
/// ```
pub fn y_up_to_z_up(v: Vec3) -> Vec3 {
    [v[0], -v[2], v[1]]
}

pub fn rad_to_deg(x: f32) -> f32 {
    x.to_degrees()
}

pub fn deg_to_rad(x: f32) -> f32 {
    x.to_radians()
}

pub fn rad_to_deg_all<const N: usize>(values: [f32; N]) -> [f32; N] {
    values.map(rad_to_deg)
}

/// Build a unit quaternion from roll/pitch/yaw degrees.
pub fn euler_to_quat(euler: Vec3) -> Quat {
    let half_roll = f64::from(euler[0]).to_radians() * 0.5;
    let half_pitch = f64::from(euler[1]).to_radians() * 0.5;
    let half_yaw = f64::from(euler[2]).to_radians() * 0.5;

    let (s1, c1) = half_roll.sin_cos();
    let (s2, c2) = half_pitch.sin_cos();
    let (s3, c3) = half_yaw.sin_cos();

    [
        (c1 * c2 * c3 + s1 * s2 * s3) as f32,
        (s1 * c2 * c3 - c1 * s2 * s3) as f32,
        (c1 * s2 * c3 + s1 * c2 * s3) as f32,
        (c1 * c2 * s3 - s1 * s2 * c3) as f32,
    ]
}

/// Extract roll/pitch/yaw degrees from a unit quaternion.
///
/// Pitch is clamped to ±90° when rounding pushes `sin(pitch)` past ±1.
pub fn quat_to_euler(q: Quat) -> Vec3 {
    let [w, x, y, z] = q.map(f64::from);
    let sqw = w * w;
    let dphi = 2.0 * (sqw + z * z) - 1.0;
    let dpsi = 2.0 * (sqw + x * x) - 1.0;
    let sin_pitch = (-2.0 * (x * z - w * y)).clamp(-1.0, 1.0);

    [
        (2.0 * (y * z + w * x)).atan2(dphi).to_degrees() as f32,
        sin_pitch.asin().to_degrees() as f32,
        (2.0 * (x * y + w * z)).atan2(dpsi).to_degrees() as f32,
    ]
}

/// Re-express a Y-up Euler rotation in the Z-up frame.
///
/// Swapping Euler components directly does not compose as a frame change,
/// so the rotation goes through a quaternion whose vector part is remapped
/// from `(x, y, z)` to `(z, x, y)`: rotation about the vertical Y axis
/// becomes rotation about the vertical Z axis.
///
/// # Examples
/// ```
/// use mvnlink_core::protocols::mxtp::transform::resolve_euler_axes;
///
/// let yaw = resolve_euler_axes([0.0, 90.0, 0.0]);
/// assert!(yaw[0].abs() < 1e-3 && yaw[1].abs() < 1e-3);
/// assert!((yaw[2] - 90.0).abs() < 1e-3);
/// ```
pub fn resolve_euler_axes(rotation: Vec3) -> Vec3 {
    let q = euler_to_quat(rotation);
    quat_to_euler([q[0], q[3], q[1], q[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPS, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn degrees_round_trip() {
        for x in [-720.0f32, -90.0, -0.5, 0.0, 1.0, 57.3, 180.0, 359.9] {
            let back = rad_to_deg(deg_to_rad(x));
            assert!((back - x).abs() < 1e-3, "{x} -> {back}");
        }
        assert!((rad_to_deg(std::f32::consts::PI) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn axis_swap_keeps_handedness() {
        let x = y_up_to_z_up([1.0, 0.0, 0.0]);
        let y = y_up_to_z_up([0.0, 1.0, 0.0]);
        let z = y_up_to_z_up([0.0, 0.0, 1.0]);
        // Y-up vertical becomes Z-up vertical.
        assert_eq!(y, [0.0, 0.0, 1.0]);
        let cross = [
            x[1] * y[2] - x[2] * y[1],
            x[2] * y[0] - x[0] * y[2],
            x[0] * y[1] - x[1] * y[0],
        ];
        assert_close(&cross, &z);
    }

    #[test]
    fn scale_divides_each_component() {
        assert_eq!(scale_vec3([100.0, -50.0, 0.0], 100.0), [1.0, -0.5, 0.0]);
    }

    #[test]
    fn identity_euler_is_identity_quaternion() {
        assert_close(&euler_to_quat([0.0, 0.0, 0.0]), &[1.0, 0.0, 0.0, 0.0]);
        assert_close(&quat_to_euler([1.0, 0.0, 0.0, 0.0]), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn euler_quaternion_round_trip() {
        for euler in [[10.0, 20.0, 30.0], [-45.0, 60.0, 170.0], [0.0, -80.0, 5.0]] {
            assert_close(&quat_to_euler(euler_to_quat(euler)), &euler);
        }
    }

    #[test]
    fn pitch_is_clamped() {
        let s = std::f32::consts::FRAC_1_SQRT_2 * 1.0001;
        let euler = quat_to_euler([s, 0.0, s, 0.0]);
        assert!((euler[1] - 90.0).abs() < 0.1);
    }

    #[test]
    fn resolve_keeps_identity() {
        assert_close(&resolve_euler_axes([0.0, 0.0, 0.0]), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn resolve_moves_y_rotation_to_z() {
        assert_close(&resolve_euler_axes([0.0, 30.0, 0.0]), &[0.0, 0.0, 30.0]);
    }

    #[test]
    fn resolve_moves_x_rotation_to_y() {
        assert_close(&resolve_euler_axes([25.0, 0.0, 0.0]), &[0.0, 25.0, 0.0]);
    }

    #[test]
    fn resolve_moves_z_rotation_to_x() {
        assert_close(&resolve_euler_axes([0.0, 0.0, 40.0]), &[40.0, 0.0, 0.0]);
    }

    #[test]
    fn resolve_combined_rotation() {
        // Z-Y-X rotation matrix conjugated by the x->y, y->z, z->x axis cycle.
        assert_close(
            &resolve_euler_axes([10.0, 20.0, 30.0]),
            &[28.029_28, -1.033_002, 22.245_99],
        );
    }
}
