//! Conversions between manifest space and scene space.
//!
//! Manifest space is the IIIF / glTF convention: +Y up, +Z toward the
//! viewer. Scene space is the host convention: +Z up, +Y forward (away from
//! the viewer). The axis relations are
//!
//! ```text
//! X_manifest =  X_scene
//! Y_manifest =  Z_scene
//! Z_manifest = -Y_scene
//! ```
//!
//! so a point `(x, y, z)` in manifest space sits at `(x, -z, y)` in scene
//! space. Rotations use host Euler orders, which are extrinsic: order `YZX`
//! applies the Y rotation first, then Z, then X.

use glam::{DMat3, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

use crate::error::IiifError;

/// Euler order used for model-like bodies in scene space.
pub const MODEL_EULER_ORDER: EulerOrder = EulerOrder::YZX;

/// Euler order used for cameras in scene space.
pub const CAMERA_EULER_ORDER: EulerOrder = EulerOrder::ZYX;

/// A camera at rest looks down its local -Z axis, which is scene "down";
/// a manifest camera at rest looks down manifest -Z, scene +Y. The two
/// differ by a quarter turn about X.
pub const CAMERA_REST_OFFSET_DEGREES: f64 = 90.0;

/// Tolerance used when deciding whether a rotation or scale is the identity.
pub const IDENTITY_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Euler orders and scene rotations
// ---------------------------------------------------------------------------

/// Extrinsic Euler order as the host names it (first letter applied first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

impl EulerOrder {
    pub fn all() -> [EulerOrder; 6] {
        [
            EulerOrder::XYZ,
            EulerOrder::XZY,
            EulerOrder::YXZ,
            EulerOrder::YZX,
            EulerOrder::ZXY,
            EulerOrder::ZYX,
        ]
    }

    /// Quaternion for per-axis angles (radians) applied in this order.
    ///
    /// Extrinsic `ABC` equals intrinsic `CBA`, which is how glam names it.
    pub fn to_quat(self, angles: DVec3) -> DQuat {
        let DVec3 { x, y, z } = angles;
        match self {
            EulerOrder::XYZ => DQuat::from_euler(EulerRot::ZYX, z, y, x),
            EulerOrder::XZY => DQuat::from_euler(EulerRot::YZX, y, z, x),
            EulerOrder::YXZ => DQuat::from_euler(EulerRot::ZXY, z, x, y),
            EulerOrder::YZX => DQuat::from_euler(EulerRot::XZY, x, z, y),
            EulerOrder::ZXY => DQuat::from_euler(EulerRot::YXZ, y, x, z),
            EulerOrder::ZYX => DQuat::from_euler(EulerRot::XYZ, x, y, z),
        }
    }

    /// Decompose a quaternion into per-axis angles (radians) for this order.
    pub fn from_quat(self, q: DQuat) -> DVec3 {
        match self {
            EulerOrder::XYZ => {
                let (z, y, x) = q.to_euler(EulerRot::ZYX);
                DVec3::new(x, y, z)
            }
            EulerOrder::XZY => {
                let (y, z, x) = q.to_euler(EulerRot::YZX);
                DVec3::new(x, y, z)
            }
            EulerOrder::YXZ => {
                let (z, x, y) = q.to_euler(EulerRot::ZXY);
                DVec3::new(x, y, z)
            }
            EulerOrder::YZX => {
                let (x, z, y) = q.to_euler(EulerRot::XZY);
                DVec3::new(x, y, z)
            }
            EulerOrder::ZXY => {
                let (y, x, z) = q.to_euler(EulerRot::YXZ);
                DVec3::new(x, y, z)
            }
            EulerOrder::ZYX => {
                let (x, y, z) = q.to_euler(EulerRot::XYZ);
                DVec3::new(x, y, z)
            }
        }
    }
}

/// A node rotation as the host stores it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SceneRotation {
    /// Per-axis angles in radians, indexed by axis (not by order).
    Euler { order: EulerOrder, angles: DVec3 },
    Quaternion(DQuat),
}

impl Default for SceneRotation {
    fn default() -> Self {
        SceneRotation::Euler {
            order: EulerOrder::XYZ,
            angles: DVec3::ZERO,
        }
    }
}

impl SceneRotation {
    pub fn to_quat(&self) -> DQuat {
        match *self {
            SceneRotation::Euler { order, angles } => order.to_quat(angles),
            SceneRotation::Quaternion(q) => q.normalize(),
        }
    }

    /// Angles (radians) in `order`.
    ///
    /// Raw components are only read when the rotation is already stored in
    /// `order`; every other representation is re-decomposed through a
    /// quaternion.
    pub fn euler_angles(&self, order: EulerOrder) -> DVec3 {
        match *self {
            SceneRotation::Euler {
                order: stored,
                angles,
            } if stored == order => angles,
            _ => order.from_quat(self.to_quat()),
        }
    }

    /// The same rotation re-expressed in `order`.
    pub fn with_order(&self, order: EulerOrder) -> SceneRotation {
        SceneRotation::Euler {
            order,
            angles: self.euler_angles(order),
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Manifest-space point to scene space: `(x, y, z) -> (x, -z, y)`.
pub fn position_to_scene(p: DVec3) -> DVec3 {
    DVec3::new(p.x, -p.z, p.y)
}

/// Scene-space point to manifest space: `(x, y, z) -> (x, z, -y)`.
pub fn position_to_manifest(p: DVec3) -> DVec3 {
    DVec3::new(p.x, p.z, -p.y)
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Which rotation convention a body follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationConvention {
    Model,
    Camera,
}

impl RotationConvention {
    pub fn euler_order(self) -> EulerOrder {
        match self {
            RotationConvention::Model => MODEL_EULER_ORDER,
            RotationConvention::Camera => CAMERA_EULER_ORDER,
        }
    }

    /// RotateTransform angles (degrees) to a scene rotation.
    pub fn to_scene(self, degrees: DVec3) -> SceneRotation {
        match self {
            RotationConvention::Model => model_rotation_to_scene(degrees),
            RotationConvention::Camera => camera_rotation_to_scene(degrees),
        }
    }

    /// Scene rotation to RotateTransform angles (degrees).
    pub fn to_manifest(self, rotation: &SceneRotation) -> DVec3 {
        match self {
            RotationConvention::Model => model_rotation_to_manifest(rotation),
            RotationConvention::Camera => camera_rotation_to_manifest(rotation),
        }
    }
}

/// Model RotateTransform `(rx, ry, rz)` degrees to scene Euler `YZX`
/// with angles `(rx, -rz, ry)`.
pub fn model_rotation_to_scene(degrees: DVec3) -> SceneRotation {
    SceneRotation::Euler {
        order: MODEL_EULER_ORDER,
        angles: DVec3::new(degrees.x, -degrees.z, degrees.y).map(f64::to_radians),
    }
}

/// Inverse of [`model_rotation_to_scene`].
pub fn model_rotation_to_manifest(rotation: &SceneRotation) -> DVec3 {
    let a = rotation
        .euler_angles(MODEL_EULER_ORDER)
        .map(f64::to_degrees);
    DVec3::new(a.x, a.z, -a.y)
}

/// Camera RotateTransform `(rx, ry, rz)` degrees to scene Euler `ZYX`
/// with angles `(rx + 90, ry, rz)`.
pub fn camera_rotation_to_scene(degrees: DVec3) -> SceneRotation {
    SceneRotation::Euler {
        order: CAMERA_EULER_ORDER,
        angles: DVec3::new(degrees.x + CAMERA_REST_OFFSET_DEGREES, degrees.y, degrees.z)
            .map(f64::to_radians),
    }
}

/// Inverse of [`camera_rotation_to_scene`].
pub fn camera_rotation_to_manifest(rotation: &SceneRotation) -> DVec3 {
    let a = rotation
        .euler_angles(CAMERA_EULER_ORDER)
        .map(f64::to_degrees);
    DVec3::new(a.x - CAMERA_REST_OFFSET_DEGREES, a.y, a.z)
}

/// Rotation that points a camera's local -Z at `target` from `eye`, keeping
/// its local +Y as close to scene +Z as possible.
///
/// Returns `None` when `target` coincides with `eye`.
pub fn look_rotation(eye: DVec3, target: DVec3) -> Option<DQuat> {
    let forward = (target - eye).try_normalize()?;
    let back = -forward;
    let mut right = DVec3::Z.cross(back);
    if right.length_squared() < 1e-12 {
        // Looking straight up or down; any horizontal right axis works.
        right = DVec3::Y.cross(back);
    }
    let right = right.normalize();
    let up = back.cross(right);
    Some(DQuat::from_mat3(&DMat3::from_cols(right, up, back)))
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

/// Validate a ScaleTransform and return its uniform factor.
///
/// The axis permutation preserves magnitudes, so the same factor applies in
/// both spaces. Non-uniform or non-positive scale is rejected.
pub fn uniform_scale(scale: DVec3) -> Result<f64, IiifError> {
    let s = scale.x;
    if !scale.is_finite() {
        return Err(IiifError::feature(format!("non-finite scale {scale}")));
    }
    if (scale.y - s).abs() > IDENTITY_EPSILON * s.abs().max(1.0)
        || (scale.z - s).abs() > IDENTITY_EPSILON * s.abs().max(1.0)
    {
        return Err(IiifError::feature(format!("non-uniform scale {scale}")));
    }
    if s <= 0.0 {
        return Err(IiifError::feature(format!("non-positive scale {s}")));
    }
    Ok(s)
}

/// Uniform manifest scale factor to a scene scale vector.
pub fn scale_to_scene(factor: f64) -> DVec3 {
    DVec3::splat(factor)
}

/// Scene scale vector to a uniform manifest factor.
pub fn scale_to_manifest(scale: DVec3) -> Result<f64, IiifError> {
    uniform_scale(scale)
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Snap a value to a 1e-9 grid and drop negative zero, so exported numbers
/// stay free of conversion noise.
pub fn snap(v: f64) -> f64 {
    let snapped = (v * 1e9).round() / 1e9;
    if snapped == 0.0 { 0.0 } else { snapped }
}

pub fn snap_vec(v: DVec3) -> DVec3 {
    v.map(snap)
}

pub fn is_zero(v: DVec3) -> bool {
    v.abs().max_element() <= IDENTITY_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: DVec3, b: DVec3, eps: f64) {
        assert!(
            (a - b).abs().max_element() <= eps,
            "expected {b}, got {a}"
        );
    }

    fn assert_same_rotation(a: DQuat, b: DQuat) {
        assert!(
            a.dot(b).abs() > 1.0 - 1e-9,
            "rotations differ: {a} vs {b}"
        );
    }

    #[test]
    fn position_axes() {
        let scene = position_to_scene(DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene, DVec3::new(1.0, -3.0, 2.0));
        assert_eq!(position_to_manifest(scene), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn manifest_up_is_scene_up() {
        assert_eq!(position_to_scene(DVec3::Y), DVec3::Z);
        assert_eq!(position_to_scene(DVec3::Z), -DVec3::Y);
    }

    #[test]
    fn euler_orders_round_trip_through_quaternion() {
        let angles = DVec3::new(0.3, -0.4, 1.1);
        for order in EulerOrder::all() {
            let q = order.to_quat(angles);
            assert_vec_close(order.from_quat(q), angles, 1e-9);
        }
    }

    #[test]
    fn extrinsic_order_applies_first_axis_first() {
        // YZX: Y first, then Z, then X (matrix Rx * Rz * Ry).
        let angles = DVec3::new(0.2, 0.5, -0.7);
        let expected = DQuat::from_rotation_x(angles.x)
            * DQuat::from_rotation_z(angles.z)
            * DQuat::from_rotation_y(angles.y);
        assert_same_rotation(EulerOrder::YZX.to_quat(angles), expected);
    }

    #[test]
    fn euler_angles_reads_raw_components_for_matching_order() {
        // Middle angle beyond 90 degrees would decompose differently.
        let angles = DVec3::new(0.1, 2.5, -3.0);
        let rot = SceneRotation::Euler {
            order: EulerOrder::YZX,
            angles,
        };
        assert_eq!(rot.euler_angles(EulerOrder::YZX), angles);
    }

    #[test]
    fn euler_angles_redecomposes_other_orders() {
        let rot = SceneRotation::Euler {
            order: EulerOrder::XYZ,
            angles: DVec3::new(0.3, 0.2, 0.1),
        };
        let yzx = rot.with_order(EulerOrder::YZX);
        assert_same_rotation(yzx.to_quat(), rot.to_quat());
    }

    #[test]
    fn model_rotation_mapping() {
        let rot = model_rotation_to_scene(DVec3::new(10.0, 20.0, 30.0));
        match rot {
            SceneRotation::Euler { order, angles } => {
                assert_eq!(order, EulerOrder::YZX);
                assert_vec_close(
                    angles.map(f64::to_degrees),
                    DVec3::new(10.0, -30.0, 20.0),
                    1e-9,
                );
            }
            other => panic!("expected euler, got {other:?}"),
        }
        assert_vec_close(
            model_rotation_to_manifest(&rot),
            DVec3::new(10.0, 20.0, 30.0),
            1e-9,
        );
    }

    #[test]
    fn model_rotation_inverse_accepts_quaternions() {
        let rot = model_rotation_to_scene(DVec3::new(15.0, -40.0, 25.0));
        let as_quat = SceneRotation::Quaternion(rot.to_quat());
        assert_vec_close(
            model_rotation_to_manifest(&as_quat),
            DVec3::new(15.0, -40.0, 25.0),
            1e-6,
        );
    }

    #[test]
    fn camera_rotation_has_quarter_turn_offset() {
        let rot = camera_rotation_to_scene(DVec3::ZERO);
        match rot {
            SceneRotation::Euler { order, angles } => {
                assert_eq!(order, EulerOrder::ZYX);
                assert_vec_close(angles.map(f64::to_degrees), DVec3::new(90.0, 0.0, 0.0), 1e-9);
            }
            other => panic!("expected euler, got {other:?}"),
        }
        assert_vec_close(camera_rotation_to_manifest(&rot), DVec3::ZERO, 1e-9);
    }

    #[test]
    fn default_camera_looks_down_manifest_minus_z() {
        let rest = camera_rotation_to_scene(DVec3::ZERO).to_quat();
        let view = rest * DVec3::NEG_Z;
        assert_vec_close(view, position_to_scene(DVec3::NEG_Z), 1e-9);
    }

    #[test]
    fn look_rotation_matches_default_camera() {
        let q = look_rotation(DVec3::ZERO, DVec3::Y).unwrap();
        assert_same_rotation(q, camera_rotation_to_scene(DVec3::ZERO).to_quat());
    }

    #[test]
    fn look_rotation_points_minus_z_at_target() {
        let eye = DVec3::new(1.0, -4.0, 2.0);
        let target = DVec3::new(-2.0, 3.0, 0.5);
        let q = look_rotation(eye, target).unwrap();
        let view = q * DVec3::NEG_Z;
        assert_vec_close(view, (target - eye).normalize(), 1e-9);
        // Straight down still yields a valid rotation.
        let down = look_rotation(DVec3::Z, DVec3::ZERO).unwrap();
        assert_vec_close(down * DVec3::NEG_Z, DVec3::NEG_Z, 1e-9);
        assert!(look_rotation(eye, eye).is_none());
    }

    #[test]
    fn uniform_scale_validation() {
        assert_eq!(uniform_scale(DVec3::splat(2.0)).unwrap(), 2.0);
        assert!(uniform_scale(DVec3::new(2.0, 3.0, 2.0)).is_err());
        assert!(uniform_scale(DVec3::splat(0.0)).is_err());
        assert!(uniform_scale(DVec3::splat(-1.0)).is_err());
    }

    #[test]
    fn snap_removes_noise_and_negative_zero() {
        assert_eq!(snap(89.99999999999999), 90.0);
        assert_eq!(snap(-0.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(snap(-1e-12).to_bits(), 0.0f64.to_bits());
    }
}
