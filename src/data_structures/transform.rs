//! Local transformation state of a scene node.
//!
//! Rotation is stored as Euler angles in radians and applied in X, then Y,
//! then Z order, so the composed local matrix reads
//! `T(position) * Rz * Ry * Rx * S(scale)`.

use cgmath::{Matrix4, Rad, Vector3};

/// Position, Euler rotation (radians) and scale of a node relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transform: no translation, no rotation, unit scale.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    pub fn with_rotation(mut self, rotation: Vector3<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_z(Rad(self.rotation.z))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Self::from_position(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, SquareMatrix, Transform as _};
    use std::f32::consts::FRAC_PI_2;

    fn assert_close(a: Point3<f32>, b: Point3<f32>) {
        assert!((a.x - b.x).abs() < 1e-5, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < 1e-5, "{a:?} != {b:?}");
        assert!((a.z - b.z).abs() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().to_matrix(), Matrix4::identity());
    }

    #[test]
    fn scale_applies_before_translation() {
        let t = Transform::from_position(Vector3::new(1.0, 0.0, 0.0))
            .with_scale(Vector3::new(2.0, 2.0, 2.0));
        let p = t.to_matrix().transform_point(Point3::new(1.0, 1.0, 0.0));
        assert_close(p, Point3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z() {
        // Rx(90) maps +Y to +Z, then Rz(90) leaves +Z alone.
        let t = Transform::new().with_rotation(Vector3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let p = t.to_matrix().transform_point(Point3::new(0.0, 1.0, 0.0));
        assert_close(p, Point3::new(0.0, 0.0, 1.0));

        // +X: Rx leaves it, Rz(90) maps it to +Y.
        let p = t.to_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_close(p, Point3::new(0.0, 1.0, 0.0));
    }
}
