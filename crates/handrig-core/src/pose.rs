//! Rigid poses (position + orientation)

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "identity_rotation")]
    pub rotation: Quat,
}

fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Build a pose from a position and (x, y, z) Euler angles in degrees
    ///
    /// Rotation is applied Z first, then X, then Y.
    pub fn from_euler_degrees(position: Vec3, euler: Vec3) -> Self {
        Self {
            position,
            rotation: euler_degrees(euler),
        }
    }

    /// Transform a point from this pose's local space into the parent space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Compose this pose (parent) with a pose expressed in its local space
    pub fn mul_pose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// Express `child` (world space) relative to this pose (world space)
    ///
    /// `self.mul_pose(&self.relative(child))` reproduces `child`.
    pub fn relative(&self, child: &Pose) -> Pose {
        let inverse_rotation = self.rotation.inverse();
        Pose {
            position: inverse_rotation * (child.position - self.position),
            rotation: inverse_rotation * child.rotation,
        }
    }

    pub fn abs_diff_eq(&self, other: &Pose, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

/// Quaternion for (x, y, z) Euler angles in degrees, Z applied first, then X, then Y
pub fn euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}
