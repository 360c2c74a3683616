//! Root alignment against the tracking/controller source transform

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::pose::{euler_degrees, Pose};

/// Offset applied to the controller transform when posing the rig root
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootAlignment {
    /// Apply the offsets below; otherwise the root follows the source exactly
    #[serde(default)]
    pub use_offset: bool,
    /// Position offset in the source's local space
    #[serde(default)]
    pub position_offset: Vec3,
    /// Rotation offset as (x, y, z) Euler angles in degrees
    #[serde(default)]
    pub rotation_offset: Vec3,
}

impl Default for RootAlignment {
    fn default() -> Self {
        Self {
            use_offset: false,
            position_offset: Vec3::ZERO,
            rotation_offset: Vec3::ZERO,
        }
    }
}

impl RootAlignment {
    pub fn with_offset(position_offset: Vec3, rotation_offset: Vec3) -> Self {
        Self {
            use_offset: true,
            position_offset,
            rotation_offset,
        }
    }

    /// World pose of the rig root for a given source world pose
    pub fn align(&self, source: &Pose) -> Pose {
        if !self.use_offset {
            return *source;
        }
        Pose {
            position: source.transform_point(self.position_offset),
            rotation: source.rotation * euler_degrees(self.rotation_offset),
        }
    }
}
