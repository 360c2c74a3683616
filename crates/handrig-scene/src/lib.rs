//! Handrig Scene - Bevy integration for tracked hand rigs
//!
//! Spawning an entity with [`HandRig`] and [`FingerCurls`] binds the bones
//! below it; [`HandTrackingMessage`]s written by the platform layer then
//! drive the rig each frame, with [`ControllerInputs`] feeding the
//! procedural fallback.

pub mod hierarchy;
pub mod rig;

use bevy::prelude::*;

/// Plugin that binds and drives hand rigs
pub struct HandRigPlugin;

impl Plugin for HandRigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ControllerInputs>()
            .add_message::<HandTrackingMessage>()
            .add_message::<RebindHandRig>()
            .add_systems(
                Update,
                (bind_hand_rigs, rebind_hand_rigs, drive_hand_rigs).chain(),
            );
    }
}

pub use hierarchy::{EntityHierarchy, GlobalPoseQuery, RigNodeQuery};
pub use rig::{
    bind_hand_rigs, drive_hand_rigs, rebind_hand_rigs, ControllerInputs, FingerCurls, HandRig,
    HandTrackingMessage, RebindHandRig,
};
