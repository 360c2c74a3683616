//! Handrig Core - Hand tracking retargeting for rigged meshes
//!
//! This crate provides the engine-independent pieces of the hand rig:
//! - Fixed hand skeleton topology (joints, fingers, chains)
//! - Joint binding and automatic discovery from a rig hierarchy
//! - Pose pipeline turning tracked world poses into rig local poses
//! - Drive-mode arbitration between tracking and procedural animation
//! - Finger blend smoothing and root alignment for the procedural fallback

pub mod animator;
pub mod arbitration;
pub mod binding;
pub mod blend;
pub mod config;
pub mod discovery;
pub mod hierarchy;
pub mod input;
pub mod pipeline;
pub mod pose;
pub mod procedural;
pub mod root;
pub mod skeleton;
pub mod tracking;

pub use animator::{DriveContext, HandAnimator};
pub use arbitration::{Arbiter, DriveMode, Transition};
pub use binding::{resolve_entries, BindWarning, BindingEntry, JointBinding, JointIndexTable, JointRef};
pub use blend::{BlendGroup, BlendState, FingerBlend, FingerGroups};
pub use config::{ConfigError, HandRigConfig};
pub use discovery::{discover, Discovery};
pub use hierarchy::{find_descendant, Hierarchy, NodeArena, NodeId, RigDescription, RigError};
pub use input::{ControllerInput, InputAction, InputSource};
pub use pipeline::{apply_local_poses, compute_local_poses, HandSnapshot, LocalPoseBuffer};
pub use pose::Pose;
pub use procedural::{ParameterTable, ProceduralAnimation};
pub use root::RootAlignment;
pub use skeleton::{FingerId, FingerSet, Handedness, JointId, FINGER_COUNT, JOINT_COUNT};
pub use tracking::{
    Channel, HandEvent, HandEvents, HandTrackingEvents, Subscriptions, UpdateFlags, UpdateType,
    UpdateTypes,
};
