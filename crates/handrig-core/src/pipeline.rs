//! Per-frame conversion of tracked joint world poses into rig local poses

use serde::{Deserialize, Serialize};

use crate::binding::JointIndexTable;
use crate::hierarchy::Hierarchy;
use crate::pose::Pose;
use crate::skeleton::{FingerId, JointId, JOINT_COUNT};

/// Tracked world poses for one frame
///
/// A frame may carry any subset of joints; joints the tracker lost
/// confidence in are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandSnapshot {
    #[serde(default)]
    joints: Vec<Option<Pose>>,
    #[serde(default)]
    pub root_pose: Option<Pose>,
}

impl HandSnapshot {
    pub fn new() -> Self {
        Self {
            joints: vec![None; JOINT_COUNT],
            root_pose: None,
        }
    }

    pub fn with_joint(mut self, joint: JointId, pose: Pose) -> Self {
        self.set_joint(joint, pose);
        self
    }

    pub fn set_joint(&mut self, joint: JointId, pose: Pose) {
        if self.joints.len() < JOINT_COUNT {
            self.joints.resize(JOINT_COUNT, None);
        }
        self.joints[joint.index()] = Some(pose);
    }

    pub fn clear_joint(&mut self, joint: JointId) {
        if let Some(slot) = self.joints.get_mut(joint.index()) {
            *slot = None;
        }
    }

    /// World pose of a joint, if tracked this frame
    pub fn joint(&self, joint: JointId) -> Option<Pose> {
        self.joints.get(joint.index()).copied().flatten()
    }

    pub fn tracked_count(&self) -> usize {
        self.joints.iter().filter(|p| p.is_some()).count()
    }
}

/// Reusable local pose storage, one slot per joint
///
/// Slots keep their last computed value across frames. The dirty mask
/// records which slots the most recent [`compute_local_poses`] call wrote.
#[derive(Debug, Clone)]
pub struct LocalPoseBuffer {
    poses: Box<[Pose; JOINT_COUNT]>,
    dirty: [bool; JOINT_COUNT],
}

impl Default for LocalPoseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPoseBuffer {
    pub fn new() -> Self {
        Self {
            poses: Box::new([Pose::IDENTITY; JOINT_COUNT]),
            dirty: [false; JOINT_COUNT],
        }
    }

    pub fn get(&self, joint: JointId) -> Pose {
        self.poses[joint.index()]
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.get(index).copied().unwrap_or(false)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().filter(|d| **d).count()
    }

    fn store(&mut self, index: usize, pose: Pose) {
        self.poses[index] = pose;
        self.dirty[index] = true;
    }

    fn clear_dirty(&mut self) {
        self.dirty = [false; JOINT_COUNT];
    }
}

/// Pose of `child` relative to `parent`, both given in world space
pub fn local_pose(parent: &Pose, child: &Pose) -> Pose {
    parent.relative(child)
}

/// Convert a snapshot's world poses into parent-relative poses
///
/// Without a tracked wrist the buffer is left untouched (and nothing is
/// marked dirty). Each finger joint is expressed relative to the closest
/// tracked joint before it in the chain, falling back to the wrist.
pub fn compute_local_poses(snapshot: &HandSnapshot, buffer: &mut LocalPoseBuffer) {
    buffer.clear_dirty();

    let Some(wrist) = snapshot.joint(JointId::Wrist) else {
        return;
    };
    buffer.store(JointId::Wrist.index(), wrist);

    if let Some(palm) = snapshot.joint(JointId::Palm) {
        buffer.store(JointId::Palm.index(), local_pose(&wrist, &palm));
    }

    for finger in FingerId::ALL {
        let mut parent = wrist;
        for joint in finger.chain() {
            if let Some(world) = snapshot.joint(joint) {
                buffer.store(joint.index(), local_pose(&parent, &world));
                parent = world;
            }
        }
    }
}

/// Write freshly computed local poses onto the bound rig nodes
///
/// Only slots that are both bound and written by the last compute are
/// applied. Returns the number of nodes posed.
pub fn apply_local_poses<H: Hierarchy>(
    table: &JointIndexTable<H::Node>,
    buffer: &LocalPoseBuffer,
    hierarchy: &mut H,
) -> usize {
    let mut applied = 0;
    for (index, node) in table.iter() {
        if !buffer.is_dirty(index) {
            continue;
        }
        hierarchy.set_local_pose(node, buffer.poses[index]);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::JointBinding;
    use crate::hierarchy::{NodeArena, NodeId};
    use glam::{Quat, Vec3};

    fn pose(x: f32, y: f32, z: f32, yaw: f32) -> Pose {
        Pose::new(Vec3::new(x, y, z), Quat::from_rotation_y(yaw))
    }

    fn full_snapshot() -> HandSnapshot {
        let mut snapshot = HandSnapshot::new();
        for (i, joint) in JointId::ALL.iter().enumerate() {
            let f = i as f32;
            snapshot.set_joint(*joint, pose(f * 0.01, 1.0 + f * 0.02, -f * 0.005, f * 0.1));
        }
        snapshot
    }

    #[test]
    fn test_no_wrist_is_noop() {
        let mut buffer = LocalPoseBuffer::new();
        compute_local_poses(&full_snapshot(), &mut buffer);
        let before = buffer.get(JointId::IndexTip);

        let mut snapshot = full_snapshot();
        snapshot.clear_joint(JointId::Wrist);
        snapshot.set_joint(JointId::IndexTip, pose(9.0, 9.0, 9.0, 0.0));
        compute_local_poses(&snapshot, &mut buffer);

        assert_eq!(buffer.dirty_count(), 0);
        assert_eq!(buffer.get(JointId::IndexTip), before);
    }

    #[test]
    fn test_chain_reconstructs_world_poses() {
        let snapshot = full_snapshot();
        let mut buffer = LocalPoseBuffer::new();
        compute_local_poses(&snapshot, &mut buffer);
        assert_eq!(buffer.dirty_count(), JOINT_COUNT);

        let wrist = snapshot.joint(JointId::Wrist).unwrap();
        assert_eq!(buffer.get(JointId::Wrist), wrist);

        let palm = wrist.mul_pose(&buffer.get(JointId::Palm));
        assert!(palm.abs_diff_eq(&snapshot.joint(JointId::Palm).unwrap(), 1e-4));

        for finger in FingerId::ALL {
            let mut world = wrist;
            for joint in finger.chain() {
                world = world.mul_pose(&buffer.get(joint));
                assert!(
                    world.abs_diff_eq(&snapshot.joint(joint).unwrap(), 1e-4),
                    "{joint} drifted"
                );
            }
        }
    }

    #[test]
    fn test_chain_skip_uses_last_present_ancestor() {
        let mut snapshot = full_snapshot();
        snapshot.clear_joint(JointId::IndexIntermediate);

        let mut buffer = LocalPoseBuffer::new();
        compute_local_poses(&snapshot, &mut buffer);

        assert!(!buffer.is_dirty(JointId::IndexIntermediate.index()));
        let proximal = snapshot.joint(JointId::IndexProximal).unwrap();
        let distal = snapshot.joint(JointId::IndexDistal).unwrap();
        assert!(buffer
            .get(JointId::IndexDistal)
            .abs_diff_eq(&local_pose(&proximal, &distal), 1e-6));
    }

    #[test]
    fn test_wrist_and_thumb_tip_only() {
        let mut arena = NodeArena::new();
        let mut bindings = Vec::new();
        for joint in JointId::ALL {
            let node = arena.add_node(joint.name(), None, pose(0.5, 0.5, 0.5, 0.25));
            bindings.push(JointBinding::new(joint, node));
        }
        let table = JointIndexTable::bind(&bindings);

        let wrist = pose(0.0, 1.0, 0.0, 0.3);
        let tip = pose(0.1, 1.1, 0.05, 1.2);
        let snapshot = HandSnapshot::new()
            .with_joint(JointId::Wrist, wrist)
            .with_joint(JointId::ThumbTip, tip);

        let mut buffer = LocalPoseBuffer::new();
        compute_local_poses(&snapshot, &mut buffer);
        assert_eq!(buffer.dirty_count(), 2);

        let applied = apply_local_poses(&table, &buffer, &mut arena);
        assert_eq!(applied, 2);

        for joint in JointId::ALL {
            let node = table.get(joint).unwrap();
            let local = arena.local_pose(node);
            match joint {
                JointId::Wrist => assert_eq!(local, wrist),
                JointId::ThumbTip => assert!(local.abs_diff_eq(&local_pose(&wrist, &tip), 1e-6)),
                _ => assert_eq!(local, pose(0.5, 0.5, 0.5, 0.25), "{joint} moved"),
            }
        }
    }

    #[test]
    fn test_apply_skips_unbound_slots() {
        let mut arena = NodeArena::new();
        let wrist_node = arena.add("Wrist", None);
        let table = JointIndexTable::bind(&[JointBinding::new(JointId::Wrist, wrist_node)]);

        let mut buffer = LocalPoseBuffer::new();
        compute_local_poses(&full_snapshot(), &mut buffer);
        assert_eq!(apply_local_poses(&table, &buffer, &mut arena), 1);
        assert_eq!(arena.len(), 1);
        assert_eq!(
            arena.local_pose(NodeId(0)),
            full_snapshot().joint(JointId::Wrist).unwrap()
        );
    }
}
