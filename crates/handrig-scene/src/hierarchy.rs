//! Bevy entity hierarchy seen through the core [`Hierarchy`] trait

use bevy::prelude::*;
use handrig_core::{Hierarchy, Pose};

/// Components of rig nodes the animator reads and writes
pub type RigNodeQuery<'w, 's> = Query<
    'w,
    's,
    (
        Option<&'static Name>,
        Option<&'static Children>,
        &'static mut Transform,
        Option<&'static ChildOf>,
    ),
>;

/// Last propagated world transforms
pub type GlobalPoseQuery<'w, 's> = Query<'w, 's, &'static GlobalTransform>;

/// Borrowed view of the world's transform tree for one system run
///
/// World poses of parents come from `GlobalTransform`, so they reflect the
/// last transform propagation rather than writes made earlier this frame.
pub struct EntityHierarchy<'q, 'w, 's> {
    nodes: &'q mut RigNodeQuery<'w, 's>,
    globals: &'q GlobalPoseQuery<'q, 'q>,
}

impl<'q, 'w, 's> EntityHierarchy<'q, 'w, 's> {
    pub fn new(
        nodes: &'q mut RigNodeQuery<'w, 's>,
        globals: &'q GlobalPoseQuery<'q, 'q>,
    ) -> Self {
        Self { nodes, globals }
    }

    /// Last propagated world pose of an entity
    pub fn global_pose(&self, entity: Entity) -> Option<Pose> {
        self.globals
            .get(entity)
            .ok()
            .map(|global| pose_from_transform(&global.compute_transform()))
    }
}

pub fn pose_from_transform(transform: &Transform) -> Pose {
    Pose::new(transform.translation, transform.rotation)
}

impl Hierarchy for EntityHierarchy<'_, '_, '_> {
    type Node = Entity;

    fn name(&self, node: Entity) -> &str {
        match self.nodes.get(node) {
            Ok((Some(name), ..)) => name.as_str(),
            _ => "",
        }
    }

    fn children(&self, node: Entity) -> Vec<Entity> {
        match self.nodes.get(node) {
            Ok((_, Some(children), ..)) => children.to_vec(),
            _ => Vec::new(),
        }
    }

    fn local_pose(&self, node: Entity) -> Pose {
        self.nodes
            .get(node)
            .map(|(_, _, transform, _)| pose_from_transform(transform))
            .unwrap_or_default()
    }

    fn set_local_pose(&mut self, node: Entity, pose: Pose) {
        if let Ok((_, _, mut transform, _)) = self.nodes.get_mut(node) {
            transform.translation = pose.position;
            transform.rotation = pose.rotation;
        }
    }

    fn set_world_pose(&mut self, node: Entity, pose: Pose) {
        let parent = match self.nodes.get(node) {
            Ok((_, _, _, Some(child_of))) => Some(child_of.parent()),
            _ => None,
        };
        let local = match parent.and_then(|parent| self.global_pose(parent)) {
            Some(parent_pose) => parent_pose.relative(&pose),
            None => pose,
        };
        self.set_local_pose(node, local);
    }
}
