//! Transform hierarchy abstraction and an in-memory node arena
//!
//! The animator never owns the nodes of the rig it drives. It only holds
//! handles into a hierarchy owned elsewhere: a Bevy world, or the
//! [`NodeArena`] provided here for tools and tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::pose::Pose;

#[derive(Error, Debug)]
pub enum RigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse rig description: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

/// A transform hierarchy the animator can search and pose
pub trait Hierarchy {
    /// Handle to a node; cheap to copy and compare
    type Node: Copy + Eq + fmt::Debug;

    /// Node name, empty when the node is unnamed
    fn name(&self, node: Self::Node) -> &str;

    /// Direct children in hierarchy order
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Pose relative to the parent node
    fn local_pose(&self, node: Self::Node) -> Pose;

    /// Set the pose relative to the parent node
    fn set_local_pose(&mut self, node: Self::Node, pose: Pose);

    /// Set the world-space pose of a node
    fn set_world_pose(&mut self, node: Self::Node, pose: Pose);
}

/// Depth-first search for a named node, `root` included
pub fn find_descendant<H: Hierarchy>(hierarchy: &H, root: H::Node, name: &str) -> Option<H::Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if hierarchy.name(node) == name {
            return Some(node);
        }
        stack.extend(hierarchy.children(node).into_iter().rev());
    }
    None
}

/// Index of a node inside a [`NodeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct ArenaNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Pose,
}

/// Flat storage for a transform tree
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<ArenaNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node, optionally as the last child of `parent`
    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>, local: Pose) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArenaNode {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local,
        });
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(parent.0) {
                node.children.push(id);
            }
        }
        id
    }

    /// Add a node with an identity local pose
    pub fn add(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        self.add_node(name, parent, Pose::IDENTITY)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Nodes without a parent, in insertion order
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeId(i))
    }

    /// First node with exactly this name
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(NodeId)
    }

    /// Compose local poses from the root down to `node`
    pub fn world_pose(&self, node: NodeId) -> Pose {
        let mut pose = self.local_pose(node);
        let mut current = self.parent(node);
        while let Some(parent) = current {
            pose = self.local_pose(parent).mul_pose(&pose);
            current = self.parent(parent);
        }
        pose
    }

    /// Build an arena from a nested rig description
    pub fn from_description(description: &RigDescription) -> Self {
        let mut arena = Self::new();
        for root in &description.nodes {
            arena.insert_description(root, None);
        }
        debug!(nodes = arena.len(), "Built node arena from rig description");
        arena
    }

    fn insert_description(&mut self, node: &RigNode, parent: Option<NodeId>) {
        let id = self.add_node(&node.name, parent, node.pose);
        for child in &node.children {
            self.insert_description(child, Some(id));
        }
    }

    /// Snapshot the arena back into a nested description
    pub fn to_description(&self) -> RigDescription {
        RigDescription {
            nodes: self.roots().map(|root| self.describe(root)).collect(),
        }
    }

    fn describe(&self, node: NodeId) -> RigNode {
        let n = &self.nodes[node.0];
        RigNode {
            name: n.name.clone(),
            pose: n.local,
            children: n.children.iter().map(|c| self.describe(*c)).collect(),
        }
    }
}

impl Hierarchy for NodeArena {
    type Node = NodeId;

    fn name(&self, node: NodeId) -> &str {
        self.nodes.get(node.0).map(|n| n.name.as_str()).unwrap_or("")
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn local_pose(&self, node: NodeId) -> Pose {
        self.nodes.get(node.0).map(|n| n.local).unwrap_or_default()
    }

    fn set_local_pose(&mut self, node: NodeId, pose: Pose) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.local = pose;
        }
    }

    fn set_world_pose(&mut self, node: NodeId, pose: Pose) {
        let local = match self.parent(node) {
            Some(parent) => self.world_pose(parent).relative(&pose),
            None => pose,
        };
        self.set_local_pose(node, local);
    }
}

/// Serializable nested rig node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigNode {
    pub name: String,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub children: Vec<RigNode>,
}

/// A rig hierarchy as stored in JSON files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigDescription {
    #[serde(default)]
    pub nodes: Vec<RigNode>,
}

impl RigDescription {
    /// Load a rig description from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, RigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, RigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, RigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_arena_tree() {
        let mut arena = NodeArena::new();
        let root = arena.add("Root", None);
        let a = arena.add("A", Some(root));
        let b = arena.add("B", Some(root));
        let c = arena.add("C", Some(a));

        assert_eq!(arena.children(root), vec![a, b]);
        assert_eq!(arena.children(a), vec![c]);
        assert_eq!(arena.parent(c), Some(a));
        assert_eq!(arena.find_by_name("B"), Some(b));
        assert_eq!(arena.find_by_name("Z"), None);
        assert_eq!(arena.roots().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn test_world_pose_round_trip() {
        let mut arena = NodeArena::new();
        let root = arena.add_node(
            "Root",
            None,
            Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.5)),
        );
        let child = arena.add_node(
            "Child",
            Some(root),
            Pose::new(Vec3::new(0.0, 0.1, 0.0), Quat::from_rotation_x(0.2)),
        );

        let target = Pose::new(Vec3::new(-1.0, 0.5, 0.0), Quat::from_rotation_z(1.0));
        arena.set_world_pose(child, target);
        assert!(arena.world_pose(child).abs_diff_eq(&target, 1e-5));
        // Parent untouched
        assert!(arena
            .local_pose(root)
            .abs_diff_eq(&Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.5)), 1e-6));
    }

    #[test]
    fn test_description_json() {
        let json = r#"{
            "nodes": [
                { "name": "R_Wrist", "children": [
                    { "name": "R_Palm" },
                    { "name": "R_IndexMetacarpal", "pose": { "position": [0.0, 0.02, 0.0] } }
                ]}
            ]
        }"#;
        let description = RigDescription::from_json(json).unwrap();
        let arena = NodeArena::from_description(&description);

        assert_eq!(arena.len(), 3);
        let index = arena.find_by_name("R_IndexMetacarpal").unwrap();
        assert_eq!(arena.local_pose(index).position, Vec3::new(0.0, 0.02, 0.0));
        assert_eq!(arena.local_pose(index).rotation, Quat::IDENTITY);

        let back = arena.to_description();
        assert_eq!(back.nodes.len(), 1);
        assert_eq!(back.nodes[0].children.len(), 2);
    }

    #[test]
    fn test_description_parse_error() {
        assert!(matches!(
            RigDescription::from_json("{ nodes: "),
            Err(RigError::ParseError(_))
        ));
    }

    #[test]
    fn test_find_descendant() {
        let mut arena = NodeArena::new();
        let a = arena.add("A", None);
        let b = arena.add("B", Some(a));
        let other = arena.add("Other", None);
        let b_elsewhere = arena.add("B", Some(other));

        assert_eq!(find_descendant(&arena, a, "A"), Some(a));
        assert_eq!(find_descendant(&arena, a, "B"), Some(b));
        assert_eq!(find_descendant(&arena, other, "B"), Some(b_elsewhere));
        assert_eq!(find_descendant(&arena, b, "Other"), None);
    }
}
