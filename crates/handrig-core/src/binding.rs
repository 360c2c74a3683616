//! Joint-to-node bindings and the dense joint index table

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::skeleton::{JointId, JOINT_COUNT};

/// Association between a skeleton joint and a node of the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointBinding<N> {
    pub joint: JointId,
    pub node: N,
}

impl<N> JointBinding<N> {
    pub fn new(joint: JointId, node: N) -> Self {
        Self { joint, node }
    }
}

/// Dense joint index to node lookup with a presence mask
///
/// Slot `i` is present iff some binding targets the joint with index `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointIndexTable<N> {
    nodes: [Option<N>; JOINT_COUNT],
    present: [bool; JOINT_COUNT],
}

impl<N: Copy> Default for JointIndexTable<N> {
    fn default() -> Self {
        Self {
            nodes: [None; JOINT_COUNT],
            present: [false; JOINT_COUNT],
        }
    }
}

impl<N: Copy> JointIndexTable<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from an ordered binding list; later bindings win
    pub fn bind(bindings: &[JointBinding<N>]) -> Self {
        let mut table = Self::new();
        for binding in bindings {
            let index = binding.joint.index();
            table.nodes[index] = Some(binding.node);
            table.present[index] = true;
        }
        table
    }

    /// Build a table from raw `(joint index, node)` pairs
    ///
    /// Indices outside `[0, JOINT_COUNT)` are skipped and reported.
    pub fn bind_indices(pairs: &[(usize, N)]) -> (Self, Vec<BindWarning>) {
        let mut table = Self::new();
        let mut warnings = Vec::new();
        for (index, node) in pairs {
            if *index >= JOINT_COUNT {
                warn!(index = *index, "Ignoring binding with out-of-range joint index");
                warnings.push(BindWarning::IndexOutOfRange(*index));
                continue;
            }
            table.nodes[*index] = Some(*node);
            table.present[*index] = true;
        }
        (table, warnings)
    }

    pub fn get(&self, joint: JointId) -> Option<N> {
        self.nodes[joint.index()]
    }

    pub fn get_index(&self, index: usize) -> Option<N> {
        self.nodes.get(index).copied().flatten()
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.present.get(index).copied().unwrap_or(false)
    }

    pub fn presence_mask(&self) -> &[bool; JOINT_COUNT] {
        &self.present
    }

    /// Number of bound joints
    pub fn len(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present slots as `(index, node)` in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.present[*i])
            .filter_map(|(i, node)| node.map(|n| (i, n)))
    }

    /// Joints with no bound node
    pub fn unbound(&self) -> Vec<JointId> {
        JointId::ALL
            .iter()
            .copied()
            .filter(|joint| !self.present[joint.index()])
            .collect()
    }
}

/// Non-fatal problem encountered while building bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindWarning {
    /// A raw joint index outside `[0, JOINT_COUNT)`
    IndexOutOfRange(usize),
    /// A joint name that is not part of the skeleton
    UnknownJoint(String),
    /// A node name that does not exist in the hierarchy
    NodeNotFound { joint: JointId, node: String },
}

impl fmt::Display for BindWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange(index) => write!(f, "joint index {} is out of range", index),
            Self::UnknownJoint(name) => write!(f, "unknown joint '{}'", name),
            Self::NodeNotFound { joint, node } => {
                write!(f, "node '{}' for joint {} not found", node, joint)
            }
        }
    }
}

/// Joint reference in configuration: canonical name or raw dense index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JointRef {
    Index(usize),
    Name(String),
}

impl JointRef {
    pub fn resolve(&self) -> Result<JointId, BindWarning> {
        match self {
            Self::Index(index) => {
                JointId::from_index(*index).ok_or(BindWarning::IndexOutOfRange(*index))
            }
            Self::Name(name) => {
                JointId::from_name(name).ok_or_else(|| BindWarning::UnknownJoint(name.clone()))
            }
        }
    }
}

impl From<JointId> for JointRef {
    fn from(joint: JointId) -> Self {
        Self::Name(joint.name().to_string())
    }
}

/// A binding as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingEntry {
    /// Joint name (e.g. "IndexTip") or dense index
    pub joint: JointRef,
    /// Name of the rig node driven by the joint
    pub node: String,
}

/// Resolve configured bindings, looking nodes up by name
///
/// Entries that cannot be resolved are logged and returned as warnings;
/// the remaining entries are kept in order.
pub fn resolve_entries<N>(
    entries: &[BindingEntry],
    find: impl Fn(&str) -> Option<N>,
) -> (Vec<JointBinding<N>>, Vec<BindWarning>) {
    let mut bindings = Vec::with_capacity(entries.len());
    let mut warnings = Vec::new();

    for entry in entries {
        let joint = match entry.joint.resolve() {
            Ok(joint) => joint,
            Err(warning) => {
                warn!(%warning, "Skipping joint binding");
                warnings.push(warning);
                continue;
            }
        };
        match find(&entry.node) {
            Some(node) => bindings.push(JointBinding::new(joint, node)),
            None => {
                let warning = BindWarning::NodeNotFound {
                    joint,
                    node: entry.node.clone(),
                };
                warn!(%warning, "Skipping joint binding");
                warnings.push(warning);
            }
        }
    }

    debug!(
        resolved = bindings.len(),
        skipped = warnings.len(),
        "Resolved configured joint bindings"
    );
    (bindings, warnings)
}
