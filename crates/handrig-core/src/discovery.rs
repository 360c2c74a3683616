//! Automatic joint discovery from a rig hierarchy
//!
//! Rigs name their bones after the tracked joints, usually with a side or
//! character tag in front or behind (`R_IndexProximal`, `IndexProximal.L`).
//! Discovery walks the wrist's children and each finger's chain, matching
//! names that start or end with the canonical joint identifier.

use tracing::debug;

use crate::binding::JointBinding;
use crate::hierarchy::Hierarchy;
use crate::skeleton::{FingerId, JointId};

/// Result of a discovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery<N> {
    /// Bindings in discovery order: wrist, finger chains, palm last
    pub bindings: Vec<JointBinding<N>>,
    /// Names of joints that could not be located, possibly repeated
    pub missing: Vec<String>,
}

impl<N> Discovery<N> {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// ASCII case-insensitive prefix or suffix match
pub fn starts_or_ends_with(value: &str, term: &str) -> bool {
    starts_with_ignore_case(value, term) || ends_with_ignore_case(value, term)
}

fn starts_with_ignore_case(value: &str, term: &str) -> bool {
    value.len() >= term.len()
        && value.as_bytes()[..term.len()].eq_ignore_ascii_case(term.as_bytes())
}

fn ends_with_ignore_case(value: &str, term: &str) -> bool {
    value.len() >= term.len()
        && value.as_bytes()[value.len() - term.len()..].eq_ignore_ascii_case(term.as_bytes())
}

/// Locate the joints of a hand below `root`
pub fn discover<H: Hierarchy>(hierarchy: &H, root: H::Node) -> Discovery<H::Node> {
    let mut bindings = Vec::new();
    let mut missing = Vec::new();

    let wrist_name = JointId::Wrist.name();
    let wrist = if starts_or_ends_with(hierarchy.name(root), wrist_name) {
        Some(root)
    } else {
        hierarchy
            .children(root)
            .into_iter()
            .filter(|child| ends_with_ignore_case(hierarchy.name(*child), wrist_name))
            .last()
    };

    let Some(wrist) = wrist else {
        debug!(root = hierarchy.name(root), "No wrist node found below rig root");
        missing.push(wrist_name.to_string());
        return Discovery { bindings, missing };
    };
    bindings.push(JointBinding::new(JointId::Wrist, wrist));

    let mut palm = None;
    let mut finger_roots = Vec::new();
    for child in hierarchy.children(wrist) {
        if ends_with_ignore_case(hierarchy.name(child), JointId::Palm.name()) {
            palm = Some(child);
        } else {
            finger_roots.push(child);
        }
    }

    for finger in FingerId::ALL {
        let front = finger.front_joint();
        let Some(first) = finger_roots
            .iter()
            .copied()
            .find(|child| starts_or_ends_with(hierarchy.name(*child), front.name()))
        else {
            continue;
        };
        bindings.push(JointBinding::new(front, first));
        walk_chain(hierarchy, finger, first, &mut bindings, &mut missing);
    }

    for finger in FingerId::ALL {
        let front = finger.front_joint();
        if !bindings.iter().any(|binding| binding.joint == front) {
            missing.push(front.name().to_string());
        }
    }

    match palm {
        Some(palm) => bindings.push(JointBinding::new(JointId::Palm, palm)),
        None => missing.push(JointId::Palm.name().to_string()),
    }

    debug!(
        bound = bindings.len(),
        missing = missing.len(),
        "Joint discovery finished"
    );
    Discovery { bindings, missing }
}

/// Bind the joints after a finger's front joint, descending one level per joint
///
/// When no child matches, the current node itself is re-tested against the
/// expected joint. This covers rigs whose bone depth is offset by one from
/// the tracked skeleton. A joint that still does not match is reported and
/// the search continues from the last matched node.
fn walk_chain<H: Hierarchy>(
    hierarchy: &H,
    finger: FingerId,
    first: H::Node,
    bindings: &mut Vec<JointBinding<H::Node>>,
    missing: &mut Vec<String>,
) {
    let mut current = first;
    for joint in finger.chain().skip(1) {
        let joint_name = joint.name();
        if let Some(next) = hierarchy
            .children(current)
            .into_iter()
            .find(|child| starts_or_ends_with(hierarchy.name(*child), joint_name))
        {
            current = next;
        }

        if starts_or_ends_with(hierarchy.name(current), joint_name) {
            bindings.push(JointBinding::new(joint, current));
        } else {
            missing.push(joint_name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::JointIndexTable;
    use crate::hierarchy::{NodeArena, NodeId};
    use crate::skeleton::JOINT_COUNT;

    /// Build a complete right hand rig, optionally skipping some joints
    fn hand_rig(prefix: &str, skip: &[JointId]) -> (NodeArena, NodeId) {
        let mut arena = NodeArena::new();
        let root = arena.add(&format!("{prefix}Wrist"), None);
        if !skip.contains(&JointId::Palm) {
            arena.add(&format!("{prefix}Palm"), Some(root));
        }
        for finger in FingerId::ALL {
            let mut parent = root;
            for joint in finger.chain() {
                if skip.contains(&joint) {
                    continue;
                }
                parent = arena.add(&format!("{prefix}{}", joint.name()), Some(parent));
            }
        }
        (arena, root)
    }

    #[test]
    fn test_full_rig_binds_everything() {
        let (arena, root) = hand_rig("R_", &[]);
        let discovery = discover(&arena, root);

        assert!(discovery.is_complete(), "missing: {:?}", discovery.missing);
        assert_eq!(discovery.bindings.len(), JOINT_COUNT);
        assert_eq!(discovery.bindings[0].joint, JointId::Wrist);
        assert_eq!(discovery.bindings.last().map(|b| b.joint), Some(JointId::Palm));

        let table = JointIndexTable::bind(&discovery.bindings);
        for joint in JointId::ALL {
            let node = table.get(joint).unwrap();
            assert_eq!(arena.name(node), format!("R_{}", joint.name()));
        }
    }

    #[test]
    fn test_wrist_as_child_of_root() {
        let mut arena = NodeArena::new();
        let root = arena.add("HandRig", None);
        arena.add("Mesh", Some(root));
        let wrist = arena.add("l_wrist", Some(root));
        let discovery = discover(&arena, root);
        assert_eq!(discovery.bindings[0], JointBinding::new(JointId::Wrist, wrist));
    }

    #[test]
    fn test_missing_wrist_aborts() {
        let mut arena = NodeArena::new();
        let root = arena.add("Armature", None);
        arena.add("Hand", Some(root));
        let discovery = discover(&arena, root);

        assert!(discovery.bindings.is_empty());
        assert_eq!(discovery.missing, vec!["Wrist".to_string()]);
    }

    #[test]
    fn test_missing_palm_reported_once() {
        let (arena, root) = hand_rig("R_", &[JointId::Palm]);
        let discovery = discover(&arena, root);

        assert_eq!(discovery.missing, vec!["Palm".to_string()]);
        assert_eq!(discovery.bindings.len(), JOINT_COUNT - 1);
    }

    #[test]
    fn test_missing_finger_front_reported() {
        let mut arena = NodeArena::new();
        let root = arena.add("Wrist", None);
        arena.add("Palm", Some(root));
        for finger in FingerId::ALL.into_iter().filter(|f| *f != FingerId::Ring) {
            let mut parent = root;
            for joint in finger.chain() {
                parent = arena.add(joint.name(), Some(parent));
            }
        }

        let discovery = discover(&arena, root);
        assert_eq!(discovery.missing, vec!["RingMetacarpal".to_string()]);
        assert_eq!(discovery.bindings.len(), JOINT_COUNT - 5);
    }

    #[test]
    fn test_chain_gap_continues_from_last_match() {
        // IndexIntermediate absent: IndexDistal is a direct child of IndexProximal
        let (arena, root) = hand_rig("", &[JointId::IndexIntermediate]);
        let discovery = discover(&arena, root);

        assert_eq!(discovery.missing, vec!["IndexIntermediate".to_string()]);
        let table = JointIndexTable::bind(&discovery.bindings);
        assert_eq!(table.get(JointId::IndexIntermediate), None);
        assert_eq!(arena.name(table.get(JointId::IndexDistal).unwrap()), "IndexDistal");
        assert_eq!(arena.name(table.get(JointId::IndexTip).unwrap()), "IndexTip");
    }

    #[test]
    fn test_depth_offset_retests_current_node() {
        // One bone stands for both metacarpal and proximal
        let mut arena = NodeArena::new();
        let root = arena.add("Wrist", None);
        let merged = arena.add("IndexMetacarpal_IndexProximal", Some(root));
        let intermediate = arena.add("IndexIntermediate", Some(merged));
        let distal = arena.add("IndexDistal", Some(intermediate));
        arena.add("IndexTip", Some(distal));

        let discovery = discover(&arena, root);
        let table = JointIndexTable::bind(&discovery.bindings);
        assert_eq!(table.get(JointId::IndexMetacarpal), Some(merged));
        assert_eq!(table.get(JointId::IndexProximal), Some(merged));
        assert_eq!(table.get(JointId::IndexIntermediate), Some(intermediate));
        assert!(!discovery.missing.iter().any(|name| name.starts_with("Index")));
    }

    #[test]
    fn test_suffix_tags_and_case() {
        let mut arena = NodeArena::new();
        let root = arena.add("wrist.R", None);
        let wrist_child = arena.add("THUMBMETACARPAL.R", Some(root));
        arena.add("thumbproximal_r", Some(wrist_child));
        // Root name ends with ".R", so only prefix matching can find the wrist
        let discovery = discover(&arena, root);
        let table = JointIndexTable::bind(&discovery.bindings);
        assert_eq!(table.get(JointId::Wrist), Some(root));
        assert_eq!(table.get(JointId::ThumbMetacarpal), Some(wrist_child));
        assert!(table.get(JointId::ThumbProximal).is_some());
        assert!(discovery.missing.contains(&"ThumbDistal".to_string()));
        assert!(discovery.missing.contains(&"ThumbTip".to_string()));
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let (arena, root) = hand_rig("L_", &[JointId::MiddleDistal, JointId::Palm]);
        let first = discover(&arena, root);
        let second = discover(&arena, root);
        assert_eq!(first, second);
        assert_eq!(
            JointIndexTable::bind(&first.bindings),
            JointIndexTable::bind(&second.bindings)
        );
    }

    #[test]
    fn test_match_helpers() {
        assert!(starts_or_ends_with("R_IndexTip", "IndexTip"));
        assert!(starts_or_ends_with("indextip_end", "IndexTip"));
        assert!(!starts_or_ends_with("R_IndexTip_end", "IndexTip"));
        assert!(!starts_or_ends_with("Tip", "IndexTip"));
    }
}
