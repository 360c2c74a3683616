//! Rig loading and binding for the command line tools

use tracing::warn;

use handrig_core::{
    find_descendant, resolve_entries, HandAnimator, HandRigConfig, Hierarchy, JointId, NodeArena,
    NodeId, RigError,
};

/// Resolve the rig root named in the config, or the first top-level node
fn rig_root(config: &HandRigConfig, arena: &NodeArena) -> Result<Option<NodeId>, RigError> {
    match config.hand.root.as_deref() {
        Some(name) => arena
            .roots()
            .find_map(|top| find_descendant(arena, top, name))
            .map(Some)
            .ok_or_else(|| RigError::NodeNotFound(name.to_string())),
        None => Ok(arena.roots().next()),
    }
}

/// Build an animator bound to the arena
///
/// Returns the animator and the names of joints left unbound. A configured
/// root missing from the rig is an error.
pub fn bind_rig(
    config: &HandRigConfig,
    arena: &NodeArena,
) -> Result<(HandAnimator<NodeId>, Vec<String>), RigError> {
    let mut animator = HandAnimator::new(config);
    let root = rig_root(config, arena)?;
    animator.set_root(root);

    if config.hand.auto_discover {
        let missing = animator.find_joints_from_root(arena);
        return Ok((animator, missing));
    }

    let (bindings, warnings) = resolve_entries(&config.bindings, |name| arena.find_by_name(name));
    animator.set_bindings(bindings);
    if !warnings.is_empty() {
        warn!(skipped = warnings.len(), "Some configured bindings were skipped");
    }
    let missing = animator
        .table()
        .unbound()
        .into_iter()
        .map(|joint| joint.name().to_string())
        .collect();
    Ok((animator, missing))
}

/// Human-readable binding list, in joint order
pub fn describe_bindings(animator: &HandAnimator<NodeId>, arena: &NodeArena) -> Vec<String> {
    JointId::ALL
        .iter()
        .filter_map(|joint| {
            animator
                .table()
                .get(*joint)
                .map(|node| format!("{:<22} {}", joint.name(), arena.name(node)))
        })
        .collect()
}
