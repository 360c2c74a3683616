//! Hand rig components, tracking messages and driving systems

use bevy::prelude::*;
use handrig_core::{
    find_descendant, resolve_entries, ControllerInput, DriveContext, FingerId, HandAnimator,
    HandRigConfig, HandSnapshot, HandTrackingEvents, Handedness, Pose, ProceduralAnimation,
    UpdateFlags, UpdateType, FINGER_COUNT,
};
use tracing::{info, warn};

use crate::hierarchy::{EntityHierarchy, GlobalPoseQuery, RigNodeQuery};

/// A rigged hand driven from hand tracking
///
/// Placed on the entity under which the rig's bones live. The rig root is
/// looked up by name below this entity, or is the entity itself.
#[derive(Component)]
pub struct HandRig {
    pub config: HandRigConfig,
    /// Entity whose transform stands in for the tracked controller
    pub controller: Option<Entity>,
    /// Mesh entity shown only while the hand or controller is tracked
    pub mesh: Option<Entity>,
    animator: HandAnimator<Entity>,
    source: HandTrackingEvents,
    controller_tracked: bool,
}

impl HandRig {
    pub fn new(config: HandRigConfig) -> Self {
        let animator = HandAnimator::new(&config);
        let source = HandTrackingEvents::new(config.hand.handedness, config.hand.update_types);
        Self {
            config,
            controller: None,
            mesh: None,
            animator,
            source,
            controller_tracked: false,
        }
    }

    pub fn with_controller(mut self, controller: Entity) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn with_mesh(mut self, mesh: Entity) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn animator(&self) -> &HandAnimator<Entity> {
        &self.animator
    }

    pub fn handedness(&self) -> Handedness {
        self.config.hand.handedness
    }

    fn source_pose(&self, hierarchy: &EntityHierarchy) -> Pose {
        let device_pose = self
            .controller
            .and_then(|controller| hierarchy.global_pose(controller))
            .unwrap_or_default();
        self.source.controller_pose(device_pose)
    }

    /// Bind joints below `entity` and start following the tracking source
    fn bind(&mut self, entity: Entity, hierarchy: &mut EntityHierarchy, curls: &mut FingerCurls) {
        self.animator.deactivate(Some(&mut self.source));

        let root = match self.config.hand.root.as_deref() {
            Some(name) => find_descendant(&*hierarchy, entity, name).or_else(|| {
                warn!(root = name, "Rig root not found, using the rig entity");
                Some(entity)
            }),
            None => Some(entity),
        };
        self.animator.set_root(root);

        if self.config.hand.auto_discover {
            self.animator.find_joints_from_root(&*hierarchy);
        } else if let Some(root) = root {
            let (bindings, _) = resolve_entries(&self.config.bindings, |name| {
                find_descendant(&*hierarchy, root, name)
            });
            self.animator.set_bindings(bindings);
        }

        let source_pose = self.source_pose(hierarchy);
        let mut ctx = DriveContext {
            hierarchy,
            engine: curls,
            source_pose,
        };
        self.animator.activate(Some(&mut self.source), &mut ctx);
        info!(
            hand = %self.handedness(),
            bound = self.animator.table().len(),
            mode = %self.animator.mode(),
            "Hand rig bound"
        );
    }

    fn feed(&mut self, message: &HandTrackingMessage) {
        match message {
            HandTrackingMessage::TrackingAcquired(hand) => self.source.on_tracking_acquired(*hand),
            HandTrackingMessage::TrackingLost(hand) => self.source.on_tracking_lost(*hand),
            HandTrackingMessage::HandsUpdated {
                flags,
                update_type,
                left,
                right,
            } => self.source.on_hands_updated(*flags, *update_type, left, right),
            HandTrackingMessage::ControllerTracked { hand, tracked } => {
                if *hand == self.handedness() {
                    self.controller_tracked = *tracked;
                }
            }
        }
        self.source.update_controller(self.controller_tracked);
    }
}

/// Finger curl parameters for the procedural hand animation
///
/// Animation systems read the curls while [`FingerCurls::is_enabled`].
#[derive(Component, Debug, Clone)]
pub struct FingerCurls {
    enabled: bool,
    curls: [f32; FINGER_COUNT],
}

impl Default for FingerCurls {
    fn default() -> Self {
        Self {
            enabled: true,
            curls: [0.0; FINGER_COUNT],
        }
    }
}

impl FingerCurls {
    pub fn curl(&self, finger: FingerId) -> f32 {
        self.curls[finger as usize]
    }
}

impl ProceduralAnimation for FingerCurls {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_parameter(&mut self, finger: FingerId, value: f32) {
        self.curls[finger as usize] = value;
    }
}

/// Latest controller action values per hand
#[derive(Resource, Debug, Clone, Default)]
pub struct ControllerInputs {
    pub left: ControllerInput,
    pub right: ControllerInput,
}

impl ControllerInputs {
    pub fn get(&self, hand: Handedness) -> Option<&ControllerInput> {
        match hand {
            Handedness::Left => Some(&self.left),
            Handedness::Right => Some(&self.right),
            Handedness::Invalid => None,
        }
    }
}

/// Platform hand tracking callbacks forwarded into the world
#[derive(Message, Debug, Clone)]
pub enum HandTrackingMessage {
    TrackingAcquired(Handedness),
    TrackingLost(Handedness),
    HandsUpdated {
        flags: UpdateFlags,
        update_type: UpdateType,
        left: HandSnapshot,
        right: HandSnapshot,
    },
    ControllerTracked {
        hand: Handedness,
        tracked: bool,
    },
}

/// Request to rediscover joints of a rig, e.g. after its model changed
#[derive(Message, Debug, Clone, Copy)]
pub struct RebindHandRig {
    pub entity: Entity,
}

/// Bind newly added rigs
pub fn bind_hand_rigs(
    mut rigs: Query<(Entity, &mut HandRig, &mut FingerCurls), Added<HandRig>>,
    mut nodes: RigNodeQuery,
    globals: GlobalPoseQuery,
) {
    for (entity, mut rig, mut curls) in rigs.iter_mut() {
        let mut hierarchy = EntityHierarchy::new(&mut nodes, &globals);
        rig.bind(entity, &mut hierarchy, &mut curls);
    }
}

/// Rebind rigs on request
pub fn rebind_hand_rigs(
    mut requests: MessageReader<RebindHandRig>,
    mut rigs: Query<(&mut HandRig, &mut FingerCurls)>,
    mut nodes: RigNodeQuery,
    globals: GlobalPoseQuery,
) {
    for request in requests.read() {
        let Ok((mut rig, mut curls)) = rigs.get_mut(request.entity) else {
            warn!(entity = ?request.entity, "Rebind requested for an entity without a hand rig");
            continue;
        };
        let mut hierarchy = EntityHierarchy::new(&mut nodes, &globals);
        rig.bind(request.entity, &mut hierarchy, &mut curls);
    }
}

/// Deliver tracking messages, advance blends and update mesh visibility
pub fn drive_hand_rigs(
    time: Res<Time>,
    inputs: Res<ControllerInputs>,
    mut messages: MessageReader<HandTrackingMessage>,
    mut rigs: Query<(&mut HandRig, &mut FingerCurls)>,
    mut nodes: RigNodeQuery,
    globals: GlobalPoseQuery,
    mut visibility: Query<&mut Visibility>,
) {
    let messages: Vec<HandTrackingMessage> = messages.read().cloned().collect();
    let dt = time.delta_secs();
    let idle = ControllerInput::new();

    for (mut rig, mut curls) in rigs.iter_mut() {
        if !rig.animator.is_active() {
            continue;
        }
        let rig = &mut *rig;
        let mut hierarchy = EntityHierarchy::new(&mut nodes, &globals);

        for message in &messages {
            rig.feed(message);
            let source_pose = rig.source_pose(&hierarchy);
            let mut ctx = DriveContext {
                hierarchy: &mut hierarchy,
                engine: &mut *curls,
                source_pose,
            };
            rig.animator.pump(&mut rig.source, &mut ctx);
        }

        let input = inputs.get(rig.handedness()).unwrap_or(&idle);
        let source_pose = rig.source_pose(&hierarchy);
        let mut ctx = DriveContext {
            hierarchy: &mut hierarchy,
            engine: &mut *curls,
            source_pose,
        };
        rig.animator.tick(dt, input, &mut ctx);

        if let Some(mut mesh_visibility) = rig.mesh.and_then(|mesh| visibility.get_mut(mesh).ok()) {
            *mesh_visibility = if rig.animator.is_visible() {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
        }
    }
}
