//! Hand animator: binds a rig, follows hand tracking, falls back to
//! procedural animation driven by controller input

use tracing::{debug, info, warn};

use crate::arbitration::{Arbiter, DriveMode, Transition};
use crate::binding::{JointBinding, JointIndexTable};
use crate::blend::BlendState;
use crate::config::HandRigConfig;
use crate::discovery::{discover, Discovery};
use crate::hierarchy::Hierarchy;
use crate::input::InputSource;
use crate::pipeline::{apply_local_poses, compute_local_poses, HandSnapshot, LocalPoseBuffer};
use crate::pose::Pose;
use crate::procedural::ProceduralAnimation;
use crate::root::RootAlignment;
use crate::skeleton::{Handedness, JointId};
use crate::tracking::{Channel, HandEvent, HandEvents, HandTrackingEvents};

/// Collaborators the animator writes to during a frame
pub struct DriveContext<'a, H: Hierarchy> {
    pub hierarchy: &'a mut H,
    pub engine: &'a mut dyn ProceduralAnimation,
    /// World pose of the tracking/controller source this frame
    pub source_pose: Pose,
}

/// Per-hand animator state
#[derive(Debug, Clone)]
pub struct HandAnimator<N> {
    handedness: Handedness,
    alignment: RootAlignment,
    root: Option<N>,
    bindings: Vec<JointBinding<N>>,
    table: JointIndexTable<N>,
    buffer: Option<LocalPoseBuffer>,
    arbiter: Arbiter,
    blend: BlendState,
    visible: bool,
}

impl<N: Copy + Eq + std::fmt::Debug> HandAnimator<N> {
    pub fn new(config: &HandRigConfig) -> Self {
        Self {
            handedness: config.hand.handedness,
            alignment: config.alignment,
            root: None,
            bindings: Vec::new(),
            table: JointIndexTable::new(),
            buffer: None,
            arbiter: Arbiter::new(),
            blend: BlendState::new(&config.animation.fingers, config.animation.speed),
            visible: true,
        }
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn mode(&self) -> DriveMode {
        self.arbiter.mode()
    }

    /// Whether the hand mesh should be shown (hand or controller tracked)
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_active(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn root(&self) -> Option<N> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<N>) {
        self.root = root;
    }

    pub fn alignment(&self) -> &RootAlignment {
        &self.alignment
    }

    pub fn blend(&self) -> &BlendState {
        &self.blend
    }

    pub fn bindings(&self) -> &[JointBinding<N>] {
        &self.bindings
    }

    pub fn table(&self) -> &JointIndexTable<N> {
        &self.table
    }

    /// Replace every binding and rebuild the index table
    pub fn set_bindings(&mut self, bindings: Vec<JointBinding<N>>) {
        self.table = JointIndexTable::bind(&bindings);
        self.bindings = bindings;
        debug!(bound = self.table.len(), "Joint index table rebuilt");
    }

    /// Rebuild the index table from the current binding list
    pub fn bind(&mut self) {
        self.table = JointIndexTable::bind(&self.bindings);
    }

    /// Discover bindings below the root node, replacing the current ones
    ///
    /// Returns the names of joints that could not be found.
    pub fn find_joints_from_root<H: Hierarchy<Node = N>>(&mut self, hierarchy: &H) -> Vec<String> {
        self.bindings.clear();
        let Some(root) = self.root else {
            warn!(hand = %self.handedness, "Cannot discover joints without a root node");
            self.bind();
            return vec![JointId::Wrist.name().to_string()];
        };

        let Discovery { bindings, missing } = discover(hierarchy, root);
        self.bindings.extend(bindings);
        self.bind();
        info!(
            hand = %self.handedness,
            bound = self.table.len(),
            missing = missing.len(),
            "Discovered joints from rig root"
        );
        if !missing.is_empty() {
            warn!(
                hand = %self.handedness,
                missing = %missing.join(", "),
                "Some joints could not be located in the rig hierarchy"
            );
        }
        missing
    }

    /// Rig root pose used while procedural animation drives the hand
    pub fn fallback_root_pose(&self, source_pose: &Pose) -> Pose {
        self.alignment.align(source_pose)
    }

    /// Allocate frame buffers and start listening to the tracking source
    ///
    /// Without a source the animator stays procedural for its whole
    /// active lifetime.
    pub fn activate<H: Hierarchy<Node = N>>(
        &mut self,
        events: Option<&mut dyn HandEvents>,
        ctx: &mut DriveContext<'_, H>,
    ) {
        self.buffer = Some(LocalPoseBuffer::new());
        if !self.table.is_present(JointId::Wrist.index()) {
            warn!(
                hand = %self.handedness,
                "Wrist is not bound, tracked joint poses will not be applied"
            );
        }

        let Some(events) = events else {
            warn!(
                hand = %self.handedness,
                "No hand tracking events provider, using procedural animation only"
            );
            self.enter_procedural(ctx);
            return;
        };

        events.subscribe(Channel::HandTrackingChanged);
        events.subscribe(Channel::TrackingChanged);
        let tracked = events.is_hand_tracked();
        self.on_hand_tracking_changed(tracked, events, ctx);
        // A previous activation may have left the engine disabled
        if self.arbiter.mode() == DriveMode::Procedural {
            self.enter_procedural(ctx);
        }
    }

    /// Release frame buffers and drop every subscription
    pub fn deactivate(&mut self, events: Option<&mut dyn HandEvents>) {
        self.buffer = None;
        if let Some(events) = events {
            for channel in events.subscriptions().iter() {
                events.unsubscribe(channel);
            }
        }
        self.arbiter.reset();
    }

    /// React to one tracking event
    pub fn handle_event<H: Hierarchy<Node = N>>(
        &mut self,
        event: &HandEvent,
        events: &mut dyn HandEvents,
        ctx: &mut DriveContext<'_, H>,
    ) {
        match event {
            HandEvent::HandTrackingChanged(tracked) => {
                self.on_hand_tracking_changed(*tracked, events, ctx);
            }
            HandEvent::TrackingChanged(tracked) => {
                self.visible = *tracked;
            }
            HandEvent::JointsUpdated(snapshot) => {
                self.on_joints_updated(snapshot, ctx.hierarchy);
            }
            HandEvent::RootPoseUpdated(pose) => {
                self.on_root_pose_updated(pose, ctx.hierarchy);
            }
        }
    }

    /// Deliver every event queued on a tracking source
    pub fn pump<H: Hierarchy<Node = N>>(
        &mut self,
        source: &mut HandTrackingEvents,
        ctx: &mut DriveContext<'_, H>,
    ) {
        while let Some(event) = source.pop() {
            self.handle_event(&event, source, ctx);
        }
    }

    fn on_hand_tracking_changed<H: Hierarchy<Node = N>>(
        &mut self,
        tracked: bool,
        events: &mut dyn HandEvents,
        ctx: &mut DriveContext<'_, H>,
    ) {
        match self.arbiter.on_hand_tracking_changed(tracked, events) {
            Some(Transition::EnteredTrackedPose) => {
                ctx.engine.set_enabled(false);
                info!(hand = %self.handedness, "Driving hand from tracked joints");
            }
            Some(Transition::EnteredProcedural) => {
                self.enter_procedural(ctx);
                info!(hand = %self.handedness, "Driving hand from procedural animation");
            }
            None => {}
        }
    }

    fn on_joints_updated<H: Hierarchy<Node = N>>(&mut self, snapshot: &HandSnapshot, hierarchy: &mut H) {
        if !self.arbiter.is_tracked_pose() {
            return;
        }
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        compute_local_poses(snapshot, buffer);
        apply_local_poses(&self.table, buffer, hierarchy);
    }

    fn on_root_pose_updated<H: Hierarchy<Node = N>>(&mut self, pose: &Pose, hierarchy: &mut H) {
        if !self.arbiter.is_tracked_pose() {
            return;
        }
        if let Some(root) = self.root {
            hierarchy.set_local_pose(root, *pose);
        }
    }

    fn enter_procedural<H: Hierarchy<Node = N>>(&self, ctx: &mut DriveContext<'_, H>) {
        self.align_root(ctx);
        ctx.engine.set_enabled(true);
    }

    fn align_root<H: Hierarchy<Node = N>>(&self, ctx: &mut DriveContext<'_, H>) {
        if let Some(root) = self.root {
            let pose = self.fallback_root_pose(&ctx.source_pose);
            ctx.hierarchy.set_world_pose(root, pose);
        }
    }

    /// Advance finger blends and, while procedural, pose the root
    ///
    /// Blends advance in every mode; the engine only receives values while
    /// procedural animation is in charge.
    pub fn tick<H: Hierarchy<Node = N>>(
        &mut self,
        dt: f32,
        input: &dyn InputSource,
        ctx: &mut DriveContext<'_, H>,
    ) {
        if self.arbiter.mode() == DriveMode::Procedural {
            self.blend.advance(input, dt, Some(&mut *ctx.engine));
            self.align_root(ctx);
        } else {
            self.blend.advance(input, dt, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{NodeArena, NodeId};
    use crate::input::{ControllerInput, InputAction};
    use crate::procedural::ParameterTable;
    use crate::skeleton::{FingerId, JOINT_COUNT};
    use crate::tracking::{UpdateFlags, UpdateType, UpdateTypes};
    use glam::{Quat, Vec3};

    struct Rig {
        arena: NodeArena,
        root: NodeId,
    }

    fn rig() -> Rig {
        let mut arena = NodeArena::new();
        let root = arena.add("XR_RightHand", None);
        let wrist = arena.add("R_Wrist", Some(root));
        arena.add("R_Palm", Some(wrist));
        for finger in FingerId::ALL {
            let mut parent = wrist;
            for joint in finger.chain() {
                parent = arena.add(&format!("R_{}", joint.name()), Some(parent));
            }
        }
        Rig { arena, root }
    }

    fn config() -> HandRigConfig {
        let mut config = HandRigConfig::default();
        config.alignment = RootAlignment::with_offset(Vec3::new(0.0, 0.0, -0.05), Vec3::new(0.0, 0.0, 90.0));
        config
    }

    fn tracked_frame() -> HandSnapshot {
        let mut snapshot = HandSnapshot::new();
        for (i, joint) in JointId::ALL.iter().enumerate() {
            let f = i as f32;
            snapshot.set_joint(
                *joint,
                Pose::new(Vec3::new(f * 0.01, 1.0, f * 0.02), Quat::from_rotation_x(f * 0.05)),
            );
        }
        snapshot.root_pose = Some(Pose::from_position(Vec3::new(0.2, 1.2, 0.3)));
        snapshot
    }

    fn setup() -> (Rig, HandAnimator<NodeId>, HandTrackingEvents, ParameterTable) {
        let rig = rig();
        let mut animator = HandAnimator::new(&config());
        animator.set_root(Some(rig.root));
        let missing = animator.find_joints_from_root(&rig.arena);
        assert!(missing.is_empty(), "missing: {missing:?}");
        let source = HandTrackingEvents::new(Handedness::Right, UpdateTypes::default());
        (rig, animator, source, ParameterTable::new())
    }

    #[test]
    fn test_discovery_through_animator() {
        let (rig, animator, _, _) = setup();
        assert_eq!(animator.table().len(), JOINT_COUNT);
        assert_eq!(animator.bindings().len(), JOINT_COUNT);
        let wrist = animator.table().get(JointId::Wrist).unwrap();
        assert_eq!(rig.arena.name(wrist), "R_Wrist");
    }

    #[test]
    fn test_find_without_root() {
        let rig = rig();
        let mut animator: HandAnimator<NodeId> = HandAnimator::new(&config());
        animator.set_bindings(vec![JointBinding::new(JointId::Palm, NodeId(2))]);
        let missing = animator.find_joints_from_root(&rig.arena);
        assert_eq!(missing, vec!["Wrist".to_string()]);
        assert!(animator.table().is_empty());
    }

    #[test]
    fn test_activate_without_source_stays_procedural() {
        let (mut rig, mut animator, _, mut engine) = setup();
        let source_pose = Pose::from_position(Vec3::new(1.0, 1.0, 1.0));
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose,
        };
        animator.activate(None, &mut ctx);
        assert!(animator.is_active());
        assert_eq!(animator.mode(), DriveMode::Procedural);

        let input = ControllerInput::new().with(InputAction::GripPress, 1.0);
        animator.tick(0.1, &input, &mut ctx);
        assert_eq!(engine.get(FingerId::Ring), Some(0.5));

        let expected = animator.fallback_root_pose(&source_pose);
        assert!(rig.arena.world_pose(rig.root).abs_diff_eq(&expected, 1e-6));
    }

    #[test]
    fn test_activate_with_tracked_hand() {
        let (mut rig, mut animator, mut source, mut engine) = setup();
        source.on_tracking_acquired(Handedness::Right);
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose: Pose::IDENTITY,
        };
        animator.activate(Some(&mut source), &mut ctx);

        assert_eq!(animator.mode(), DriveMode::TrackedPose);
        assert!(!engine.is_enabled());
        assert!(source.subscriptions().contains(Channel::JointsUpdated));

        animator.deactivate(Some(&mut source));
        assert!(!animator.is_active());
        assert!(source.subscriptions().is_empty());
        assert_eq!(animator.mode(), DriveMode::Procedural);
    }

    #[test]
    fn test_tracked_frame_poses_rig() {
        let (mut rig, mut animator, mut source, mut engine) = setup();
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose: Pose::IDENTITY,
        };
        animator.activate(Some(&mut source), &mut ctx);
        source.on_tracking_acquired(Handedness::Right);
        animator.pump(&mut source, &mut ctx);
        assert_eq!(animator.mode(), DriveMode::TrackedPose);

        let frame = tracked_frame();
        source.on_hands_updated(UpdateFlags::all(), UpdateType::Dynamic, &HandSnapshot::new(), &frame);
        animator.pump(&mut source, &mut ctx);

        let wrist = animator.table().get(JointId::Wrist).unwrap();
        assert_eq!(rig.arena.local_pose(wrist), frame.joint(JointId::Wrist).unwrap());
        assert_eq!(rig.arena.local_pose(rig.root), frame.root_pose.unwrap());

        // Blends keep advancing, but the engine is left alone
        let writes = engine.writes();
        let input = ControllerInput::new().with(InputAction::TriggerPress, 1.0);
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose: Pose::IDENTITY,
        };
        animator.tick(0.1, &input, &mut ctx);
        assert_eq!(engine.writes(), writes);
        assert_eq!(animator.blend().group(crate::blend::BlendGroup::Trigger)[0].current, 0.5);
    }

    #[test]
    fn test_tracking_lost_falls_back() {
        let (mut rig, mut animator, mut source, mut engine) = setup();
        let source_pose = Pose::new(Vec3::new(0.5, 1.5, -0.2), Quat::from_rotation_y(0.6));
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose,
        };
        animator.activate(Some(&mut source), &mut ctx);
        source.on_tracking_acquired(Handedness::Right);
        animator.pump(&mut source, &mut ctx);

        source.on_tracking_lost(Handedness::Right);
        animator.pump(&mut source, &mut ctx);
        assert_eq!(animator.mode(), DriveMode::Procedural);
        assert!(ctx.engine.is_enabled());
        let expected = animator.fallback_root_pose(&source_pose);
        assert!(rig.arena.world_pose(rig.root).abs_diff_eq(&expected, 1e-6));
        assert!(!source.subscriptions().contains(Channel::JointsUpdated));

        // Joint updates are ignored until tracking is acquired again
        let wrist = animator.table().get(JointId::Wrist).unwrap();
        let before = rig.arena.local_pose(wrist);
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose,
        };
        source.on_hands_updated(UpdateFlags::all(), UpdateType::Dynamic, &HandSnapshot::new(), &tracked_frame());
        assert_eq!(source.pending(), 0);
        animator.handle_event(&HandEvent::JointsUpdated(tracked_frame()), &mut source, &mut ctx);
        animator.handle_event(&HandEvent::RootPoseUpdated(Pose::IDENTITY), &mut source, &mut ctx);
        assert_eq!(rig.arena.local_pose(wrist), before);
        assert!(rig.arena.world_pose(rig.root).abs_diff_eq(&expected, 1e-6));
    }

    #[test]
    fn test_reactivate_after_tracked_session() {
        let (mut rig, mut animator, mut source, mut engine) = setup();
        let source_pose = Pose::new(Vec3::new(-0.3, 1.1, 0.4), Quat::from_rotation_z(0.3));
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose,
        };
        source.on_tracking_acquired(Handedness::Right);
        animator.activate(Some(&mut source), &mut ctx);
        assert_eq!(animator.mode(), DriveMode::TrackedPose);
        assert!(!ctx.engine.is_enabled());

        animator.deactivate(Some(&mut source));
        assert!(!animator.is_active());
        assert!(source.subscriptions().is_empty());

        // Lost while inactive: nothing is queued, activation must catch up
        source.on_tracking_lost(Handedness::Right);
        assert_eq!(source.pending(), 0);
        animator.activate(Some(&mut source), &mut ctx);

        assert!(animator.is_active());
        assert_eq!(animator.mode(), DriveMode::Procedural);
        assert!(ctx.engine.is_enabled());
        assert!(!source.subscriptions().contains(Channel::JointsUpdated));
        let expected = animator.fallback_root_pose(&source_pose);
        assert!(rig.arena.world_pose(rig.root).abs_diff_eq(&expected, 1e-6));
    }

    #[test]
    fn test_visibility_follows_combined_tracking() {
        let (mut rig, mut animator, mut source, mut engine) = setup();
        let mut ctx = DriveContext {
            hierarchy: &mut rig.arena,
            engine: &mut engine,
            source_pose: Pose::IDENTITY,
        };
        animator.activate(Some(&mut source), &mut ctx);

        source.update_controller(true);
        animator.pump(&mut source, &mut ctx);
        assert!(animator.is_visible());

        source.update_controller(false);
        animator.pump(&mut source, &mut ctx);
        assert!(!animator.is_visible());
        assert_eq!(animator.mode(), DriveMode::Procedural);
    }
}
