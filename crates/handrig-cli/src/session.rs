//! Recorded tracking sessions and their replay against a rig

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use handrig_core::{
    ControllerInput, DriveContext, DriveMode, FingerId, HandAnimator, HandEvents, HandSnapshot,
    HandTrackingEvents, Handedness, InputAction, NodeArena, NodeId, ParameterTable, Pose,
    UpdateFlags, UpdateType, UpdateTypes,
};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse session: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Platform callback captured in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingInput {
    TrackingAcquired {
        hand: Handedness,
    },
    TrackingLost {
        hand: Handedness,
    },
    HandsUpdated {
        #[serde(default = "UpdateFlags::all")]
        flags: UpdateFlags,
        #[serde(default = "default_update_type")]
        update_type: UpdateType,
        #[serde(default)]
        left: HandSnapshot,
        #[serde(default)]
        right: HandSnapshot,
    },
}

fn default_update_type() -> UpdateType {
    UpdateType::Dynamic
}

fn default_dt() -> f32 {
    1.0 / 72.0
}

/// One recorded frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFrame {
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// World pose of the controller device
    #[serde(default)]
    pub source_pose: Pose,
    #[serde(default)]
    pub controller_tracked: bool,
    #[serde(default)]
    pub input: HashMap<InputAction, f32>,
    #[serde(default)]
    pub events: Vec<TrackingInput>,
}

impl SessionFrame {
    fn controller_input(&self) -> ControllerInput {
        let mut input = ControllerInput::new();
        for (action, value) in &self.input {
            input.set(*action, *value);
        }
        input
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub frames: Vec<SessionFrame>,
}

impl Session {
    pub fn from_file(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)?;
        let session = Self::from_json(&content)?;
        info!(path = %path.display(), frames = session.frames.len(), "Loaded session");
        Ok(session)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// State of the hand after a replayed frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: usize,
    pub mode: DriveMode,
    pub visible: bool,
    pub root: Option<Pose>,
    /// Joints carried by the latest hand data, zero while untracked
    pub tracked_joints: usize,
    pub curls: Vec<(FingerId, f32)>,
}

fn feed(source: &mut HandTrackingEvents, input: &TrackingInput) {
    match input {
        TrackingInput::TrackingAcquired { hand } => source.on_tracking_acquired(*hand),
        TrackingInput::TrackingLost { hand } => source.on_tracking_lost(*hand),
        TrackingInput::HandsUpdated {
            flags,
            update_type,
            left,
            right,
        } => source.on_hands_updated(*flags, *update_type, left, right),
    }
}

/// Replay a session through an already bound animator
pub fn replay(
    session: &Session,
    update_types: UpdateTypes,
    arena: &mut NodeArena,
    animator: &mut HandAnimator<NodeId>,
) -> Vec<FrameReport> {
    let mut source = HandTrackingEvents::new(animator.handedness(), update_types);
    let mut engine = ParameterTable::new();

    let initial_pose = session
        .frames
        .first()
        .map(|frame| frame.source_pose)
        .unwrap_or_default();
    let mut ctx = DriveContext {
        hierarchy: &mut *arena,
        engine: &mut engine,
        source_pose: initial_pose,
    };
    animator.activate(Some(&mut source), &mut ctx);

    let mut reports = Vec::with_capacity(session.frames.len());
    for (index, frame) in session.frames.iter().enumerate() {
        for input in &frame.events {
            feed(&mut source, input);
            source.update_controller(frame.controller_tracked);
            let source_pose = source.controller_pose(frame.source_pose);
            let mut ctx = DriveContext {
                hierarchy: &mut *arena,
                engine: &mut engine,
                source_pose,
            };
            animator.pump(&mut source, &mut ctx);
        }

        source.update_controller(frame.controller_tracked);
        let source_pose = source.controller_pose(frame.source_pose);
        let mut ctx = DriveContext {
            hierarchy: &mut *arena,
            engine: &mut engine,
            source_pose,
        };
        animator.pump(&mut source, &mut ctx);
        animator.tick(frame.dt, &frame.controller_input(), &mut ctx);

        let report = FrameReport {
            frame: index,
            mode: animator.mode(),
            visible: animator.is_visible(),
            root: animator.root().map(|root| arena.world_pose(root)),
            tracked_joints: if source.is_hand_tracked() {
                source.hand().tracked_count()
            } else {
                0
            },
            curls: FingerId::ALL
                .iter()
                .map(|finger| (*finger, engine.get(*finger).unwrap_or(0.0)))
                .collect(),
        };
        debug!(frame = index, mode = %report.mode, "Replayed frame");
        reports.push(report);
    }

    animator.deactivate(Some(&mut source));
    reports
}
