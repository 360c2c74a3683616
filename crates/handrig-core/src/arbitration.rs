//! Drive-mode arbitration between tracked poses and procedural animation
//!
//! Subscriptions to per-frame joint and root updates exist only while the
//! arbiter is in [`DriveMode::TrackedPose`]; they are added and removed as
//! part of the transition itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::tracking::{Channel, HandEvents};

/// What currently poses the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Joints follow live hand tracking
    TrackedPose,
    /// Joints follow the procedural animation engine
    #[default]
    Procedural,
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackedPose => f.write_str("tracked-pose"),
            Self::Procedural => f.write_str("procedural"),
        }
    }
}

/// A completed mode change; the caller performs its side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Disable procedural evaluation
    EnteredTrackedPose,
    /// Snap the root to the fallback alignment, enable procedural evaluation
    EnteredProcedural,
}

const TRACKED_CHANNELS: [Channel; 2] = [Channel::JointsUpdated, Channel::RootPoseUpdated];

/// Two-state drive mode machine
#[derive(Debug, Clone, Default)]
pub struct Arbiter {
    mode: DriveMode,
}

impl Arbiter {
    pub fn new() -> Self {
        Self {
            mode: DriveMode::Procedural,
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn is_tracked_pose(&self) -> bool {
        self.mode == DriveMode::TrackedPose
    }

    /// React to hand tracking gained or lost
    ///
    /// Redundant signals return `None` and leave subscriptions untouched.
    pub fn on_hand_tracking_changed(
        &mut self,
        tracked: bool,
        events: &mut dyn HandEvents,
    ) -> Option<Transition> {
        match (self.mode, tracked) {
            (DriveMode::Procedural, true) => {
                self.mode = DriveMode::TrackedPose;
                for channel in TRACKED_CHANNELS {
                    events.subscribe(channel);
                }
                debug!(mode = %self.mode, "Drive mode changed");
                Some(Transition::EnteredTrackedPose)
            }
            (DriveMode::TrackedPose, false) => {
                self.mode = DriveMode::Procedural;
                for channel in TRACKED_CHANNELS {
                    events.unsubscribe(channel);
                }
                debug!(mode = %self.mode, "Drive mode changed");
                Some(Transition::EnteredProcedural)
            }
            _ => None,
        }
    }

    /// Drop back to procedural without side effects on the source
    ///
    /// Used when the source itself goes away.
    pub fn reset(&mut self) {
        self.mode = DriveMode::Procedural;
    }
}
