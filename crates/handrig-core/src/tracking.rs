//! Hand and controller tracking events
//!
//! A tracking source combines the platform hand-tracking subsystem with a
//! tracked controller on the same side. It reports hand tracking gained or
//! lost, per-frame joint and root pose updates, and a combined "anything
//! tracked" flag used for mesh visibility.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::pipeline::HandSnapshot;
use crate::pose::Pose;
use crate::skeleton::Handedness;

/// Event streams a consumer can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    JointsUpdated,
    RootPoseUpdated,
    HandTrackingChanged,
    TrackingChanged,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Self::JointsUpdated,
        Self::RootPoseUpdated,
        Self::HandTrackingChanged,
        Self::TrackingChanged,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of subscribed channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Subscriptions(u8);

impl Subscriptions {
    pub const NONE: Subscriptions = Subscriptions(0);

    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn insert(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    pub fn remove(&mut self, channel: Channel) {
        self.0 &= !channel.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

/// An event delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HandEvent {
    /// Fresh joint poses for this frame
    JointsUpdated(HandSnapshot),
    /// Fresh hand root pose for this frame
    RootPoseUpdated(Pose),
    /// Hand tracking gained (`true`) or lost (`false`)
    HandTrackingChanged(bool),
    /// Hand or controller tracking, combined
    TrackingChanged(bool),
}

impl HandEvent {
    pub fn channel(&self) -> Channel {
        match self {
            Self::JointsUpdated(_) => Channel::JointsUpdated,
            Self::RootPoseUpdated(_) => Channel::RootPoseUpdated,
            Self::HandTrackingChanged(_) => Channel::HandTrackingChanged,
            Self::TrackingChanged(_) => Channel::TrackingChanged,
        }
    }
}

/// Subscription surface of a tracking source
pub trait HandEvents {
    /// Current hand tracking state
    fn is_hand_tracked(&self) -> bool;

    fn subscribe(&mut self, channel: Channel);

    fn unsubscribe(&mut self, channel: Channel);

    fn subscriptions(&self) -> Subscriptions;
}

/// When in the frame the platform delivered a hand update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Dynamic,
    BeforeRender,
}

/// Update phases a source forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTypes {
    #[serde(default = "default_true")]
    pub dynamic: bool,
    #[serde(default = "default_true")]
    pub before_render: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UpdateTypes {
    fn default() -> Self {
        Self {
            dynamic: true,
            before_render: true,
        }
    }
}

impl UpdateTypes {
    pub fn is_set(&self, update_type: UpdateType) -> bool {
        match update_type {
            UpdateType::Dynamic => self.dynamic,
            UpdateType::BeforeRender => self.before_render,
        }
    }
}

/// Which parts of each hand the platform refreshed in an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFlags {
    #[serde(default)]
    pub left_joints: bool,
    #[serde(default)]
    pub left_root_pose: bool,
    #[serde(default)]
    pub right_joints: bool,
    #[serde(default)]
    pub right_root_pose: bool,
}

impl UpdateFlags {
    pub fn all() -> Self {
        Self {
            left_joints: true,
            left_root_pose: true,
            right_joints: true,
            right_root_pose: true,
        }
    }

    fn for_hand(&self, handedness: Handedness) -> (bool, bool) {
        match handedness {
            Handedness::Left => (self.left_joints, self.left_root_pose),
            Handedness::Right => (self.right_joints, self.right_root_pose),
            Handedness::Invalid => (false, false),
        }
    }
}

/// Reference tracking source for one hand
///
/// Platform callbacks are fed in through the `on_*` methods; resulting
/// events are queued for subscribed channels and drained by the owner
/// within the same frame.
#[derive(Debug, Clone)]
pub struct HandTrackingEvents {
    handedness: Handedness,
    update_types: UpdateTypes,
    hand_tracked: bool,
    tracked: bool,
    hand: HandSnapshot,
    subscriptions: Subscriptions,
    queue: VecDeque<HandEvent>,
}

impl HandTrackingEvents {
    pub fn new(handedness: Handedness, update_types: UpdateTypes) -> Self {
        Self {
            handedness,
            update_types,
            hand_tracked: false,
            tracked: false,
            hand: HandSnapshot::new(),
            subscriptions: Subscriptions::NONE,
            queue: VecDeque::new(),
        }
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Hand or controller tracked
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Latest hand data for this side
    pub fn hand(&self) -> &HandSnapshot {
        &self.hand
    }

    /// Platform reports hand tracking acquired for some hand
    pub fn on_tracking_acquired(&mut self, hand: Handedness) {
        if hand == self.handedness {
            self.set_hand_tracked(true);
        }
    }

    /// Platform reports hand tracking lost for some hand
    pub fn on_tracking_lost(&mut self, hand: Handedness) {
        if hand == self.handedness {
            self.set_hand_tracked(false);
        }
    }

    fn set_hand_tracked(&mut self, tracked: bool) {
        if self.hand_tracked == tracked {
            return;
        }
        self.hand_tracked = tracked;
        info!(
            hand = %self.handedness,
            tracked = tracked,
            "Hand tracking {}",
            if tracked { "acquired" } else { "lost" }
        );
        self.emit(HandEvent::HandTrackingChanged(tracked));
    }

    /// Platform delivered new hand data
    pub fn on_hands_updated(
        &mut self,
        flags: UpdateFlags,
        update_type: UpdateType,
        left: &HandSnapshot,
        right: &HandSnapshot,
    ) {
        if !self.update_types.is_set(update_type) {
            return;
        }

        let hand = match self.handedness {
            Handedness::Left => left,
            Handedness::Right => right,
            Handedness::Invalid => return,
        };
        let (joints_updated, root_updated) = flags.for_hand(self.handedness);

        if joints_updated || root_updated {
            self.hand.clone_from(hand);
        }
        if joints_updated {
            self.emit(HandEvent::JointsUpdated(self.hand.clone()));
        }
        if root_updated {
            if let Some(root) = self.hand.root_pose {
                self.emit(HandEvent::RootPoseUpdated(root));
            }
        }
    }

    /// Controller tracking sampled this frame; recomputes the combined flag
    pub fn update_controller(&mut self, controller_tracked: bool) {
        let tracked = self.hand_tracked || controller_tracked;
        if tracked != self.tracked {
            self.tracked = tracked;
            debug!(hand = %self.handedness, tracked = tracked, "Tracking changed");
            self.emit(HandEvent::TrackingChanged(tracked));
        }
    }

    /// Pose reported for the controller slot: the hand root while hand
    /// tracking is active, the device pose otherwise
    pub fn controller_pose(&self, device_pose: Pose) -> Pose {
        if self.hand_tracked {
            self.hand.root_pose.unwrap_or(device_pose)
        } else {
            device_pose
        }
    }

    fn emit(&mut self, event: HandEvent) {
        if self.subscriptions.contains(event.channel()) {
            self.queue.push_back(event);
        }
    }

    /// Take the next pending event
    pub fn pop(&mut self) -> Option<HandEvent> {
        self.queue.pop_front()
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<HandEvent> {
        self.queue.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl HandEvents for HandTrackingEvents {
    fn is_hand_tracked(&self) -> bool {
        self.hand_tracked
    }

    fn subscribe(&mut self, channel: Channel) {
        self.subscriptions.insert(channel);
    }

    fn unsubscribe(&mut self, channel: Channel) {
        self.subscriptions.remove(channel);
        self.queue.retain(|event| event.channel() != channel);
    }

    fn subscriptions(&self) -> Subscriptions {
        self.subscriptions
    }
}
