//! Fixed hand skeleton topology
//!
//! The joint set follows the OpenXR hand tracking layout: wrist, palm, then
//! every finger's chain ordered root-to-tip. The thumb has no intermediate
//! joint, every other finger has five joints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Total number of joints per hand
pub const JOINT_COUNT: usize = 26;

/// Number of fingers per hand
pub const FINGER_COUNT: usize = 5;

/// A joint of the tracked hand skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JointId {
    Wrist,
    Palm,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

impl JointId {
    /// All joints in index order
    pub const ALL: [JointId; JOINT_COUNT] = [
        Self::Wrist,
        Self::Palm,
        Self::ThumbMetacarpal,
        Self::ThumbProximal,
        Self::ThumbDistal,
        Self::ThumbTip,
        Self::IndexMetacarpal,
        Self::IndexProximal,
        Self::IndexIntermediate,
        Self::IndexDistal,
        Self::IndexTip,
        Self::MiddleMetacarpal,
        Self::MiddleProximal,
        Self::MiddleIntermediate,
        Self::MiddleDistal,
        Self::MiddleTip,
        Self::RingMetacarpal,
        Self::RingProximal,
        Self::RingIntermediate,
        Self::RingDistal,
        Self::RingTip,
        Self::LittleMetacarpal,
        Self::LittleProximal,
        Self::LittleIntermediate,
        Self::LittleDistal,
        Self::LittleTip,
    ];

    /// Dense index in `[0, JOINT_COUNT)`
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`JointId::index`]
    pub fn from_index(index: usize) -> Option<JointId> {
        Self::ALL.get(index).copied()
    }

    /// Canonical identifier, used for rig name matching and missing-joint reports
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wrist => "Wrist",
            Self::Palm => "Palm",
            Self::ThumbMetacarpal => "ThumbMetacarpal",
            Self::ThumbProximal => "ThumbProximal",
            Self::ThumbDistal => "ThumbDistal",
            Self::ThumbTip => "ThumbTip",
            Self::IndexMetacarpal => "IndexMetacarpal",
            Self::IndexProximal => "IndexProximal",
            Self::IndexIntermediate => "IndexIntermediate",
            Self::IndexDistal => "IndexDistal",
            Self::IndexTip => "IndexTip",
            Self::MiddleMetacarpal => "MiddleMetacarpal",
            Self::MiddleProximal => "MiddleProximal",
            Self::MiddleIntermediate => "MiddleIntermediate",
            Self::MiddleDistal => "MiddleDistal",
            Self::MiddleTip => "MiddleTip",
            Self::RingMetacarpal => "RingMetacarpal",
            Self::RingProximal => "RingProximal",
            Self::RingIntermediate => "RingIntermediate",
            Self::RingDistal => "RingDistal",
            Self::RingTip => "RingTip",
            Self::LittleMetacarpal => "LittleMetacarpal",
            Self::LittleProximal => "LittleProximal",
            Self::LittleIntermediate => "LittleIntermediate",
            Self::LittleDistal => "LittleDistal",
            Self::LittleTip => "LittleTip",
        }
    }

    /// Look up a joint by its canonical identifier (case-insensitive)
    pub fn from_name(name: &str) -> Option<JointId> {
        Self::ALL
            .iter()
            .copied()
            .find(|joint| joint.name().eq_ignore_ascii_case(name))
    }

    /// The finger whose chain contains this joint, if any
    pub fn finger(self) -> Option<FingerId> {
        let index = self.index();
        FingerId::ALL.iter().copied().find(|finger| {
            let (front, back) = finger.chain_range();
            (front..=back).contains(&index)
        })
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finger of the hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerId {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl FingerId {
    /// All fingers, thumb first
    pub const ALL: [FingerId; FINGER_COUNT] = [
        Self::Thumb,
        Self::Index,
        Self::Middle,
        Self::Ring,
        Self::Little,
    ];

    /// First joint of the chain (closest to the wrist)
    pub const fn front_joint(self) -> JointId {
        match self {
            Self::Thumb => JointId::ThumbMetacarpal,
            Self::Index => JointId::IndexMetacarpal,
            Self::Middle => JointId::MiddleMetacarpal,
            Self::Ring => JointId::RingMetacarpal,
            Self::Little => JointId::LittleMetacarpal,
        }
    }

    /// Last joint of the chain (the tip)
    pub const fn back_joint(self) -> JointId {
        match self {
            Self::Thumb => JointId::ThumbTip,
            Self::Index => JointId::IndexTip,
            Self::Middle => JointId::MiddleTip,
            Self::Ring => JointId::RingTip,
            Self::Little => JointId::LittleTip,
        }
    }

    /// Closed index range `[front, back]` of the kinematic chain
    pub const fn chain_range(self) -> (usize, usize) {
        (self.front_joint().index(), self.back_joint().index())
    }

    /// Joints of the chain, root to tip
    pub fn chain(self) -> impl Iterator<Item = JointId> {
        let (front, back) = self.chain_range();
        (front..=back).filter_map(JointId::from_index)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Thumb => "Thumb",
            Self::Index => "Index",
            Self::Middle => "Middle",
            Self::Ring => "Ring",
            Self::Little => "Little",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for FingerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of fingers, stored as a bitmask
///
/// Serialized as a list of finger names so configuration files read
/// `grip = ["Middle", "Ring", "Little"]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<FingerId>", into = "Vec<FingerId>")]
pub struct FingerSet(u8);

impl FingerSet {
    pub const EMPTY: FingerSet = FingerSet(0);

    pub fn all() -> Self {
        FingerId::ALL.iter().copied().collect()
    }

    pub fn contains(self, finger: FingerId) -> bool {
        self.0 & finger.bit() != 0
    }

    pub fn insert(&mut self, finger: FingerId) {
        self.0 |= finger.bit();
    }

    pub fn remove(&mut self, finger: FingerId) {
        self.0 &= !finger.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in thumb-to-little order
    pub fn iter(self) -> impl Iterator<Item = FingerId> {
        FingerId::ALL
            .into_iter()
            .filter(move |finger| self.contains(*finger))
    }
}

impl FromIterator<FingerId> for FingerSet {
    fn from_iter<T: IntoIterator<Item = FingerId>>(iter: T) -> Self {
        let mut set = FingerSet::EMPTY;
        for finger in iter {
            set.insert(finger);
        }
        set
    }
}

impl From<Vec<FingerId>> for FingerSet {
    fn from(fingers: Vec<FingerId>) -> Self {
        fingers.into_iter().collect()
    }
}

impl From<FingerSet> for Vec<FingerId> {
    fn from(set: FingerSet) -> Self {
        set.iter().collect()
    }
}

/// Which physical hand an instance consumes data for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    #[default]
    Invalid,
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
