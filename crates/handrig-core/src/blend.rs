//! Smoothed per-finger blend values for the procedural fallback

use serde::{Deserialize, Serialize};

use crate::input::{InputAction, InputSource};
use crate::procedural::ProceduralAnimation;
use crate::skeleton::{FingerId, FingerSet};

/// Thumb target while any thumb surface is touched but nothing is clicked
pub const THUMB_TOUCH_VALUE: f32 = 0.4;

/// Move `current` towards `target` by at most `max_delta`
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

/// Current and target value of one finger's blend parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerBlend {
    pub finger: FingerId,
    pub current: f32,
    pub target: f32,
}

impl FingerBlend {
    pub fn new(finger: FingerId) -> Self {
        Self {
            finger,
            current: 0.0,
            target: 0.0,
        }
    }

    /// Set the target and take one bounded step towards it
    pub fn advance(&mut self, target: f32, max_delta: f32) -> f32 {
        self.target = target.clamp(0.0, 1.0);
        self.current = move_towards(self.current, self.target, max_delta);
        self.current
    }
}

/// Which input drives a group of fingers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendGroup {
    Grip,
    Trigger,
    Thumb,
}

impl BlendGroup {
    /// Evaluation order; later groups overwrite shared fingers
    pub const ALL: [BlendGroup; 3] = [Self::Grip, Self::Trigger, Self::Thumb];

    /// Target value for this group from the current controller state
    pub fn target(self, input: &dyn InputSource) -> f32 {
        match self {
            Self::Grip => input.value(InputAction::GripPress),
            Self::Trigger => input.value(InputAction::TriggerPress),
            Self::Thumb => {
                let clicked = input.is_performed(InputAction::PrimaryClick)
                    || input.is_performed(InputAction::SecondaryClick);
                let touched = [
                    InputAction::PrimaryTouch,
                    InputAction::SecondaryTouch,
                    InputAction::ThumbstickTouch,
                ]
                .into_iter()
                .any(|action| input.value(action) != 0.0);

                if clicked {
                    1.0
                } else if touched {
                    THUMB_TOUCH_VALUE
                } else {
                    0.0
                }
            }
        }
    }
}

/// Finger assignment for each blend group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerGroups {
    #[serde(default = "default_grip")]
    pub grip: FingerSet,
    #[serde(default = "default_trigger")]
    pub trigger: FingerSet,
    #[serde(default = "default_thumb")]
    pub thumb: FingerSet,
}

impl Default for FingerGroups {
    fn default() -> Self {
        Self {
            grip: default_grip(),
            trigger: default_trigger(),
            thumb: default_thumb(),
        }
    }
}

fn default_grip() -> FingerSet {
    [FingerId::Middle, FingerId::Ring, FingerId::Little]
        .into_iter()
        .collect()
}

fn default_trigger() -> FingerSet {
    [FingerId::Index].into_iter().collect()
}

fn default_thumb() -> FingerSet {
    [FingerId::Thumb].into_iter().collect()
}

impl FingerGroups {
    pub fn fingers(&self, group: BlendGroup) -> FingerSet {
        match group {
            BlendGroup::Grip => self.grip,
            BlendGroup::Trigger => self.trigger,
            BlendGroup::Thumb => self.thumb,
        }
    }
}

/// Blend state for every configured group
///
/// A finger listed in several groups gets one blend per group; each writes
/// the same engine parameter, the last group in [`BlendGroup::ALL`] order wins.
#[derive(Debug, Clone)]
pub struct BlendState {
    groups: Vec<(BlendGroup, Vec<FingerBlend>)>,
    speed: f32,
}

impl BlendState {
    pub fn new(groups: &FingerGroups, speed: f32) -> Self {
        Self {
            groups: BlendGroup::ALL
                .into_iter()
                .map(|group| {
                    let blends = groups.fingers(group).iter().map(FingerBlend::new).collect();
                    (group, blends)
                })
                .collect(),
            speed,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Blends of one group
    pub fn group(&self, group: BlendGroup) -> &[FingerBlend] {
        self.groups
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, blends)| blends.as_slice())
            .unwrap_or(&[])
    }

    /// Sample input and step every blend towards its target
    ///
    /// When `engine` is given, advanced values are written into it.
    pub fn advance(
        &mut self,
        input: &dyn InputSource,
        dt: f32,
        mut engine: Option<&mut dyn ProceduralAnimation>,
    ) {
        let max_delta = self.speed * dt.max(0.0);
        for (group, blends) in &mut self.groups {
            let target = group.target(input);
            for blend in blends.iter_mut() {
                let value = blend.advance(target, max_delta);
                if let Some(engine) = engine.as_deref_mut() {
                    engine.set_parameter(blend.finger, value);
                }
            }
        }
    }
}
