//! Controller input actions sampled for the procedural fallback

use serde::{Deserialize, Serialize};

/// Controller actions the animator reads each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    TriggerPress,
    GripPress,
    PrimaryTouch,
    PrimaryClick,
    SecondaryTouch,
    SecondaryClick,
    ThumbstickTouch,
}

impl InputAction {
    pub const ALL: [InputAction; 7] = [
        Self::TriggerPress,
        Self::GripPress,
        Self::PrimaryTouch,
        Self::PrimaryClick,
        Self::SecondaryTouch,
        Self::SecondaryClick,
        Self::ThumbstickTouch,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Synchronous read access to controller actions
pub trait InputSource {
    /// Continuous value in `[0, 1]`
    fn value(&self, action: InputAction) -> f32;

    /// Whether a button action is currently performed
    fn is_performed(&self, action: InputAction) -> bool;
}

/// Plain snapshot of action values
///
/// A value above 0.5 counts as performed, matching how button actions are
/// usually thresholded by input layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerInput {
    values: [f32; 7],
}

impl ControllerInput {
    pub const PRESS_THRESHOLD: f32 = 0.5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: InputAction, value: f32) -> Self {
        self.set(action, value);
        self
    }

    pub fn set(&mut self, action: InputAction, value: f32) {
        // NaN survives clamp
        self.values[action.slot()] = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn press(&mut self, action: InputAction, pressed: bool) {
        self.set(action, if pressed { 1.0 } else { 0.0 });
    }
}

impl InputSource for ControllerInput {
    fn value(&self, action: InputAction) -> f32 {
        self.values[action.slot()]
    }

    fn is_performed(&self, action: InputAction) -> bool {
        self.values[action.slot()] > Self::PRESS_THRESHOLD
    }
}
