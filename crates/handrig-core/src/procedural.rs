//! Interface to the procedural (keyframed) hand animation engine

use std::collections::HashMap;

use crate::skeleton::FingerId;

/// The animation engine used while hand tracking is unavailable
///
/// Parameters are keyed by finger; the engine maps each to a curl blend.
pub trait ProceduralAnimation {
    /// Enable or disable engine evaluation
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Set a finger's blend parameter
    fn set_parameter(&mut self, finger: FingerId, value: f32);
}

/// Engine stand-in that records the latest parameter values
#[derive(Debug, Clone)]
pub struct ParameterTable {
    enabled: bool,
    values: HashMap<FingerId, f32>,
    writes: usize,
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self {
            enabled: true,
            values: HashMap::new(),
            writes: 0,
        }
    }
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, finger: FingerId) -> Option<f32> {
        self.values.get(&finger).copied()
    }

    /// Total parameter writes received
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ProceduralAnimation for ParameterTable {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_parameter(&mut self, finger: FingerId, value: f32) {
        self.values.insert(finger, value);
        self.writes += 1;
    }
}
