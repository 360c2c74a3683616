//! Hand rig configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::binding::BindingEntry;
use crate::blend::FingerGroups;
use crate::root::RootAlignment;
use crate::skeleton::Handedness;
use crate::tracking::UpdateTypes;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandRigConfig {
    #[serde(default)]
    pub hand: HandConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub alignment: RootAlignment,
    /// Explicit joint bindings; discovery replaces them when enabled
    #[serde(default, rename = "binding")]
    pub bindings: Vec<BindingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandConfig {
    /// Which hand this rig follows
    #[serde(default = "default_handedness")]
    pub handedness: Handedness,
    /// Name of the rig node that discovery starts from
    #[serde(default)]
    pub root: Option<String>,
    /// Discover joint bindings from the rig hierarchy at bind time
    #[serde(default = "default_true")]
    pub auto_discover: bool,
    /// Platform update phases to react to
    #[serde(default)]
    pub update_types: UpdateTypes,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            handedness: default_handedness(),
            root: None,
            auto_discover: true,
            update_types: UpdateTypes::default(),
        }
    }
}

fn default_handedness() -> Handedness {
    Handedness::Right
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Blend units per second for finger parameters
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Finger membership of the grip, trigger and thumb groups
    #[serde(default)]
    pub fingers: FingerGroups,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            fingers: FingerGroups::default(),
        }
    }
}

fn default_speed() -> f32 {
    5.0
}

impl HandRigConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: HandRigConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.animation.speed.is_finite() || self.animation.speed < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "animation.speed must be a non-negative number, got {}",
                self.animation.speed
            )));
        }
        if self.hand.handedness == Handedness::Invalid {
            return Err(ConfigError::ValidationError(
                "hand.handedness must be \"left\" or \"right\"".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<HandRigConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = HandRigConfig::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(HandRigConfig::default())
    }
}

/// Save a default configuration with example bindings to file
pub fn save_default_config(path: &Path) -> Result<(), ConfigError> {
    use crate::binding::JointRef;

    let config = HandRigConfig {
        hand: HandConfig {
            root: Some("R_Hand".to_string()),
            ..HandConfig::default()
        },
        bindings: vec![
            BindingEntry {
                joint: JointRef::Name("Wrist".to_string()),
                node: "R_Wrist".to_string(),
            },
            BindingEntry {
                joint: JointRef::Name("Palm".to_string()),
                node: "R_Palm".to_string(),
            },
        ],
        ..HandRigConfig::default()
    };

    let content = config.to_toml()?;
    std::fs::write(path, content)?;
    Ok(())
}
