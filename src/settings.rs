//! Simulation settings
//!
//! Stored as JSON. Every field has a default, so a settings file only needs
//! the values it changes.

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::transform::{PolicyConfig, Transform};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quality preset (sets the particle cap)
    pub quality: QualityPreset,
    /// Apply the preset's particle cap
    pub cap_particles: bool,

    // === Physics ===
    /// Constant acceleration applied every tick
    pub gravity: DVec2,
    /// Particles below this y are removed
    pub floor_y: f64,
    /// Use a constant frame delta instead of the wall clock
    pub fixed_dt: Option<f64>,

    // === Spawning ===
    pub life_span: f64,
    /// Chance (0 - 1) that a spawn request is dropped
    pub cull_chance: f64,
    /// Emitter velocity range per axis
    pub spawn_spread: f64,
    /// Seed for the simulation RNG
    pub seed: u64,

    // === Visuals ===
    pub policy: PolicyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            cap_particles: true,

            gravity: DEFAULT_GRAVITY,
            floor_y: DEFAULT_FLOOR_Y,
            fixed_dt: None,

            life_span: DEFAULT_LIFE_SPAN,
            cull_chance: DEFAULT_CULL_CHANCE,
            spawn_spread: DEFAULT_SPAWN_SPREAD,
            seed: 0,

            policy: PolicyConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Switch to the quality preset named `name` (case-insensitive)
    pub fn apply_quality(&mut self, name: &str) -> Result<(), ConfigError> {
        self.quality = QualityPreset::from_str(name).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "unknown quality preset '{}' (expected low, medium or high)",
                name
            ))
        })?;
        Ok(())
    }

    /// Effective particle cap (None = unlimited)
    pub fn max_particles(&self) -> Option<usize> {
        self.cap_particles.then(|| self.quality.max_particles())
    }

    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Reject values the simulation can't use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.cull_chance) {
            return Err(ConfigError::Invalid(format!(
                "cull_chance must be within [0, 1], got {}",
                self.cull_chance
            )));
        }
        if !(self.life_span >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "life_span must be non-negative, got {}",
                self.life_span
            )));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::Invalid("gravity must be finite".to_string()));
        }
        if !(self.spawn_spread.is_finite() && self.spawn_spread >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "spawn_spread must be finite and non-negative, got {}",
                self.spawn_spread
            )));
        }
        if let Some(dt) = self.fixed_dt {
            if !(dt.is_finite() && dt >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "fixed_dt must be finite and non-negative, got {}",
                    dt
                )));
            }
        }
        validate_transforms(&self.policy.transforms)
    }
}

fn validate_transforms(transforms: &[Transform]) -> Result<(), ConfigError> {
    for transform in transforms {
        match transform {
            Transform::ScaleOverLifetime {
                start,
                end,
                granularity,
            } => {
                if !(start.is_finite() && end.is_finite()) {
                    return Err(ConfigError::Invalid(
                        "scale_over_lifetime start/end must be finite".to_string(),
                    ));
                }
                if !(granularity.is_finite() && *granularity > 0.0) {
                    return Err(ConfigError::Invalid(format!(
                        "scale_over_lifetime granularity must be positive, got {}",
                        granularity
                    )));
                }
            }
            Transform::Chain { transforms } => validate_transforms(transforms)?,
            Transform::StretchByVelocity | Transform::RotateByVelocityDirection => {}
        }
    }
    Ok(())
}
