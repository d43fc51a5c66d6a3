//! Host-facing options for one hero instance.

use std::collections::BTreeMap;

use foundation::Rgb;
use runtime::AnimationProfile;
use scene::{DEFAULT_STEP_DEG, GeographySampler, GlobeStyle};
use serde::{Deserialize, Serialize};

use crate::error::HeroError;

pub const DEFAULT_CANVAS_ID: &str = "hero-globe";
pub const DEFAULT_FOCUS_REGION: &str = "north_america";

fn continent_tints() -> BTreeMap<String, Rgb> {
    [
        ("north_america", 0x60A5FA),
        ("south_america", 0x34D399),
        ("europe", 0xF59E0B),
        ("africa", 0xEF4444),
        ("asia", 0x8B5CF6),
        ("australia", 0x06B6D4),
    ]
    .into_iter()
    .map(|(id, hex)| (id.to_string(), Rgb::from_hex(hex)))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Rgb,
    pub ocean: Rgb,
    pub glow: Rgb,
    /// Particle color per region id.
    pub particles: BTreeMap<String, Rgb>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb::from_hex(0x000000),
            ocean: Rgb::from_hex(0x0F172A),
            glow: Rgb::from_hex(0x3B82F6),
            particles: continent_tints(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeroConfig {
    pub canvas_id: String,
    pub globe_radius: f32,
    pub particle_size: f32,
    pub particle_offset: f32,
    /// Grid step in degrees.
    pub sample_step: f64,
    /// Intro length in milliseconds.
    pub animation_duration: f32,
    /// Region the camera turns towards after the intro; `null` disables it.
    pub focus_region: Option<String>,
    pub colors: Palette,
    pub animation: AnimationProfile,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            canvas_id: DEFAULT_CANVAS_ID.to_string(),
            globe_radius: 1.5,
            particle_size: 0.025,
            particle_offset: 0.01,
            sample_step: DEFAULT_STEP_DEG,
            animation_duration: runtime::DEFAULT_DURATION_MS,
            focus_region: Some(DEFAULT_FOCUS_REGION.to_string()),
            colors: Palette::default(),
            animation: AnimationProfile::default(),
        }
    }
}

impl HeroConfig {
    /// Parse a partial JSON override; a blank string means all defaults.
    pub fn from_json(json: &str) -> Result<Self, HeroError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: HeroConfig =
            serde_json::from_str(json).map_err(|e| HeroError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, HeroError> {
        serde_json::to_string_pretty(self).map_err(|e| HeroError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), HeroError> {
        for (name, v) in [
            ("globeRadius", self.globe_radius),
            ("particleSize", self.particle_size),
            ("animationDuration", self.animation_duration),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(HeroError::InvalidConfig(format!(
                    "`{name}` must be a positive number, got {v}"
                )));
            }
        }
        if !(self.particle_offset.is_finite() && self.particle_offset >= 0.0) {
            return Err(HeroError::InvalidConfig(format!(
                "`particleOffset` must not be negative, got {}",
                self.particle_offset
            )));
        }
        if !(self.sample_step.is_finite() && self.sample_step > 0.0) {
            return Err(HeroError::InvalidConfig(format!(
                "`sampleStep` must be a positive number, got {}",
                self.sample_step
            )));
        }
        if self.canvas_id.trim().is_empty() {
            return Err(HeroError::InvalidConfig("`canvasId` is empty".to_string()));
        }
        self.profile().validate()?;
        Ok(())
    }

    /// The animation profile with the configured duration applied.
    pub fn profile(&self) -> AnimationProfile {
        AnimationProfile {
            duration_ms: self.animation_duration,
            ..self.animation.clone()
        }
    }

    pub fn style(&self) -> GlobeStyle {
        GlobeStyle {
            radius: self.globe_radius,
            particle_size: self.particle_size,
            particle_offset: self.particle_offset,
            background: self.colors.background,
            ocean: self.colors.ocean,
            glow: self.colors.glow,
            tints: self.colors.particles.clone(),
            pulse: self.animation.pulse,
        }
    }

    pub fn sampler(&self) -> Result<GeographySampler, HeroError> {
        Ok(GeographySampler::new(self.sample_step)?)
    }
}
