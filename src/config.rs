//! Application and vignette tuning configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{VignetteError, VignetteResult};

/// Configuration for the host application.
///
/// Every field has a default, so a JSON file only needs to name what it
/// overrides.
///
/// # Example
///
/// ```
/// use vignette::AppConfig;
///
/// let config = AppConfig::new().title("Verses").seed(7).fade(0.5);
/// assert_eq!(config.seed, 7);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    /// Seed for every random outcome (measurement results, spawn jitter).
    pub seed: u64,
    /// Step used by the headless runner, in seconds.
    pub fixed_dt: f32,
    /// Largest `dt` a single tick will accept; longer stalls are clamped.
    pub max_dt: f32,
    /// Fade-to-black duration for verse navigation. Zero switches instantly.
    pub fade_duration: f32,
    pub vignettes: VignetteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Vignette".to_string(),
            seed: 0x5EED,
            fixed_dt: 1.0 / 60.0,
            max_dt: 0.25,
            fade_duration: 0.0,
            vignettes: VignetteConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fixed_dt(mut self, dt: f32) -> Self {
        self.fixed_dt = dt;
        self
    }

    pub fn fade(mut self, duration: f32) -> Self {
        self.fade_duration = duration;
        self
    }

    pub fn vignettes(mut self, vignettes: VignetteConfig) -> Self {
        self.vignettes = vignettes;
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> VignetteResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    #[tracing::instrument]
    pub fn load(path: &Path) -> VignetteResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> VignetteResult<()> {
        positive("fixed_dt", self.fixed_dt)?;
        positive("max_dt", self.max_dt)?;
        non_negative("fade_duration", self.fade_duration)?;
        self.vignettes.validate()
    }
}

/// Per-vignette tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VignetteConfig {
    /// Live cloud particles allowed in the superposition vignette.
    pub particle_cap: usize,
    /// Expected cloud spawns per second while in superposition.
    pub spawn_rate: f32,
    /// Seconds a cloud particle lives before fading out.
    pub cloud_lifespan: f32,
    /// Number of particle/antiparticle pairs a decay produces.
    pub decay_products: usize,
    /// Delay between staggered decay-product spawns, in seconds.
    pub decay_stagger: f32,
    /// Random lifespan range for decay products.
    pub decay_lifespan: LifespanRange,
    /// Spark cap for the lotus while emanating.
    pub spark_cap: usize,
    pub lotus: LotusPhases,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            particle_cap: 120,
            spawn_rate: 40.0,
            cloud_lifespan: 1.5,
            decay_products: 4,
            decay_stagger: 0.15,
            decay_lifespan: LifespanRange { min: 0.8, max: 2.0 },
            spark_cap: 60,
            lotus: LotusPhases::default(),
        }
    }
}

impl VignetteConfig {
    fn validate(&self) -> VignetteResult<()> {
        non_negative("spawn_rate", self.spawn_rate)?;
        positive("cloud_lifespan", self.cloud_lifespan)?;
        non_negative("decay_stagger", self.decay_stagger)?;
        self.decay_lifespan.validate()?;
        self.lotus.validate()
    }
}

/// Inclusive range a random lifespan is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifespanRange {
    pub min: f32,
    pub max: f32,
}

impl LifespanRange {
    fn validate(&self) -> VignetteResult<()> {
        non_negative("decay_lifespan.min", self.min)?;
        non_negative("decay_lifespan.max", self.max)?;
        if self.min > self.max {
            return Err(VignetteError::config(format!(
                "decay_lifespan.min ({}) exceeds max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Phase durations of the lotus loop, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotusPhases {
    pub closed: f32,
    pub opening: f32,
    pub open: f32,
    pub emanating: f32,
}

impl Default for LotusPhases {
    fn default() -> Self {
        Self {
            closed: 2.0,
            opening: 4.0,
            open: 3.0,
            emanating: 5.0,
        }
    }
}

impl LotusPhases {
    /// Length of one full loop.
    pub fn cycle(&self) -> f32 {
        self.closed + self.opening + self.open + self.emanating
    }

    fn validate(&self) -> VignetteResult<()> {
        positive("lotus.closed", self.closed)?;
        positive("lotus.opening", self.opening)?;
        positive("lotus.open", self.open)?;
        positive("lotus.emanating", self.emanating)
    }
}

fn positive(name: &str, value: f32) -> VignetteResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(VignetteError::config(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f32) -> VignetteResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(VignetteError::config(format!(
            "{name} must be non-negative, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json_str(r#"{ "seed": 42, "vignettes": { "particle_cap": 5 } }"#)
            .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.vignettes.particle_cap, 5);
        assert_eq!(config.vignettes.lotus, LotusPhases::default());
        assert_eq!(config.title, "Vignette");
    }

    #[test]
    fn default_lotus_cycle_is_fourteen_seconds() {
        assert_eq!(LotusPhases::default().cycle(), 14.0);
    }

    #[test]
    fn rejects_inverted_lifespan_range() {
        let json = r#"{ "vignettes": { "decay_lifespan": { "min": 3.0, "max": 1.0 } } }"#;
        let err = AppConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("decay_lifespan.min"));
    }

    #[test]
    fn rejects_zero_phase() {
        let json = r#"{ "vignettes": { "lotus": { "opening": 0.0 } } }"#;
        assert!(AppConfig::from_json_str(json).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, VignetteError::Io(_)));
    }
}
