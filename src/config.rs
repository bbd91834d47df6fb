// ================================
// src/config.rs - every tunable of the simulation, loaded from TOML
// ================================
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "./rover_sim.toml";
pub const DEFAULT_SEED: u32 = 69420;

/// Shape parameters for procedural track generation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackConfig {
    /// Spline control vertices around the loop (typ. 8–32)
    pub control_points: usize,
    /// Inner bound of control-point radius
    pub min_radius: f64,
    /// Outer bound of control-point radius
    pub max_radius: f64,
    /// Half-width: each edge sits this far from the centerline
    pub track_width: f64,
    /// Obstacles requested; fewer may be placed
    pub obstacle_count: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            control_points: 16,
            min_radius: 300.0,
            max_radius: 520.0,
            track_width: 90.0,
            obstacle_count: 15,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    /// Side of the triangular rover body
    pub side: f64,
    /// Multiplier on the nominal radius
    pub safety_scale: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            side: 33.0,
            safety_scale: 1.0,
        }
    }
}

impl RobotConfig {
    /// Circumradius of the body, scaled by the safety factor.
    pub fn radius(&self) -> f64 {
        self.side / 3f64.sqrt() * self.safety_scale
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub beam_count: usize,
    pub max_range: f64,
    pub min_range: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            beam_count: 36,
            max_range: 800.0,
            min_range: 0.0,
        }
    }
}

/// Which steering law the controller runs.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Vector-field avoidance over the full scan, path following, escape mode
    #[default]
    Full,
    /// Forward/right/back/left readings only
    Cardinal,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub fidelity: Fidelity,
    /// Angular rate limit (rad/s)
    pub max_omega: f64,
    /// Proportional gain on heading error toward the path target
    pub track_gain: f64,
    /// Weight of the previous command in the low-pass filter
    pub steer_smooth: f64,
    /// Commands below this (rad/s) are zeroed
    pub dead_zone: f64,
    /// Speed multiplier inside the desired clearance buffer
    pub slow_scale: f64,
    /// Per-tick displacement below which the rover counts as stuck
    pub stuck_distance: f64,
    /// Stuck time (s) that triggers an escape
    pub stuck_time: f64,
    /// Length of an escape window (s)
    pub escape_duration: f64,
    /// Gain toward the most open beam while escaping
    pub escape_gain: f64,
    /// Range used to normalize the left/right differential term
    pub range_normalizer: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fidelity: Fidelity::Full,
            max_omega: 2.2,
            track_gain: 2.2,
            steer_smooth: 0.65,
            dead_zone: 0.02,
            slow_scale: 0.55,
            stuck_distance: 0.3,
            stuck_time: 1.0,
            escape_duration: 0.9,
            escape_gain: 3.0,
            range_normalizer: 800.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FollowerConfig {
    /// Arc distance along the centerline to the lookahead target
    pub lookahead: f64,
    /// Samples searched either side of the last closest index
    pub window: usize,
    /// Beyond this distance from the windowed best, search the whole loop
    pub reacquire_distance: f64,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            lookahead: 140.0,
            window: 40,
            reacquire_distance: 300.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Nominal forward speed (units/s)
    pub speed: f64,
    /// Upper bound on a single tick's dt (s)
    pub max_dt: f64,
    pub tick_hz: f64,
    /// Stop after this many ticks; run until interrupted when absent
    pub max_ticks: Option<u64>,
    /// Telemetry line every N ticks
    pub log_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            speed: 120.0,
            max_dt: 0.05,
            tick_hz: 60.0,
            max_ticks: None,
            log_every: 60,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u32,
    pub track: TrackConfig,
    pub robot: RobotConfig,
    pub sensor: SensorConfig,
    pub controller: ControllerConfig,
    pub follower: FollowerConfig,
    pub run: RunConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            track: TrackConfig::default(),
            robot: RobotConfig::default(),
            sensor: SensorConfig::default(),
            controller: ControllerConfig::default(),
            follower: FollowerConfig::default(),
            run: RunConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

impl SimConfig {
    /// Load and validate a TOML file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading configuration from {}", path.display());
        let config_str = fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// `CONFIG_PATH` if set, otherwise [`DEFAULT_CONFIG_PATH`].
    pub fn config_path() -> PathBuf {
        env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from [`SimConfig::config_path`], using defaults when no file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            info!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Rejects values that make the simulation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.track;
        if t.control_points < 3 {
            return Err(invalid("track.control_points", "need at least 3"));
        }
        positive("track.min_radius", t.min_radius)?;
        positive("track.max_radius", t.max_radius)?;
        if t.min_radius >= t.max_radius {
            return Err(invalid(
                "track.min_radius",
                format!("{} is not below max_radius {}", t.min_radius, t.max_radius),
            ));
        }
        positive("track.track_width", t.track_width)?;

        positive("robot.side", self.robot.side)?;
        positive("robot.safety_scale", self.robot.safety_scale)?;

        if self.sensor.beam_count == 0 {
            return Err(invalid("sensor.beam_count", "need at least one beam"));
        }
        positive("sensor.max_range", self.sensor.max_range)?;
        if !(0.0..self.sensor.max_range).contains(&self.sensor.min_range) {
            return Err(invalid(
                "sensor.min_range",
                format!("must lie in [0, {})", self.sensor.max_range),
            ));
        }

        positive("controller.max_omega", self.controller.max_omega)?;
        if !(0.0..1.0).contains(&self.controller.steer_smooth) {
            return Err(invalid("controller.steer_smooth", "must lie in [0, 1)"));
        }
        positive("controller.range_normalizer", self.controller.range_normalizer)?;

        positive("follower.lookahead", self.follower.lookahead)?;

        positive("run.max_dt", self.run.max_dt)?;
        positive("run.tick_hz", self.run.tick_hz)?;
        if !self.run.speed.is_finite() || self.run.speed < 0.0 {
            return Err(invalid("run.speed", "must be non-negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn defaults_are_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml(
            r#"
            seed = 7

            [track]
            obstacle_count = 30

            [controller]
            fidelity = "cardinal"
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.track.obstacle_count, 30);
        assert_eq!(config.track.control_points, 16);
        assert_eq!(config.controller.fidelity, Fidelity::Cardinal);
        assert_abs_diff_eq!(config.controller.max_omega, 2.2);
        assert_abs_diff_eq!(config.run.max_dt, 0.05);
    }

    #[test]
    fn rejects_inverted_radii() {
        let err = SimConfig::from_toml(
            r#"
            [track]
            min_radius = 600.0
            max_radius = 500.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "track.min_radius",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_beams_and_bad_types() {
        let mut config = SimConfig::default();
        config.sensor.beam_count = 0;
        assert!(config.validate().is_err());

        let err = SimConfig::from_toml("seed = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn robot_radius_scales() {
        let mut robot = RobotConfig::default();
        assert_abs_diff_eq!(robot.radius(), 33.0 / 3f64.sqrt(), epsilon = 1e-12);
        robot.safety_scale = 2.0;
        assert_abs_diff_eq!(robot.radius(), 66.0 / 3f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SimConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(SimConfig::from_toml(&text).unwrap(), config);
    }
}
