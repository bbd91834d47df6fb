// ================================
// src/error.rs - error taxonomy
// ================================
use std::fmt;
use thiserror::Error;

/// Which boundary polyline of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Left,
    Right,
}

impl fmt::Display for EdgeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeSide::Left => f.write_str("left"),
            EdgeSide::Right => f.write_str("right"),
        }
    }
}

/// A generated track that must not be simulated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("{side} edge is degenerate ({points} points after offsetting, need at least 3)")]
    DegenerateEdge { side: EdgeSide, points: usize },
}

/// Why a controller step could not be computed. The session masks these
/// with a straight-line step for the tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("range scan is empty")]
    EmptyScan,

    #[error("beam {beam} reported a non-finite clearance ({value})")]
    NonFiniteReading { beam: usize, value: f64 },

    #[error("rover pose is not finite")]
    NonFinitePose,

    #[error("invalid time step {0}")]
    InvalidTimestep(f64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid track: {0}")]
    Track(#[from] TrackError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SimError>;
