// ================================
// src/lib.rs
// ================================
pub mod config;
pub mod control;
pub mod error;
pub mod follow;
pub mod geometry;
pub mod lidar;
pub mod resolve;
pub mod rng;
pub mod session;
pub mod track;

pub use config::SimConfig;
pub use control::{ControlMode, RoverController, RoverState};
pub use error::{Result, SimError};
pub use session::{Session, TickReport};
pub use track::{generate_track, Track};
