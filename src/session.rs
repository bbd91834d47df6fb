// ================================
// src/session.rs - one track, one rover: sense -> control -> resolve -> commit
// ================================
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    config::SimConfig,
    control::{ControlMode, RoverController, RoverState},
    error::Result,
    follow::PathFollower,
    lidar::Lidar,
    resolve::resolve,
    track::{generate_track, Track},
};

/// What one tick committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Time step actually simulated, after clamping
    pub dt: f64,
    pub state: RoverState,
    pub mode: ControlMode,
    pub omega: f64,
    pub forward_clearance: f64,
    /// Forward step before collision resolution
    pub displacement: f64,
    /// The controller step failed and a straight step was taken instead
    pub degraded: bool,
}

/// Owns everything one simulation run needs. A parameter change means
/// building a new session.
#[derive(Debug)]
pub struct Session {
    config: SimConfig,
    track: Arc<Track>,
    controller: RoverController,
    follower: PathFollower,
    lidar: Lidar,
    // reused between ticks
    scan: Vec<f64>,
    ticks: u64,
}

impl Session {
    /// Validates `config`, generates the track for its seed and places the
    /// rover at the start gate.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let track = generate_track(config.seed, &config.track);
        Self::with_track(config, Arc::new(track))
    }

    /// Session on an existing (possibly shared) track.
    pub fn with_track(config: SimConfig, track: Arc<Track>) -> Result<Self> {
        if let Err(e) = track.validate() {
            warn!(seed = config.seed, error = %e, "refusing to simulate on invalid track");
            return Err(e.into());
        }

        let robot_radius = config.robot.radius();
        let start = track.start_pose();
        let start_index = track.closest_index(&start.position());
        let controller = RoverController::new(start, robot_radius, config.controller.clone());
        let follower = PathFollower::new(config.follower.clone(), start_index);
        let lidar = Lidar::new(config.sensor.clone(), robot_radius);

        info!(
            x = start.x,
            y = start.y,
            heading = start.heading,
            robot_radius,
            fidelity = ?config.controller.fidelity,
            "session ready"
        );

        Ok(Self {
            scan: Vec::with_capacity(config.sensor.beam_count),
            config,
            track,
            controller,
            follower,
            lidar,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Handle for readers that outlive the session (renderers, other rovers).
    pub fn shared_track(&self) -> Arc<Track> {
        Arc::clone(&self.track)
    }

    pub fn state(&self) -> RoverState {
        self.controller.state()
    }

    pub fn mode(&self) -> ControlMode {
        self.controller.mode()
    }

    /// Body radius used for sensing, clearances and collision resolution.
    pub fn robot_radius(&self) -> f64 {
        self.controller.robot_radius()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Fresh scan from the committed pose.
    pub fn scan(&self) -> Vec<f64> {
        self.lidar.scan(&self.controller.state(), &self.track)
    }

    /// The scan the last tick steered on.
    pub fn last_scan(&self) -> &[f64] {
        &self.scan
    }

    /// Advance the simulation by `dt` seconds (clamped to `run.max_dt`).
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.run.max_dt)
        } else {
            0.0
        };
        let speed = self.config.run.speed;

        let prior = self.controller.state();
        self.lidar.scan_into(&mut self.scan, &prior, &self.track);
        let target = self.follower.target_heading(&self.track, &prior.position());

        let (omega, forward_clearance, displacement, degraded) =
            match self.controller.advance(&self.scan, dt, speed, target) {
                Ok(step) => (step.omega, step.forward_clearance, step.displacement, false),
                Err(e) => {
                    warn!(tick = self.ticks, error = %e, "controller step failed, driving straight");
                    self.controller.step_straight(dt, speed);
                    let forward = self
                        .scan
                        .first()
                        .copied()
                        .unwrap_or(self.config.sensor.max_range);
                    (0.0, forward, speed * dt, true)
                }
            };

        let proposed = self.controller.state();
        if proposed.is_finite() {
            let idx = self.follower.closest_index(&self.track, &proposed.position());
            let committed = resolve(proposed, idx, &self.track, self.robot_radius());
            self.controller.set_state(committed);
        }
        self.ticks += 1;

        let report = TickReport {
            tick: self.ticks,
            dt,
            state: self.controller.state(),
            mode: self.controller.mode(),
            omega,
            forward_clearance,
            displacement,
            degraded,
        };
        debug!(?report, "tick");
        report
    }
}
