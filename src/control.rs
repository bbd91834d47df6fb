// ================================
// src/control.rs - reactive steering and speed control
// ================================
use std::f64::consts::{FRAC_PI_2, TAU};
use tracing::{debug, info};

use crate::{
    config::{ControllerConfig, Fidelity},
    error::ControlError,
    geometry::{normalize_angle, Point},
    lidar::LidarReading,
};

/// Constant pull toward straight ahead added to the repulsion field.
const FORWARD_BIAS: f64 = 0.6;
/// Gain from the field's (clamped) direction to an angular command.
const AVOID_GAIN: f64 = 2.0;
/// Share of the rate limit given to the left/right differential term.
const DIFFERENTIAL_SHARE: f64 = 0.55;
/// Heading error at which the speed de-rating saturates.
const HEADING_PENALTY_SPAN: f64 = 1.2;
const HEADING_PENALTY_MAX: f64 = 0.6;

/// Cardinal controller: hard-turn multiplier when blocked, differential share.
const CARDINAL_BLOCKED_FACTOR: f64 = 1.6;
const CARDINAL_DIFFERENTIAL_SHARE: f64 = 0.5;

const ESCAPE_EXPIRED_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoverState {
    pub x: f64,
    pub y: f64,
    /// Radians, kept in (-π, π]
    pub heading: f64,
}

impl RoverState {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }

    fn advance_along_heading(&mut self, distance: f64) {
        self.x += self.heading.cos() * distance;
        self.y += self.heading.sin() * distance;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Blend of path following and obstacle avoidance
    Tracking,
    /// Seeking the most open forward beam after getting stuck
    Escaping,
}

/// What one controller step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Smoothed angular rate applied this step (rad/s)
    pub omega: f64,
    /// Distance moved along the new heading
    pub displacement: f64,
    pub forward_clearance: f64,
    pub mode: ControlMode,
}

/// Clearance bands derived from the rover radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clearances {
    /// Inside this the rover slows and avoidance takes over
    pub desired: f64,
    /// Forward motion never eats into this margin
    pub min: f64,
    /// At or below this the rover stops and turns in place
    pub stop: f64,
}

impl Clearances {
    pub fn full(robot_radius: f64) -> Self {
        let min = (robot_radius + 4.0).max(12.0);
        Self {
            desired: robot_radius * 2.5,
            min,
            stop: min + 4.0,
        }
    }

    pub fn cardinal(robot_radius: f64) -> Self {
        let min = (robot_radius + 6.0).max(12.0);
        Self {
            desired: (robot_radius * 1.2).max(45.0),
            min,
            stop: min,
        }
    }
}

/// Rover pose plus the private state of the steering law.
#[derive(Debug, Clone)]
pub struct RoverController {
    config: ControllerConfig,
    robot_radius: f64,
    state: RoverState,
    last_steer: f64,
    last_position: Point,
    stuck_time: f64,
    escape_time: f64,
}

impl RoverController {
    pub fn new(initial: RoverState, robot_radius: f64, config: ControllerConfig) -> Self {
        Self {
            config,
            robot_radius,
            state: initial,
            last_steer: 0.0,
            last_position: initial.position(),
            stuck_time: 0.0,
            escape_time: 0.0,
        }
    }

    pub fn state(&self) -> RoverState {
        self.state
    }

    /// Overwrites the pose; steering memory and stuck tracking are kept.
    pub fn set_state(&mut self, state: RoverState) {
        self.state = state;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn robot_radius(&self) -> f64 {
        self.robot_radius
    }

    pub fn clearances(&self) -> Clearances {
        match self.config.fidelity {
            Fidelity::Full => Clearances::full(self.robot_radius),
            Fidelity::Cardinal => Clearances::cardinal(self.robot_radius),
        }
    }

    pub fn mode(&self) -> ControlMode {
        if self.escape_time > 0.0 {
            ControlMode::Escaping
        } else {
            ControlMode::Tracking
        }
    }

    /// Constant-heading move, used when a controller step can't be computed.
    pub fn step_straight(&mut self, dt: f64, speed: f64) {
        self.state.advance_along_heading(speed * dt);
    }

    pub fn rotate(&mut self, delta: f64) {
        self.state.heading = normalize_angle(self.state.heading + delta);
    }

    /// One control step from a circular scan (beam 0 forward).
    ///
    /// `target_heading` is the world-frame heading toward the path lookahead
    /// point; it is ignored in cardinal fidelity and while escaping.
    pub fn advance(
        &mut self,
        scan: &[f64],
        dt: f64,
        target_speed: f64,
        target_heading: Option<f64>,
    ) -> Result<StepReport, ControlError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(ControlError::InvalidTimestep(dt));
        }
        if !self.state.is_finite() {
            return Err(ControlError::NonFinitePose);
        }
        if scan.is_empty() {
            return Err(ControlError::EmptyScan);
        }
        if let Some((beam, &value)) = scan.iter().enumerate().find(|(_, r)| !r.is_finite()) {
            return Err(ControlError::NonFiniteReading { beam, value });
        }

        match self.config.fidelity {
            Fidelity::Full => Ok(self.advance_full(scan, dt, target_speed, target_heading)),
            Fidelity::Cardinal => {
                let readings = LidarReading::from_scan(scan).ok_or(ControlError::EmptyScan)?;
                Ok(self.drive(&readings, dt, target_speed))
            }
        }
    }

    fn advance_full(
        &mut self,
        scan: &[f64],
        dt: f64,
        speed: f64,
        target_heading: Option<f64>,
    ) -> StepReport {
        let cfg = &self.config;
        let max = cfg.max_omega;
        let bands = Clearances::full(self.robot_radius);
        let n = scan.len();

        let forward = scan[0];
        let right = scan[(n / 4) % n];
        let left = scan[(3 * n / 4) % n];

        let target_heading = target_heading.filter(|h| h.is_finite());
        let omega_track = target_heading
            .map(|h| {
                (normalize_angle(h - self.state.heading) * cfg.track_gain).clamp(-max, max)
            })
            .unwrap_or(0.0);
        let omega_avoid = self.avoidance_command(scan, &bands, forward, left, right);

        self.update_stuck(dt);

        let omega_cmd = if self.escape_time > 0.0 {
            self.escape_command(scan)
        } else {
            let danger = ((bands.desired - forward) / bands.desired).clamp(0.0, 1.0);
            let w_avoid = (0.25 + danger * 0.75).clamp(0.0, 1.0);
            omega_track * (1.0 - w_avoid) + omega_avoid * w_avoid
        };

        let omega = self.smooth(omega_cmd);
        self.state.heading = normalize_angle(self.state.heading + omega * dt);

        let available = (forward - bands.min).max(0.0);
        let speed_scale = if forward < bands.desired {
            self.config.slow_scale
        } else {
            1.0
        };
        let heading_error =
            normalize_angle(target_heading.unwrap_or(self.state.heading) - self.state.heading);
        let heading_penalty =
            1.0 - (heading_error.abs() / HEADING_PENALTY_SPAN).clamp(0.0, HEADING_PENALTY_MAX);

        let wanted = speed * speed_scale * heading_penalty * dt;
        let step = if forward <= bands.stop {
            0.0
        } else {
            wanted.min(available).max(0.0)
        };
        if step > 0.0 {
            self.state.advance_along_heading(step);
        }

        let report = StepReport {
            omega,
            displacement: step,
            forward_clearance: forward,
            mode: self.mode(),
        };
        debug!(?report, "controller step");
        report
    }

    /// Vector-field avoidance over the forward half of the scan, or a hard
    /// turn toward the more open side when blocked.
    fn avoidance_command(
        &self,
        scan: &[f64],
        bands: &Clearances,
        forward: f64,
        left: f64,
        right: f64,
    ) -> f64 {
        let max = self.config.max_omega;
        if forward <= bands.stop {
            let sign = if left >= right { -1.0 } else { 1.0 };
            return sign * max;
        }

        let step_angle = TAU / scan.len() as f64;
        let (mut vx, mut vy) = (0.0, 0.0);
        for (i, &reading) in scan.iter().enumerate() {
            let ang = i as f64 * step_angle;
            let clearance = (reading - bands.min).max(0.0);
            let weight = (clearance / bands.desired).min(1.0);
            let facing = ang.cos().max(0.0);
            let w = weight * facing;
            vx += ang.cos() * w;
            vy += ang.sin() * w;
        }
        vx += FORWARD_BIAS;

        let mut omega = 0.0;
        if vx != 0.0 || vy != 0.0 {
            let target = vy.atan2(vx).clamp(-FRAC_PI_2, FRAC_PI_2);
            omega = (target * AVOID_GAIN).clamp(-max, max);
        }
        let differential = (right - left) / self.config.range_normalizer * (max * DIFFERENTIAL_SHARE);
        omega + differential.clamp(-max, max)
    }

    /// Steer toward the forward-facing beam with the most room.
    fn escape_command(&self, scan: &[f64]) -> f64 {
        let step_angle = TAU / scan.len() as f64;
        let mut best_i = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, &reading) in scan.iter().enumerate() {
            let facing = normalize_angle(i as f64 * step_angle).cos().max(0.0);
            if facing <= 0.0 {
                continue;
            }
            let score = reading * facing;
            if score > best_score {
                best_score = score;
                best_i = i;
            }
        }

        let best_angle = normalize_angle(best_i as f64 * step_angle);
        let max = self.config.max_omega;
        (best_angle * self.config.escape_gain).clamp(-max, max)
    }

    fn update_stuck(&mut self, dt: f64) {
        let position = self.state.position();
        let moved = nalgebra::distance(&position, &self.last_position);
        self.last_position = position;

        if moved < self.config.stuck_distance {
            self.stuck_time += dt;
        } else {
            self.stuck_time = 0.0;
        }

        if self.escape_time > 0.0 {
            self.escape_time -= dt;
            if self.escape_time <= ESCAPE_EXPIRED_EPS {
                self.escape_time = 0.0;
                debug!("escape window expired");
            }
        }

        if self.stuck_time > self.config.stuck_time && self.escape_time <= 0.0 {
            info!(
                x = position.x,
                y = position.y,
                stuck_for = self.stuck_time,
                "rover stuck, starting escape"
            );
            self.escape_time = self.config.escape_duration;
            self.stuck_time = 0.0;
        }
    }

    /// Dead zone, rate limit and low-pass against the previous command.
    fn smooth(&mut self, omega_cmd: f64) -> f64 {
        let max = self.config.max_omega;
        let cmd = if omega_cmd.abs() < self.config.dead_zone {
            0.0
        } else {
            omega_cmd
        };
        let s = self.config.steer_smooth;
        let omega = s * self.last_steer + (1.0 - s) * cmd.clamp(-max, max);
        self.last_steer = omega;
        omega
    }

    /// Reduced-fidelity step from four cardinal readings: stop/slow/turn
    /// thresholds only. No vector field, no escape mode, no path following.
    pub fn drive(&mut self, readings: &LidarReading, dt: f64, speed: f64) -> StepReport {
        let max = self.config.max_omega;
        let bands = Clearances::cardinal(self.robot_radius);

        let mut steer_cmd = 0.0;
        if readings.forward <= bands.stop {
            let sign = if readings.left >= readings.right { -1.0 } else { 1.0 };
            steer_cmd = sign * max * CARDINAL_BLOCKED_FACTOR;
        } else if readings.forward < bands.desired {
            let sign = if readings.left > readings.right { -1.0 } else { 1.0 };
            steer_cmd = sign * max;
        }
        steer_cmd += (readings.right - readings.left) / self.config.range_normalizer
            * (max * CARDINAL_DIFFERENTIAL_SHARE);

        let s = self.config.steer_smooth;
        let omega = s * self.last_steer + (1.0 - s) * steer_cmd.clamp(-max, max);
        self.last_steer = omega;
        self.state.heading = normalize_angle(self.state.heading + omega * dt);

        let available = (readings.forward - bands.min).max(0.0);
        let speed_scale = if readings.forward < bands.desired {
            self.config.slow_scale
        } else {
            1.0
        };
        let step = if readings.forward <= bands.stop {
            0.0
        } else {
            (speed * speed_scale * dt).min(available).max(0.0)
        };
        if step > 0.0 {
            self.state.advance_along_heading(step);
        }

        StepReport {
            omega,
            displacement: step,
            forward_clearance: readings.forward,
            mode: ControlMode::Tracking,
        }
    }
}
