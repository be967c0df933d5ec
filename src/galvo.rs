//! Galvanometer mirror dynamics.
//!
//! Each mirror axis is modelled as a spring-damper driven towards the current
//! target angle, integrated with semi-implicit Euler at a fixed `dt`. The
//! combined angular velocity is limited to `max_speed` and each axis is held
//! within the mechanical range `±max_angle`.
//!
//! The simulator walks a [`LaserFrame`] target by target. It only moves on to
//! the next target once the mirrors have stayed within tolerance for
//! `settle_steps` consecutive steps, so the resulting [`SimFrame`] shows the
//! lag, overshoot and corner rounding a real scanner produces. The hold is
//! counted per target. Mirrors already at rest on a target skip it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distortion::{self, angle_to_screen};
use crate::types::{LaserFrame, LaserPoint, SimFrame, SimPoint, COORD_DIVISOR};

/// How many steps run between cancellation checks in
/// [`GalvoSimulator::simulate_until`].
pub const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Angular speed (deg/s) below which the mirrors count as at rest.
pub const REST_SPEED: f32 = 1e-3;

/// Galvo configuration.
///
/// Angles are in degrees, velocities in degrees per second.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GalvoConfig {
    /// Spring constant (1/s²).
    pub stiffness: f32,
    /// Damping coefficient (1/s).
    pub damping: f32,
    /// Maximum combined angular speed.
    pub max_speed: f32,
    /// Mechanical half-range of each mirror.
    pub max_angle: f32,
    /// Squared angular error (deg²) below which a target counts as reached.
    pub tolerance_squared: f32,
    /// Consecutive in-tolerance steps required before advancing.
    pub settle_steps: u32,
    /// Simulation time step in seconds.
    pub dt: f32,
    /// Upper bound on steps spent on a single frame.
    pub max_steps_per_frame: usize,
}

impl Default for GalvoConfig {
    fn default() -> Self {
        Self {
            stiffness: 4.0e6,
            damping: 3200.0,
            max_speed: 20_000.0,
            max_angle: 20.0,
            tolerance_squared: 0.01,
            settle_steps: 2,
            dt: 1.0 / 30_000.0,
            max_steps_per_frame: 1_000_000,
        }
    }
}

impl GalvoConfig {
    /// Create a configuration for the given mirror half-range in degrees.
    pub fn new(max_angle: f32) -> Self {
        Self {
            max_angle,
            ..Default::default()
        }
    }

    /// Set stiffness and damping (builder pattern).
    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Set the maximum angular speed (builder pattern).
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the settling tolerance as an angular error in degrees (builder pattern).
    pub fn with_tolerance(mut self, tolerance_deg: f32) -> Self {
        self.tolerance_squared = tolerance_deg * tolerance_deg;
        self
    }

    /// Set the consecutive in-tolerance steps required to advance (builder pattern).
    pub fn with_settle_steps(mut self, settle_steps: u32) -> Self {
        self.settle_steps = settle_steps;
        self
    }

    /// Set the simulation rate in steps per second (builder pattern).
    pub fn with_rate(mut self, steps_per_second: f32) -> Self {
        self.dt = 1.0 / steps_per_second;
        self
    }

    /// Set the per-frame step cap (builder pattern).
    pub fn with_max_steps_per_frame(mut self, max_steps: usize) -> Self {
        self.max_steps_per_frame = max_steps;
        self
    }
}

/// Mirror angles and angular velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GalvoState {
    pub angle_x: f32,
    pub angle_y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

impl GalvoState {
    /// Magnitude of the combined angular velocity.
    pub fn speed(&self) -> f32 {
        (self.velocity_x * self.velocity_x + self.velocity_y * self.velocity_y).sqrt()
    }
}

/// How a call to [`GalvoSimulator::simulate`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SimOutcome {
    /// Every target was reached.
    Completed { steps: usize },
    /// The step cap was hit before the last target was reached.
    StepLimit { steps: usize, reached_index: usize },
    /// The caller cancelled the simulation part way.
    Abandoned { steps: usize },
}

impl SimOutcome {
    /// Returns true if the whole frame was traced.
    pub fn is_completed(&self) -> bool {
        matches!(self, SimOutcome::Completed { .. })
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, SimOutcome::Abandoned { .. })
    }

    /// Simulation steps taken.
    pub fn steps(&self) -> usize {
        match *self {
            SimOutcome::Completed { steps }
            | SimOutcome::StepLimit { steps, .. }
            | SimOutcome::Abandoned { steps } => steps,
        }
    }
}

/// Result of simulating one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub frame: SimFrame,
    pub outcome: SimOutcome,
}

/// Result of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Where the beam is after this step.
    pub point: SimPoint,
    /// True if the target counts as reached and the caller should advance.
    pub advance: bool,
}

/// Discrete-time galvo pair.
///
/// Angles and velocities persist across frames, so a frame starts where the
/// previous one left the mirrors.
#[derive(Debug, Clone)]
pub struct GalvoSimulator {
    config: GalvoConfig,
    scale: f32,
    state: GalvoState,
    settled: u32,
}

impl Default for GalvoSimulator {
    fn default() -> Self {
        Self::new(GalvoConfig::default())
    }
}

impl GalvoSimulator {
    pub fn new(config: GalvoConfig) -> Self {
        Self {
            scale: distortion::screen_scale(config.max_angle),
            settled: 0,
            state: GalvoState::default(),
            config,
        }
    }

    pub fn config(&self) -> &GalvoConfig {
        &self.config
    }

    /// Replaces the configuration. Mirror state is kept.
    pub fn set_config(&mut self, config: GalvoConfig) {
        self.scale = distortion::screen_scale(config.max_angle);
        self.config = config;
    }

    pub fn state(&self) -> GalvoState {
        self.state
    }

    /// Returns the mirrors to rest at the center.
    pub fn reset(&mut self) {
        self.state = GalvoState::default();
        self.settled = 0;
    }

    /// Current beam position in normalized screen space.
    pub fn screen_position(&self) -> (f32, f32) {
        let p = angle_to_screen(self.state.angle_x, self.state.angle_y, self.scale);
        (p.x, p.y)
    }

    /// Advances the mirrors one `dt` towards `target`.
    pub fn step(&mut self, target: &LaserPoint) -> Tick {
        let cfg = &self.config;
        let dt = cfg.dt;

        let target_x = self.target_angle(target.x);
        let target_y = self.target_angle(target.y);

        let dx = target_x - self.state.angle_x;
        let dy = target_y - self.state.angle_y;
        let in_tolerance = dx * dx + dy * dy < cfg.tolerance_squared;
        let at_rest = in_tolerance && self.state.speed() <= REST_SPEED;

        let s = &mut self.state;
        s.velocity_x += (cfg.stiffness * dx - cfg.damping * s.velocity_x) * dt;
        s.velocity_y += (cfg.stiffness * dy - cfg.damping * s.velocity_y) * dt;

        let speed = s.speed();
        if speed > cfg.max_speed {
            let k = cfg.max_speed / speed;
            s.velocity_x *= k;
            s.velocity_y *= k;
        }

        s.angle_x += s.velocity_x * dt;
        s.angle_y += s.velocity_y * dt;
        clamp_axis(&mut s.angle_x, &mut s.velocity_x, cfg.max_angle);
        clamp_axis(&mut s.angle_y, &mut s.velocity_y, cfg.max_angle);

        let advance = if at_rest {
            true
        } else if in_tolerance {
            self.settled = self.settled.saturating_add(1);
            self.settled >= cfg.settle_steps
        } else {
            self.settled = 0;
            false
        };
        if advance {
            self.settled = 0;
        }

        let (x, y) = self.screen_position();
        Tick {
            point: SimPoint {
                x,
                y,
                r: target.r,
                g: target.g,
                b: target.b,
                flags: target.flags,
            },
            advance,
        }
    }

    /// Traces `frame` from the current mirror state.
    ///
    /// Runs until the last target is reached or the step cap is hit. An empty
    /// frame returns an empty trajectory and leaves the state untouched.
    pub fn simulate(&mut self, frame: &LaserFrame) -> Simulation {
        self.simulate_until(frame, || false)
    }

    /// Like [`simulate`](Self::simulate), but polls `cancelled` every
    /// [`CANCEL_CHECK_INTERVAL`] steps and gives up on the frame when it
    /// returns true.
    pub fn simulate_until(
        &mut self,
        frame: &LaserFrame,
        mut cancelled: impl FnMut() -> bool,
    ) -> Simulation {
        let max_steps = self.config.max_steps_per_frame;
        let mut points = Vec::with_capacity(frame.len().min(max_steps));
        let mut index = 0;
        let mut steps = 0;
        self.settled = 0;

        while index < frame.len() {
            if steps >= max_steps {
                log::warn!(
                    "step limit of {} reached at target {}/{}",
                    max_steps,
                    index,
                    frame.len()
                );
                return Simulation {
                    frame: SimFrame::new(points),
                    outcome: SimOutcome::StepLimit {
                        steps,
                        reached_index: index,
                    },
                };
            }
            if steps % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
                log::debug!("simulation abandoned after {} steps", steps);
                return Simulation {
                    frame: SimFrame::new(points),
                    outcome: SimOutcome::Abandoned { steps },
                };
            }

            let tick = self.step(&frame.points[index]);
            points.push(tick.point);
            steps += 1;
            if tick.advance {
                index += 1;
            }
        }

        log::debug!("simulated {} targets in {} steps", frame.len(), steps);
        Simulation {
            frame: SimFrame::new(points),
            outcome: SimOutcome::Completed { steps },
        }
    }

    fn target_angle(&self, coord: i16) -> f32 {
        let max = self.config.max_angle;
        (coord as f32 / COORD_DIVISOR * max).clamp(-max.abs(), max.abs())
    }
}

/// Holds an axis within `±max` and stops motion into the end stop.
fn clamp_axis(angle: &mut f32, velocity: &mut f32, max: f32) {
    let max = max.abs();
    if *angle > max {
        *angle = max;
        if *velocity > 0.0 {
            *velocity = 0.0;
        }
    } else if *angle < -max {
        *angle = -max;
        if *velocity < 0.0 {
            *velocity = 0.0;
        }
    }
}
