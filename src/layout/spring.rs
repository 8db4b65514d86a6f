// Damped spring integrator.
//
// Per tick, frame based (no dt):
//   delta  = target - position         (snap when |delta|^2 < snap_threshold)
//   dir    = steer(normalize(delta))
//   accel  = dir * min(|delta| * stiffness, max_accel)
//   v      = (v + accel) * damping     (components under epsilon drop to 0)
//   pos   += v
//
// An agent that starts the tick at rest and still has zero velocity after the
// cutoff can never move again, so it snaps instead of stalling short.

use super::{EPSILON, LayoutConfig, PositionState, Vec2};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// On target with zero velocity.
    Settled,
    Moving,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpringIntegrator {
    stiffness: f64,
    damping: f64,
    max_accel: f64,
    snap_threshold: f64,
    velocity_epsilon: f64,
}

impl SpringIntegrator {
    pub fn new(cfg: &LayoutConfig) -> Self {
        Self {
            stiffness: cfg.stiffness,
            damping: cfg.damping,
            max_accel: cfg.max_accel,
            snap_threshold: cfg.snap_threshold,
            velocity_epsilon: cfg.velocity_epsilon,
        }
    }

    /// Advance `state` one tick. `steer` receives the unit direction to the
    /// target and returns the direction to actually accelerate along.
    pub fn step(&self, state: &mut PositionState, steer: impl FnOnce(Vec2) -> Vec2) -> StepOutcome {
        let delta = state.target() - state.position();
        let dist_sq = delta.length_sq();
        if dist_sq < self.snap_threshold || dist_sq < EPSILON {
            state.snap_to_target();
            return StepOutcome::Settled;
        }

        let dist = dist_sq.sqrt();
        let dir = delta * (1.0 / dist);
        let dir = steer(dir).normalize_or(dir);

        let accel = dir * (dist * self.stiffness).min(self.max_accel);
        let was_at_rest = state.velocity() == Vec2::ZERO;
        let mut v = (state.velocity() + accel) * self.damping;
        if v.x.abs() < self.velocity_epsilon {
            v.x = 0.0;
        }
        if v.y.abs() < self.velocity_epsilon {
            v.y = 0.0;
        }
        if was_at_rest && v == Vec2::ZERO {
            state.snap_to_target();
            return StepOutcome::Settled;
        }

        state.vx = v.x;
        state.vy = v.y;
        state.x += v.x;
        state.y += v.y;
        StepOutcome::Moving
    }

    /// Step a state with no steering.
    pub fn step_free(&self, state: &mut PositionState) -> StepOutcome {
        self.step(state, |dir| dir)
    }
}
