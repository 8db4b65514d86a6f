// Local avoidance steering.
//
// Finds the nearest agent that is both ahead (positive dot with the desired
// direction) and inside the avoidance radius, then bends the desired direction
// toward the perpendicular of the line to that agent, on whichever side needs
// the smaller turn. Soft: it biases travel, it does not resolve overlap.

use super::{EPSILON, LayoutConfig, Vec2};
use crate::model::AgentId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AvoidanceSteering {
    radius: f64,
    /// Blend strength k in (0, 1).
    blend: f64,
}

impl AvoidanceSteering {
    pub fn new(cfg: &LayoutConfig) -> Self {
        Self {
            radius: cfg.avoidance_radius,
            blend: cfg.avoidance_blend,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Adjusted unit direction for `self_id` travelling along `desired`.
    ///
    /// `others` may include `self_id`; it is skipped. Falls back to `desired`
    /// whenever there is nothing to dodge or the blend degenerates.
    pub fn steer<'a>(
        &self,
        self_id: &AgentId,
        self_pos: Vec2,
        desired: Vec2,
        others: impl IntoIterator<Item = (&'a AgentId, Vec2)>,
    ) -> Vec2 {
        if desired.length_sq() < EPSILON {
            return desired;
        }

        let radius_sq = self.radius * self.radius;
        let mut nearest: Option<(f64, &AgentId, Vec2)> = None;

        for (id, pos) in others {
            if id == self_id {
                continue;
            }
            let to = pos - self_pos;
            let dist_sq = to.length_sq();
            if dist_sq > radius_sq || to.dot(desired) <= 0.0 {
                continue;
            }
            // Ties go to the smaller id so the result never depends on input order.
            let closer = match nearest {
                None => true,
                Some((best, best_id, _)) => dist_sq < best || (dist_sq == best && id < best_id),
            };
            if closer {
                nearest = Some((dist_sq, id, pos));
            }
        }

        let Some((_, _, obstacle)) = nearest else {
            return desired;
        };

        let to = obstacle - self_pos;
        let perp = to.perp().normalize_or(Vec2::ZERO);
        let side = if desired.cross(to) > 0.0 { -1.0 } else { 1.0 };
        let blended = desired * (1.0 - self.blend) + perp * (side * self.blend);
        blended.normalize_or(desired)
    }
}
