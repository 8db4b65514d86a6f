// Slot geometry for the non-tree placements.
//
// Each function maps (index, count) within one group to a coordinate:
// - root row: evenly spaced band at the top of the canvas
// - approval queue: arc (or row) anchored on the user node
// - service orbit: bounded arcs around a service, layered into rings

use super::{LayoutConfig, QueueGeometry, Vec2};
use crate::model::Dimensions;

/// Spacing for `count` items sharing `available` width, capped at `max_spacing`.
pub fn row_spacing(count: usize, available: f64, max_spacing: f64) -> f64 {
    if count == 0 {
        return max_spacing;
    }
    max_spacing.min(available.max(0.0) / count as f64)
}

/// Offset of slot `index` from the centre of a group of `count`.
fn centered_offset(index: usize, count: usize) -> f64 {
    index as f64 - (count.saturating_sub(1)) as f64 / 2.0
}

/// Shift `center` so that `center ± half_extent` stays inside the margins.
fn fit_center(center: f64, half_extent: f64, dims: Dimensions, margin: f64) -> f64 {
    let lo = margin + half_extent;
    let hi = dims.width - margin - half_extent;
    if lo > hi {
        dims.width / 2.0
    } else {
        center.clamp(lo, hi)
    }
}

fn available_width(dims: Dimensions, cfg: &LayoutConfig) -> f64 {
    (dims.width - 2.0 * cfg.margin_x).max(0.0)
}

/// Root agents, centred horizontally on the canvas.
pub fn root_slot(index: usize, count: usize, dims: Dimensions, cfg: &LayoutConfig) -> Vec2 {
    let spacing = row_spacing(count, available_width(dims, cfg), cfg.leader_spacing_max);
    Vec2::new(
        dims.width / 2.0 + centered_offset(index, count) * spacing,
        cfg.root_row_y,
    )
}

/// Agents waiting for approval, gathered around the user node.
pub fn queue_slot(index: usize, count: usize, user: Vec2, dims: Dimensions, cfg: &LayoutConfig) -> Vec2 {
    let spacing = row_spacing(count, available_width(dims, cfg), cfg.queue_spacing_max);
    match cfg.queue_geometry {
        QueueGeometry::Arc => {
            let radius = cfg.queue_radius;
            let mut step = spacing / radius;
            if count > 1 && step * (count - 1) as f64 > cfg.queue_max_arc {
                step = cfg.queue_max_arc / (count - 1) as f64;
            }
            let half_span = step * (count.saturating_sub(1)) as f64 / 2.0;
            let half_extent = radius * half_span.min(std::f64::consts::FRAC_PI_2).sin();
            let center = Vec2::new(fit_center(user.x, half_extent, dims, cfg.margin_x), user.y);

            let angle = -std::f64::consts::FRAC_PI_2 + centered_offset(index, count) * step;
            center + Vec2::from_angle(angle) * radius
        }
        QueueGeometry::Row => {
            let half_extent = spacing * (count.saturating_sub(1)) as f64 / 2.0;
            let cx = fit_center(user.x, half_extent, dims, cfg.margin_x);
            Vec2::new(
                cx + centered_offset(index, count) * spacing,
                user.y - cfg.queue_offset_y,
            )
        }
    }
}

/// Agents running against a service. Every `orbit_ring_capacity` agents start
/// a new ring further out; within a ring, agents spread left to right.
pub fn orbit_slot(index: usize, count: usize, service: Vec2, cfg: &LayoutConfig) -> Vec2 {
    let capacity = cfg.orbit_ring_capacity.max(1);
    let ring = index / capacity;
    let slot = index % capacity;
    let in_ring = count.saturating_sub(ring * capacity).clamp(1, capacity);

    let radius = cfg.orbit_base_radius + ring as f64 * cfg.orbit_ring_gap;
    let angle = if in_ring == 1 {
        cfg.orbit_center_angle
    } else {
        let start = cfg.orbit_center_angle - cfg.orbit_arc_span / 2.0;
        start + cfg.orbit_arc_span * slot as f64 / (in_ring - 1) as f64
    };
    service + Vec2::from_angle(angle) * radius
}
