// Agent layout and motion solver.
//
// Goals:
// - Deterministic: no randomness, no reliance on hash map iteration order
// - Renderer-agnostic: positions only, the host draws
// - Never fails: bad links and unknown ids degrade to a reasonable spot
//
// Submodules:
// - tree: hierarchical parent -> child layout
// - placement: slot geometry for rows, the approval arc and service orbits
// - target: per-agent target resolution (queue -> orbit -> tree -> root row)
// - spatial_grid: neighbour lookup for steering
// - steering: local avoidance
// - spring: damped spring integrator
// - engine: composition root owning the position map
//
// One tick: Scene -> TargetResolver (uses tree) -> steering -> spring -> snapshot.

use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

mod engine;
mod placement;
mod spatial_grid;
mod spring;
mod steering;
mod target;
mod tree;

pub use engine::{LayoutEngine, PositionState, TickReport};
pub use spring::{SpringIntegrator, StepOutcome};
pub use steering::AvoidanceSteering;
pub use target::{TargetCache, TargetResolver};
pub use tree::{Forest, TreeLayoutEngine, TreeNode};

/// Lengths below this are treated as zero when normalizing.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_angle(angle: f64) -> Self {
        Self { x: angle.cos(), y: angle.sin() }
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length_sq(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    /// Rotated +90 degrees.
    pub fn perp(self) -> Vec2 {
        Vec2 { x: -self.y, y: self.x }
    }

    /// Unit vector in the same direction, or `fallback` when too short to normalize.
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if len < EPSILON || !len.is_finite() {
            fallback
        } else {
            self * (1.0 / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2 { x: self.x * rhs, y: self.y * rhs }
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2 { x: -self.x, y: -self.y }
    }
}

/// How the approval queue is arranged around the user node.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueGeometry {
    /// Agents sit on an arc centred on the user node.
    #[default]
    Arc,
    /// Agents sit on a straight row above the user node.
    Row,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Horizontal margin kept free on both sides for rows and queues.
    pub margin_x: f64,
    /// Max spacing between root agents in the top band.
    pub leader_spacing_max: f64,
    /// Y of the root band; tree depth 0 also sits here.
    pub root_row_y: f64,

    /// Width reserved for a leaf subtree.
    pub tree_node_spacing: f64,
    /// Vertical distance between tree levels.
    pub tree_level_height: f64,
    /// Nodes deeper than this are detached and laid out as roots.
    pub tree_max_depth: usize,

    pub queue_geometry: QueueGeometry,
    /// Arc radius around the user node.
    pub queue_radius: f64,
    /// Max spacing between queued agents (arc length for `Arc`).
    pub queue_spacing_max: f64,
    /// Max angular span of the arc, in radians.
    pub queue_max_arc: f64,
    /// Distance above the user node for `Row`.
    pub queue_offset_y: f64,

    pub orbit_base_radius: f64,
    pub orbit_ring_gap: f64,
    pub orbit_ring_capacity: usize,
    /// Angular span of one ring, in radians. Rings are arcs, not full circles.
    pub orbit_arc_span: f64,
    /// Angle the ring arc is centred on. -PI/2 is screen "up".
    pub orbit_center_angle: f64,

    pub stiffness: f64,
    pub damping: f64,
    pub max_accel: f64,
    /// Squared distance under which an agent snaps onto its target.
    pub snap_threshold: f64,
    pub velocity_epsilon: f64,

    pub avoidance_radius: f64,
    /// Blend strength k in (0, 1).
    pub avoidance_blend: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_x: 100.0,
            leader_spacing_max: 180.0,
            root_row_y: 120.0,

            tree_node_spacing: 140.0,
            tree_level_height: 110.0,
            tree_max_depth: 32,

            queue_geometry: QueueGeometry::Arc,
            queue_radius: 150.0,
            queue_spacing_max: 120.0,
            queue_max_arc: PI * 5.0 / 6.0,
            queue_offset_y: 150.0,

            orbit_base_radius: 90.0,
            orbit_ring_gap: 45.0,
            orbit_ring_capacity: 6,
            orbit_arc_span: PI * 2.0 / 3.0,
            orbit_center_angle: -PI / 2.0,

            stiffness: 0.03,
            damping: 0.9,
            max_accel: 2.0,
            snap_threshold: 0.25,
            velocity_epsilon: 0.01,

            avoidance_radius: 60.0,
            avoidance_blend: 0.35,
        }
    }
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let cfg: LayoutConfig = serde_json::from_str(json).map_err(LayoutError::InvalidConfigJson)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let all = [
            ("margin_x", self.margin_x),
            ("leader_spacing_max", self.leader_spacing_max),
            ("root_row_y", self.root_row_y),
            ("tree_node_spacing", self.tree_node_spacing),
            ("tree_level_height", self.tree_level_height),
            ("queue_radius", self.queue_radius),
            ("queue_spacing_max", self.queue_spacing_max),
            ("queue_max_arc", self.queue_max_arc),
            ("queue_offset_y", self.queue_offset_y),
            ("orbit_base_radius", self.orbit_base_radius),
            ("orbit_ring_gap", self.orbit_ring_gap),
            ("orbit_arc_span", self.orbit_arc_span),
            ("orbit_center_angle", self.orbit_center_angle),
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("max_accel", self.max_accel),
            ("snap_threshold", self.snap_threshold),
            ("velocity_epsilon", self.velocity_epsilon),
            ("avoidance_radius", self.avoidance_radius),
            ("avoidance_blend", self.avoidance_blend),
        ];
        for (field, value) in all {
            if !value.is_finite() {
                return Err(LayoutError::config(field, "must be finite"));
            }
        }

        let positive = [
            ("leader_spacing_max", self.leader_spacing_max),
            ("tree_node_spacing", self.tree_node_spacing),
            ("tree_level_height", self.tree_level_height),
            ("queue_radius", self.queue_radius),
            ("queue_spacing_max", self.queue_spacing_max),
            ("orbit_base_radius", self.orbit_base_radius),
            ("max_accel", self.max_accel),
            ("avoidance_radius", self.avoidance_radius),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(LayoutError::config(field, format!("must be > 0, got {value}")));
            }
        }

        let unit = [
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("avoidance_blend", self.avoidance_blend),
        ];
        for (field, value) in unit {
            if value <= 0.0 || value >= 1.0 {
                return Err(LayoutError::config(field, format!("must be in (0, 1), got {value}")));
            }
        }

        if self.margin_x < 0.0 || self.orbit_ring_gap < 0.0 || self.snap_threshold < 0.0 || self.velocity_epsilon < 0.0 {
            return Err(LayoutError::config("margins", "must not be negative"));
        }
        if self.orbit_ring_capacity == 0 {
            return Err(LayoutError::config("orbit_ring_capacity", "must be at least 1"));
        }
        if self.tree_max_depth == 0 {
            return Err(LayoutError::config("tree_max_depth", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zero_uses_fallback() {
        let fallback = Vec2::new(0.0, 1.0);
        assert_eq!(Vec2::ZERO.normalize_or(fallback), fallback);
        let n = Vec2::new(3.0, 4.0).normalize_or(fallback);
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_sign() {
        let right = Vec2::new(1.0, 0.0);
        assert!(right.cross(Vec2::new(0.0, 1.0)) > 0.0);
        assert!(right.cross(Vec2::new(0.0, -1.0)) < 0.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_out_of_range_damping() {
        let cfg = LayoutConfig { damping: 1.0, ..LayoutConfig::default() };
        match cfg.validate() {
            Err(LayoutError::InvalidConfig { field, .. }) => assert_eq!(field, "damping"),
            other => panic!("expected damping error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_partial_json() {
        let cfg = LayoutConfig::from_json(r#"{"stiffness":0.05,"queueGeometry":"row","orbitRingCapacity":4}"#).unwrap();
        assert_eq!(cfg.stiffness, 0.05);
        assert_eq!(cfg.queue_geometry, QueueGeometry::Row);
        assert_eq!(cfg.orbit_ring_capacity, 4);
        assert_eq!(cfg.leader_spacing_max, 180.0);
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let json = serde_json::to_value(LayoutConfig::default()).unwrap();
        assert_eq!(json["leaderSpacingMax"], 180.0);
        assert!(json.get("leader_spacing_max").is_none());
    }

    #[test]
    fn test_config_bad_json() {
        assert!(matches!(
            LayoutConfig::from_json("{not json"),
            Err(LayoutError::InvalidConfigJson(_))
        ));
    }
}
