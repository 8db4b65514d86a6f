// Composition root.
//
// Owns the position map. Nothing else writes to it. Each tick:
// (a) drop entries for agents no longer in the scene, seed new ones at their
//     first resolved target with zero velocity
// (b) re-resolve targets without touching velocity
// (c) steer + integrate every entry against a snapshot of the tick's start
//     positions, so the result does not depend on map iteration order
// (d) expose the map read-only

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::spatial_grid::SpatialGrid;
use super::{AvoidanceSteering, LayoutConfig, SpringIntegrator, StepOutcome, TargetResolver, Vec2};
use crate::error::LayoutError;
use crate::model::{AgentId, Dimensions, Scene};
use crate::output::{FrameOutput, PositionOutput};

/// Per-agent motion record.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub target_x: f64,
    pub target_y: f64,
}

impl PositionState {
    /// At rest on `p`.
    pub fn at(p: Vec2) -> Self {
        Self { x: p.x, y: p.y, vx: 0.0, vy: 0.0, target_x: p.x, target_y: p.y }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.vx, self.vy)
    }

    pub fn target(&self) -> Vec2 {
        Vec2::new(self.target_x, self.target_y)
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target_x = target.x;
        self.target_y = target.y;
    }

    pub fn snap_to_target(&mut self) {
        self.x = self.target_x;
        self.y = self.target_y;
        self.vx = 0.0;
        self.vy = 0.0;
    }

    pub fn is_at_rest(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.x == self.target_x && self.y == self.target_y
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Agents that got a position entry this tick, in scene order.
    pub spawned: Vec<AgentId>,
    /// Agents whose entry was dropped this tick, sorted by id.
    pub despawned: Vec<AgentId>,
    /// Every agent ended the tick on its target with zero velocity.
    pub settled: bool,
}

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    cfg: LayoutConfig,
    resolver: TargetResolver,
    steering: AvoidanceSteering,
    spring: SpringIntegrator,
    positions: HashMap<AgentId, PositionState>,
    dimensions: Dimensions,
    ticks: u64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::build(LayoutConfig::default())
    }
}

impl LayoutEngine {
    pub fn new(cfg: LayoutConfig) -> Result<Self, LayoutError> {
        cfg.validate()?;
        Ok(Self::build(cfg))
    }

    fn build(cfg: LayoutConfig) -> Self {
        Self {
            resolver: TargetResolver::new(&cfg),
            steering: AvoidanceSteering::new(&cfg),
            spring: SpringIntegrator::new(&cfg),
            positions: HashMap::new(),
            dimensions: Dimensions::default(),
            ticks: 0,
            cfg,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Run one frame against `scene`.
    pub fn tick(&mut self, scene: &Scene) -> TickReport {
        self.dimensions = scene.dimensions;

        let present: HashSet<&AgentId> = scene.agents.iter().map(|a| &a.id).collect();
        let mut despawned: Vec<AgentId> = self
            .positions
            .keys()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();
        despawned.sort();
        for id in &despawned {
            self.positions.remove(id);
            debug!(agent = %id, "agent despawned");
        }

        self.resolver.prepare(scene);

        let mut spawned = Vec::new();
        let mut seen = HashSet::new();
        for agent in &scene.agents {
            if !seen.insert(&agent.id) {
                warn!(agent = %agent.id, "duplicate agent id in scene, ignoring repeat");
                continue;
            }
            let target = self.resolver.resolve_target(agent, scene);
            match self.positions.get_mut(&agent.id) {
                Some(state) => state.set_target(target),
                None => {
                    debug!(agent = %agent.id, x = target.x, y = target.y, "agent spawned");
                    self.positions.insert(agent.id.clone(), PositionState::at(target));
                    spawned.push(agent.id.clone());
                }
            }
        }

        let settled = self.integrate();
        self.ticks += 1;
        TickReport { spawned, despawned, settled }
    }

    fn integrate(&mut self) -> bool {
        let grid = SpatialGrid::from_points(
            self.steering.radius(),
            self.positions.iter().map(|(id, s)| (id, s.position())),
        );
        let steering = self.steering;
        let spring = self.spring;

        let mut settled = true;
        for (id, state) in self.positions.iter_mut() {
            let pos = state.position();
            let outcome = spring.step(state, |dir| steering.steer(id, pos, dir, grid.neighbors(pos)));
            settled &= outcome == StepOutcome::Settled;
        }
        settled
    }

    /// Read-only view of every tracked agent.
    pub fn positions(&self) -> &HashMap<AgentId, PositionState> {
        &self.positions
    }

    pub fn get(&self, id: &AgentId) -> Option<&PositionState> {
        self.positions.get(id)
    }

    /// Current position of `id`, or the canvas centre on the root row when
    /// the agent is not tracked.
    pub fn position_of(&self, id: &AgentId) -> Vec2 {
        self.positions
            .get(id)
            .map(PositionState::position)
            .unwrap_or_else(|| self.resolver.fallback(self.dimensions))
    }

    pub fn is_settled(&self) -> bool {
        self.positions.values().all(PositionState::is_at_rest)
    }

    /// Jump every agent onto its target.
    pub fn settle(&mut self) {
        for state in self.positions.values_mut() {
            state.snap_to_target();
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Serializable copy of the map, sorted by id.
    pub fn snapshot(&self) -> FrameOutput {
        let mut positions: Vec<PositionOutput> = self
            .positions
            .iter()
            .map(|(id, s)| PositionOutput::new(id, s))
            .collect();
        positions.sort_by(|a, b| a.id.cmp(&b.id));
        FrameOutput {
            positions,
            settled: self.is_settled(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Agent, AgentStatus, Service, ServiceId, UserNode};

    fn scene(agents: Vec<Agent>) -> Scene {
        Scene {
            agents,
            services: vec![Service { id: ServiceId::from("llm"), x: 300.0, y: 600.0 }],
            user: UserNode { x: 500.0, y: 650.0 },
            dimensions: Dimensions { width: 1000.0, height: 800.0 },
        }
    }

    fn id(s: &str) -> AgentId {
        AgentId::from(s)
    }

    #[test]
    fn test_new_agent_seeded_at_target() {
        let mut engine = LayoutEngine::default();
        let report = engine.tick(&scene(vec![Agent::new("a", AgentStatus::Pending)]));
        assert_eq!(report.spawned, vec![id("a")]);
        assert!(report.settled);

        let state = engine.get(&id("a")).unwrap();
        assert_eq!(state.position(), Vec2::new(500.0, 120.0));
        assert_eq!(state.velocity(), Vec2::ZERO);
        assert!(engine.is_settled());
    }

    #[test]
    fn test_removed_agent_dropped_after_one_tick() {
        let mut engine = LayoutEngine::default();
        let full = scene(vec![
            Agent::new("a", AgentStatus::Running),
            Agent::new("b", AgentStatus::Running),
            Agent::new("kid", AgentStatus::Running).with_parent("b"),
        ]);
        engine.tick(&full);
        let before: HashMap<AgentId, Vec2> = engine
            .positions()
            .iter()
            .map(|(k, s)| (k.clone(), s.target()))
            .collect();

        let report = engine.tick(&scene(full.agents[..2].to_vec()));
        assert_eq!(report.despawned, vec![id("kid")]);
        assert!(engine.get(&id("kid")).is_none());
        assert_eq!(engine.len(), 2);
        for key in ["a", "b"] {
            assert_eq!(engine.get(&id(key)).unwrap().target(), before[&id(key)]);
        }
    }

    #[test]
    fn test_retarget_keeps_velocity() {
        let cfg = LayoutConfig { leader_spacing_max: 1000.0, ..LayoutConfig::default() };
        let mut engine = LayoutEngine::new(cfg).unwrap();
        let mut s = scene(vec![Agent::new("a", AgentStatus::Running)]);
        s.dimensions.width = 3000.0;
        engine.tick(&s);

        s.agents.push(Agent::new("b", AgentStatus::Running));
        for _ in 0..5 {
            engine.tick(&s);
        }
        let moving = *engine.get(&id("a")).unwrap();
        assert!(moving.vx < -1.8);

        s.agents.push(Agent::new("c", AgentStatus::Running));
        engine.tick(&s);
        let after = engine.get(&id("a")).unwrap();
        assert!(after.target_x < moving.target_x);
        assert!(after.vx < moving.vx, "velocity was reset: {} vs {}", after.vx, moving.vx);
    }

    #[test]
    fn test_agents_converge_and_settle() {
        let mut engine = LayoutEngine::default();
        let mut s = scene(vec![Agent::new("a", AgentStatus::Running)]);
        engine.tick(&s);
        s.agents.push(Agent::new("b", AgentStatus::Running));
        s.agents.push(Agent::new("c", AgentStatus::WaitingApproval));

        let mut settled = false;
        for _ in 0..400 {
            if engine.tick(&s).settled {
                settled = true;
                break;
            }
        }
        assert!(settled);
        for state in engine.positions().values() {
            assert_eq!(state.position(), state.target());
        }
    }

    #[test]
    fn test_unknown_id_falls_back() {
        let mut engine = LayoutEngine::default();
        engine.tick(&scene(vec![]));
        assert_eq!(engine.position_of(&id("nobody")), Vec2::new(500.0, 120.0));
    }

    #[test]
    fn test_duplicate_ids_tracked_once() {
        let mut engine = LayoutEngine::default();
        let report = engine.tick(&scene(vec![
            Agent::new("a", AgentStatus::Running),
            Agent::new("a", AgentStatus::WaitingApproval),
        ]));
        assert_eq!(report.spawned, vec![id("a")]);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_settle_snaps_everything() {
        let mut engine = LayoutEngine::default();
        let mut s = scene(vec![Agent::new("a", AgentStatus::Running)]);
        engine.tick(&s);
        s.agents.push(Agent::new("b", AgentStatus::Running));
        engine.tick(&s);
        assert!(!engine.is_settled());
        engine.settle();
        assert!(engine.is_settled());
        assert!(engine.snapshot().settled);
    }

    #[test]
    fn test_engines_are_deterministic_and_isolated() {
        let frames = vec![
            scene(vec![Agent::new("r", AgentStatus::Running)]),
            scene(vec![
                Agent::new("r", AgentStatus::Running),
                Agent::new("k1", AgentStatus::Running).with_parent("r").with_service("llm"),
                Agent::new("k2", AgentStatus::Running).with_parent("r").with_service("llm"),
                Agent::new("k3", AgentStatus::Running).with_parent("r"),
                Agent::new("q", AgentStatus::WaitingApproval).with_parent("r"),
            ]),
        ];
        let mut one = LayoutEngine::default();
        let mut two = LayoutEngine::default();
        for frame in frames.iter().cycle().take(60) {
            one.tick(frame);
            two.tick(frame);
        }
        assert_eq!(one.snapshot(), two.snapshot());

        let fresh = LayoutEngine::default();
        assert!(fresh.is_empty());
        assert_eq!(fresh.tick_count(), 0);
        assert_eq!(one.tick_count(), 60);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = LayoutConfig { stiffness: 0.0, ..LayoutConfig::default() };
        assert!(LayoutEngine::new(cfg).is_err());
    }

    #[test]
    fn test_snapshot_sorted_by_id() {
        let mut engine = LayoutEngine::default();
        engine.tick(&scene(vec![
            Agent::new("zed", AgentStatus::Running),
            Agent::new("alpha", AgentStatus::Running),
        ]));
        let ids: Vec<String> = engine.snapshot().positions.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["alpha".to_string(), "zed".to_string()]);
    }
}
