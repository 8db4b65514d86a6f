// Per-agent target resolution.
//
// Rules, first match wins:
// 1. waiting_approval  -> slot on the approval arc around the user node
// 2. running + service -> slot on a ring around that service
// 3. attached to a parent in the forest -> tree coordinate
// 4. otherwise         -> slot on the root row
//
// The forest is only rebuilt when tree membership, a parent link or the canvas
// width changes. Group indices for rules 1, 2 and 4 are recomputed every tick
// because they are cheap and depend on status, which changes constantly.
// Queue and orbit groups are ordered by agent id; the root row follows forest
// order and skips roots that are currently orbiting.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::placement::{orbit_slot, queue_slot, root_slot};
use super::tree::TreeLayoutEngine;
use super::{LayoutConfig, Vec2};
use crate::model::{Agent, AgentId, Dimensions, Scene, ServiceId};

/// Cached tree layout plus the inputs it was computed from.
#[derive(Debug, Clone, Default)]
pub struct TargetCache {
    /// Tree coordinates of agents attached to a parent.
    pub targets: HashMap<AgentId, Vec2>,
    /// Parent link of every tree member when `targets` was computed.
    pub last_parent: HashMap<AgentId, Option<AgentId>>,
    /// Forest roots, left to right.
    roots: Vec<AgentId>,
    last_width: Option<f64>,
}

impl TargetCache {
    /// Clears the cache and returns true when tree membership, any parent link
    /// or the canvas width differs from what the cache was built with.
    pub fn invalidate_if_changed(&mut self, agents: &[Agent], dims: Dimensions) -> bool {
        let current = tree_membership(agents);
        if self.last_width == Some(dims.width) && current == self.last_parent {
            return false;
        }
        self.targets.clear();
        self.roots.clear();
        self.last_parent = current;
        self.last_width = Some(dims.width);
        true
    }

    pub fn roots(&self) -> &[AgentId] {
        &self.roots
    }
}

/// Parent links of the agents that take part in the tree (first occurrence wins).
fn tree_membership(agents: &[Agent]) -> HashMap<AgentId, Option<AgentId>> {
    let mut members = HashMap::new();
    for agent in agents.iter().filter(|a| !a.status.is_queued()) {
        members.entry(agent.id.clone()).or_insert_with(|| agent.parent_id.clone());
    }
    members
}

/// Per-tick indices for the queue, orbit and root-row rules.
#[derive(Debug, Clone, Default)]
struct Groups {
    queue: HashMap<AgentId, usize>,
    queue_len: usize,
    orbit: HashMap<AgentId, usize>,
    orbit_len: HashMap<ServiceId, usize>,
    root: HashMap<AgentId, usize>,
    root_len: usize,
}

#[derive(Debug, Clone)]
pub struct TargetResolver {
    cfg: LayoutConfig,
    tree: TreeLayoutEngine,
    cache: TargetCache,
    groups: Groups,
    rebuilds: u64,
}

impl TargetResolver {
    pub fn new(cfg: &LayoutConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            tree: TreeLayoutEngine::new(cfg),
            cache: TargetCache::default(),
            groups: Groups::default(),
            rebuilds: 0,
        }
    }

    pub fn cache(&self) -> &TargetCache {
        &self.cache
    }

    /// How many times the forest has been rebuilt.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Refresh the per-tick groups and, if membership changed, the forest.
    /// Must run before `resolve_target` for a scene.
    pub fn prepare(&mut self, scene: &Scene) {
        if self.cache.invalidate_if_changed(&scene.agents, scene.dimensions) {
            let forest = self.tree.build_forest(&scene.agents, scene.dimensions.width);
            self.cache.roots = forest.roots.clone();
            self.cache.targets = forest
                .nodes
                .values()
                .filter(|n| n.depth > 0)
                .map(|n| (n.id.clone(), Vec2::new(n.x, n.y)))
                .collect();
            self.rebuilds += 1;
            debug!(rebuilds = self.rebuilds, roots = forest.roots.len(), "target cache invalidated");
        }

        // First occurrence of an id wins; iteration is by id.
        let mut unique: BTreeMap<&AgentId, &Agent> = BTreeMap::new();
        for agent in &scene.agents {
            unique.entry(&agent.id).or_insert(agent);
        }

        let mut groups = Groups::default();
        for agent in unique.values() {
            if agent.status.is_queued() {
                groups.queue.insert(agent.id.clone(), groups.queue_len);
                groups.queue_len += 1;
            } else if let Some(service) = agent.orbit_target().filter(|s| scene.service(s).is_some()) {
                let len = groups.orbit_len.entry(service.clone()).or_insert(0);
                groups.orbit.insert(agent.id.clone(), *len);
                *len += 1;
            }
        }

        for root in &self.cache.roots {
            if groups.orbit.contains_key(root) || groups.queue.contains_key(root) {
                continue;
            }
            groups.root.insert(root.clone(), groups.root_len);
            groups.root_len += 1;
        }
        self.groups = groups;
    }

    /// Target for one agent of the prepared scene.
    ///
    /// An agent that was not part of the prepared scene gets the fallback
    /// coordinate (canvas centre on the root row).
    pub fn resolve_target(&self, agent: &Agent, scene: &Scene) -> Vec2 {
        let dims = scene.dimensions;

        if let Some(&index) = self.groups.queue.get(&agent.id) {
            let user = Vec2::new(scene.user.x, scene.user.y);
            return queue_slot(index, self.groups.queue_len, user, dims, &self.cfg);
        }

        if let (Some(&index), Some(service)) = (
            self.groups.orbit.get(&agent.id),
            agent.orbit_target().and_then(|s| scene.service(s)),
        ) {
            let count = self.groups.orbit_len.get(&service.id).copied().unwrap_or(index + 1);
            return orbit_slot(index, count, Vec2::new(service.x, service.y), &self.cfg);
        }

        if let Some(&target) = self.cache.targets.get(&agent.id) {
            return target;
        }

        if let Some(&index) = self.groups.root.get(&agent.id) {
            return root_slot(index, self.groups.root_len, dims, &self.cfg);
        }

        self.fallback(dims)
    }

    /// Prepare and resolve every agent, in input order, skipping duplicate ids.
    pub fn resolve_all(&mut self, scene: &Scene) -> Vec<(AgentId, Vec2)> {
        self.prepare(scene);
        let mut seen = HashSet::new();
        scene
            .agents
            .iter()
            .filter(|a| seen.insert(&a.id))
            .map(|a| (a.id.clone(), self.resolve_target(a, scene)))
            .collect()
    }

    pub fn fallback(&self, dims: Dimensions) -> Vec2 {
        Vec2::new(dims.width / 2.0, self.cfg.root_row_y)
    }
}
