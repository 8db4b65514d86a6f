// Hierarchical tree layout for parent -> child agent groups.
//
// Algorithm:
// 1. Build a forest over non-queued agents. A parent link only counts when the
//    parent is itself in the forest; everything else becomes a root.
// 2. Walk top-down assigning depth. Nodes past the depth cap and members of
//    parent cycles are cut loose and walked again as roots.
// 3. Measure subtree widths bottom-up: max(spacing, sum of children).
// 4. Place top-down with a running cursor; roots are centred on the canvas.
//
// Children and roots are ordered by agent id, never by input order.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, warn};

use super::{LayoutConfig, Vec2};
use crate::model::{Agent, AgentId};

/// Node of the ephemeral layout forest. Rebuilt from scratch on every rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: AgentId,
    pub children: Vec<AgentId>,
    pub depth: usize,
    /// Horizontal space reserved for this node and all its descendants.
    pub subtree_width: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    /// Roots in placement order (left to right).
    pub roots: Vec<AgentId>,
    pub nodes: HashMap<AgentId, TreeNode>,
}

impl Forest {
    pub fn get(&self, id: &AgentId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, id: &AgentId) -> Option<Vec2> {
        self.nodes.get(id).map(|n| Vec2::new(n.x, n.y))
    }

    pub fn positions(&self) -> HashMap<AgentId, Vec2> {
        self.nodes
            .iter()
            .map(|(id, n)| (id.clone(), Vec2::new(n.x, n.y)))
            .collect()
    }

    /// Sum of the root subtree widths.
    pub fn total_width(&self) -> f64 {
        self.roots
            .iter()
            .filter_map(|r| self.nodes.get(r))
            .map(|n| n.subtree_width)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct TreeLayoutEngine {
    node_spacing: f64,
    level_height: f64,
    base_y: f64,
    max_depth: usize,
}

impl TreeLayoutEngine {
    pub fn new(cfg: &LayoutConfig) -> Self {
        Self {
            node_spacing: cfg.tree_node_spacing,
            level_height: cfg.tree_level_height,
            base_y: cfg.root_row_y,
            max_depth: cfg.tree_max_depth,
        }
    }

    /// Positions for every non-queued agent, centred on a canvas of `width`.
    pub fn layout(&self, agents: &[Agent], width: f64) -> HashMap<AgentId, Vec2> {
        self.build_forest(agents, width).positions()
    }

    pub fn build_forest(&self, agents: &[Agent], width: f64) -> Forest {
        // First occurrence of an id wins.
        let mut parent_of: BTreeMap<AgentId, Option<AgentId>> = BTreeMap::new();
        for agent in agents.iter().filter(|a| !a.status.is_queued()) {
            if !parent_of.contains_key(&agent.id) {
                parent_of.insert(agent.id.clone(), agent.parent_id.clone());
            }
        }

        // BTreeMap iteration keeps both lists sorted by id.
        let mut children: BTreeMap<AgentId, Vec<AgentId>> = BTreeMap::new();
        let mut pending: VecDeque<AgentId> = VecDeque::new();
        for (id, parent) in &parent_of {
            match parent {
                Some(p) if p != id && parent_of.contains_key(p) => {
                    children.entry(p.clone()).or_default().push(id.clone());
                }
                _ => pending.push_back(id.clone()),
            }
        }

        let mut forest = Forest::default();
        loop {
            while let Some(root) = pending.pop_front() {
                if forest.nodes.contains_key(&root) {
                    continue;
                }
                forest.roots.push(root.clone());
                self.attach(&root, 0, &children, &mut forest.nodes, &mut pending);
            }

            // Whatever the walk never reached hangs off a parent cycle.
            match parent_of.keys().find(|id| !forest.nodes.contains_key(*id)) {
                Some(id) => {
                    warn!(agent = %id, "parent cycle detected, laying out as root");
                    pending.push_back(id.clone());
                }
                None => break,
            }
        }

        let roots = forest.roots.clone();
        for root in &roots {
            self.measure(root, &mut forest.nodes);
        }

        let mut cursor = width / 2.0 - forest.total_width() / 2.0;
        for root in &roots {
            let w = forest.nodes.get(root).map(|n| n.subtree_width).unwrap_or(self.node_spacing);
            self.place(root, cursor, &mut forest.nodes);
            cursor += w;
        }

        debug!(nodes = forest.len(), roots = forest.roots.len(), "tree forest rebuilt");
        forest
    }

    /// Insert `id` at `depth` and recurse into children that are still free.
    fn attach(
        &self,
        id: &AgentId,
        depth: usize,
        children: &BTreeMap<AgentId, Vec<AgentId>>,
        nodes: &mut HashMap<AgentId, TreeNode>,
        overflow: &mut VecDeque<AgentId>,
    ) {
        nodes.insert(
            id.clone(),
            TreeNode {
                id: id.clone(),
                children: Vec::new(),
                depth,
                subtree_width: self.node_spacing,
                x: 0.0,
                y: 0.0,
            },
        );

        let mut attached = Vec::new();
        for kid in children.get(id).map(Vec::as_slice).unwrap_or(&[]) {
            if nodes.contains_key(kid) {
                continue;
            }
            if depth + 1 > self.max_depth {
                warn!(agent = %kid, max_depth = self.max_depth, "tree depth cap reached, laying out as root");
                overflow.push_back(kid.clone());
                continue;
            }
            self.attach(kid, depth + 1, children, nodes, overflow);
            attached.push(kid.clone());
        }

        if let Some(node) = nodes.get_mut(id) {
            node.children = attached;
        }
    }

    fn measure(&self, id: &AgentId, nodes: &mut HashMap<AgentId, TreeNode>) -> f64 {
        let children = nodes.get(id).map(|n| n.children.clone()).unwrap_or_default();
        let sum: f64 = children.iter().map(|c| self.measure(c, nodes)).sum();
        let width = self.node_spacing.max(sum);
        if let Some(node) = nodes.get_mut(id) {
            node.subtree_width = width;
        }
        width
    }

    fn place(&self, id: &AgentId, cursor: f64, nodes: &mut HashMap<AgentId, TreeNode>) {
        let children = match nodes.get_mut(id) {
            Some(node) => {
                node.x = cursor + node.subtree_width / 2.0;
                node.y = self.base_y + node.depth as f64 * self.level_height;
                node.children.clone()
            }
            None => return,
        };

        let mut child_cursor = cursor;
        for child in &children {
            let w = nodes.get(child).map(|n| n.subtree_width).unwrap_or(self.node_spacing);
            self.place(child, child_cursor, nodes);
            child_cursor += w;
        }
    }
}
