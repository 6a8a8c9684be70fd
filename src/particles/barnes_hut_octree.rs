//! Barnes-Hut octree over bodies stored in a [`ParticlePool`].
//!
//! Nodes live in an arena (`Vec<BhNode>`) and refer to their children by
//! index, so resetting the tree is a single `clear` with no recursive
//! teardown. Nodes hold [`Body`] handles rather than particle data; positions
//! are read from the pool while inserting.
//!
//! Every node along a body's insertion path records that body and folds its
//! mass into the node aggregate, not only the terminal leaf. When a body
//! reaches a node whose target octant has no child yet, the node's whole body
//! list is replayed into the octants that are spawned by that pass.
//!
//! The tree never reports errors. Non-finite positions propagate through
//! the aggregates unchecked, so callers must supply finite positions.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use starwell::particles::{BarnesHutTree, ParticlePool};
//!
//! let mut pool = ParticlePool::with_capacity(8);
//! let a = pool.create(Vector3::new(0.0, 0.0, 0.0), Vector3::zeros(), 1.0, None).unwrap();
//! let b = pool.create(Vector3::new(4.0, 0.0, 0.0), Vector3::zeros(), 2.0, None).unwrap();
//!
//! let mut tree = BarnesHutTree::new();
//! tree.insert(&pool, a);
//! tree.insert(&pool, b);
//!
//! // K * m_b / d, pointing from a towards b.
//! let field = tree.field_at(&Vector3::new(0.0, 0.0, 0.0), 1.0);
//! assert!((field.x - 10.0 * 2.0 / 4.0).abs() < 1e-4);
//! ```
use std::fmt;

use log::{debug, warn};
use nalgebra::Vector3;

use crate::particles::{Body, ParticlePool};
use crate::utils::{SimulationConstants, OCTANT_OFFSETS};

/// Index of a node inside the tree arena.
pub type NodeId = usize;

/// The root always occupies the first arena slot.
pub const ROOT_NODE: NodeId = 0;

/// One cubic cell of the octree.
#[derive(Debug, Clone)]
pub struct BhNode {
    children: [Option<NodeId>; 8],
    bodies: Vec<Body>,
    mass: f32,
    center_of_mass_weighted: Vector3<f32>,
    center_of_mass: Vector3<f32>,
    node_center: Vector3<f32>,
    node_size: f32,
    depth: usize,
}

impl BhNode {
    fn new(node_center: Vector3<f32>, node_size: f32, depth: usize) -> Self {
        Self {
            children: [None; 8],
            bodies: Vec::new(),
            mass: 0.0,
            center_of_mass_weighted: Vector3::zeros(),
            center_of_mass: Vector3::zeros(),
            node_center,
            node_size,
            depth,
        }
    }

    pub fn children(&self) -> &[Option<NodeId>; 8] {
        &self.children
    }

    pub fn child(&self, octant: usize) -> Option<NodeId> {
        self.children[octant]
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    /// Every body whose insertion path passed through this node, in insertion order.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Running `sum(mass * position)` over [`BhNode::bodies`].
    pub fn center_of_mass_weighted(&self) -> Vector3<f32> {
        self.center_of_mass_weighted
    }

    /// `center_of_mass_weighted / mass`; zero for an empty node.
    pub fn center_of_mass(&self) -> Vector3<f32> {
        self.center_of_mass
    }

    pub fn node_center(&self) -> Vector3<f32> {
        self.node_center
    }

    /// Edge length of the cell.
    pub fn node_size(&self) -> f32 {
        self.node_size
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn accumulate(&mut self, body: Body, position: Vector3<f32>) {
        let mass = body.mass();
        if self.bodies.is_empty() {
            self.mass = mass;
            self.center_of_mass_weighted = mass * position;
            self.center_of_mass = position;
        } else {
            self.center_of_mass_weighted += mass * position;
            self.mass += mass;
            self.center_of_mass = self.center_of_mass_weighted / self.mass;
        }
        self.bodies.push(body);
    }
}

/// Octant of `position` relative to `center`: x selects bit 2, y bit 1, z bit 0.
///
/// A coordinate equal to the center counts as the upper half.
pub fn octant_index(position: &Vector3<f32>, center: &Vector3<f32>) -> usize {
    let mut index = 0;
    index |= ((position.x >= center.x) as usize) << 2;
    index |= ((position.y >= center.y) as usize) << 1;
    index |= (position.z >= center.z) as usize;
    index
}

/// Barnes-Hut octree rebuilt from scratch every simulation step.
///
/// Usage is strictly phased: insert every body, then query, then
/// [`BarnesHutTree::reset`]. Aggregates are only complete once every body
/// has been inserted, so queries must not be interleaved with insertions.
#[derive(Debug, Clone)]
pub struct BarnesHutTree {
    nodes: Vec<BhNode>,
    root_center: Vector3<f32>,
    root_size: f32,
    max_depth: usize,
    force_constant: f32,
    self_interaction_epsilon: f32,
}

impl Default for BarnesHutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BarnesHutTree {
    /// Creates a tree using the default constants, rooted at the origin.
    pub fn new() -> Self {
        Self::from_constants(&SimulationConstants::default())
    }

    /// Creates a tree whose root size, depth limit, force constant and
    /// self-interaction epsilon come from `constants`.
    pub fn from_constants(constants: &SimulationConstants) -> Self {
        Self::with_root(Vector3::zeros(), constants.root_size, constants)
    }

    /// Creates a tree with an explicit root cell.
    pub fn with_root(root_center: Vector3<f32>, root_size: f32, constants: &SimulationConstants) -> Self {
        Self {
            nodes: vec![BhNode::new(root_center, root_size, 0)],
            root_center,
            root_size,
            max_depth: constants.max_depth,
            force_constant: constants.force_constant,
            self_interaction_epsilon: constants.self_interaction_epsilon,
        }
    }

    /// Drops every node and starts over with an empty root.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(BhNode::new(self.root_center, self.root_size, 0));
    }

    /// Inserts `body`, whose position is read from `pool`.
    ///
    /// A handle that `pool` no longer recognizes is skipped with a warning.
    pub fn insert(&mut self, pool: &ParticlePool, body: Body) {
        match pool.position_of(&body) {
            Ok(position) => self.insert_into(ROOT_NODE, pool, body, position),
            Err(err) => warn!("Skipping body during tree insertion: {}", err),
        }
    }

    fn insert_into(&mut self, node_id: NodeId, pool: &ParticlePool, body: Body, position: Vector3<f32>) {
        let max_depth = self.max_depth;
        let node = &mut self.nodes[node_id];

        if node.bodies.is_empty() {
            node.accumulate(body, position);
            return;
        }

        node.accumulate(body, position);

        if node.depth >= max_depth {
            if node.bodies.len() == 2 {
                warn!(
                    "Octree depth limit {} reached near {:?}; merging bodies into one leaf",
                    max_depth, node.node_center
                );
            }
            return;
        }

        let octant = octant_index(&position, &node.node_center);
        let existing = node.children[octant];
        match existing {
            Some(child) => self.insert_into(child, pool, body, position),
            None => self.spawn_children(node_id, pool),
        }
    }

    /// Replays the node's accumulated bodies into the octants created by this pass.
    ///
    /// Bodies whose octant already had a child are left alone: they reached
    /// that child when they were first inserted.
    fn spawn_children(&mut self, parent: NodeId, pool: &ParticlePool) {
        let mut spawned = [false; 8];

        for i in 0..self.nodes[parent].bodies.len() {
            let body = self.nodes[parent].bodies[i];
            let Ok(position) = pool.position_of(&body) else {
                continue;
            };

            let octant = octant_index(&position, &self.nodes[parent].node_center);
            let existing = self.nodes[parent].children[octant];
            let child = match existing {
                Some(child) => child,
                None => {
                    let child = self.push_child(parent, octant);
                    spawned[octant] = true;
                    child
                }
            };

            if spawned[octant] {
                self.insert_into(child, pool, body, position);
            }
        }
    }

    fn push_child(&mut self, parent: NodeId, octant: usize) -> NodeId {
        let parent_node = &self.nodes[parent];
        let center = parent_node.node_center + 0.25 * parent_node.node_size * OCTANT_OFFSETS[octant];
        let child = BhNode::new(center, 0.5 * parent_node.node_size, parent_node.depth + 1);

        let id = self.nodes.len();
        self.nodes.push(child);
        self.nodes[parent].children[octant] = Some(id);
        id
    }

    /// Approximates the field at `point` with opening-angle `threshold`.
    ///
    /// A node is treated as one aggregate mass when `node_size / distance`
    /// is below `threshold` or when it holds a single body; its contribution
    /// is `K * mass / distance` towards its center of mass. A single-body node
    /// closer than the self-interaction epsilon contributes nothing.
    pub fn field_at(&self, point: &Vector3<f32>, threshold: f32) -> Vector3<f32> {
        self.field_at_node(ROOT_NODE, point, threshold)
    }

    fn field_at_node(&self, node_id: NodeId, point: &Vector3<f32>, threshold: f32) -> Vector3<f32> {
        let node = &self.nodes[node_id];
        if node.bodies.is_empty() {
            return Vector3::zeros();
        }

        let offset = node.center_of_mass - point;
        let distance = offset.norm();
        let single = node.bodies.len() == 1;

        // Self-interaction
        if single && distance < self.self_interaction_epsilon {
            return Vector3::zeros();
        }

        if single || node.node_size / distance < threshold {
            return (self.force_constant * node.mass / distance) * (offset / distance);
        }

        node.children
            .iter()
            .flatten()
            .map(|&child| self.field_at_node(child, point, threshold))
            .fold(Vector3::zeros(), |acc, field| acc + field)
    }

    /// Counts the nodes reachable from the root, root included.
    pub fn node_count(&self) -> usize {
        self.count_from(ROOT_NODE)
    }

    fn count_from(&self, node_id: NodeId) -> usize {
        1 + self.nodes[node_id]
            .children
            .iter()
            .flatten()
            .map(|&child| self.count_from(child))
            .sum::<usize>()
    }

    pub fn root(&self) -> &BhNode {
        &self.nodes[ROOT_NODE]
    }

    pub fn node(&self, id: NodeId) -> Option<&BhNode> {
        self.nodes.get(id)
    }

    /// All nodes in allocation order; the root comes first.
    pub fn nodes(&self) -> &[BhNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn force_constant(&self) -> f32 {
        self.force_constant
    }

    /// Writes the indented node dump to the debug log.
    pub fn log_nodes(&self) {
        for line in self.to_string().lines() {
            debug!("{}", line);
        }
    }

    fn write_node(&self, f: &mut fmt::Formatter, node_id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.nodes[node_id];
        let indent = "\t".repeat(depth);
        let com = node.center_of_mass;

        writeln!(f, "{}Node {}:", indent, depth)?;
        writeln!(f, "{}\t- Mass           : {}", indent, node.mass)?;
        writeln!(f, "{}\t- Bodies         : {}", indent, node.bodies.len())?;
        writeln!(f, "{}\t- Center of Mass : ({}, {}, {})", indent, com.x, com.y, com.z)?;
        writeln!(f, "{}\t- Child Count    : {}", indent, node.children.iter().flatten().count())?;

        for &child in node.children.iter().flatten() {
            self.write_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for BarnesHutTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_node(f, ROOT_NODE, 0)
    }
}
