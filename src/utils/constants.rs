use nalgebra::Vector3;
use crate::utils;

/// Fixed integration step used by `Body::move_by_field`.
pub const TIME_STEP: f32 = 0.01;

/// Tuned scale of the inverse-distance field law.
pub const FORCE_CONSTANT: f32 = 10.0;

/// Opening-angle threshold used by the simulation loop.
pub const OPENING_ANGLE: f32 = 0.5;

/// Slots reserved by the particle pool on first use.
pub const POOL_CAPACITY: usize = 1_000_000;

/// Edge length of the root cell.
pub const ROOT_NODE_SIZE: f32 = 1e12;

/// Deepest level at which a node may still spawn children.
pub const MAX_TREE_DEPTH: usize = 64;

/// Distance below which a single-body node is treated as the query point itself.
pub const SELF_INTERACTION_EPSILON: f32 = 1e-8;

/// Half-extent of the unit cube whose corners give the octant offsets.
pub const OCTANT_UNIT: f32 = 1.0;

/// Corner offsets of the unit cube, indexed by octant.
///
/// Bit 2 of the index selects +x, bit 1 selects +y and bit 0 selects +z, so a
/// child's center is `parent.center + 0.25 * parent.size * OCTANT_OFFSETS[i]`.
pub const OCTANT_OFFSETS: [Vector3<f32>; 8] = [
    Vector3::new(-OCTANT_UNIT, -OCTANT_UNIT, -OCTANT_UNIT),
    Vector3::new(-OCTANT_UNIT, -OCTANT_UNIT, OCTANT_UNIT),
    Vector3::new(-OCTANT_UNIT, OCTANT_UNIT, -OCTANT_UNIT),
    Vector3::new(-OCTANT_UNIT, OCTANT_UNIT, OCTANT_UNIT),
    Vector3::new(OCTANT_UNIT, -OCTANT_UNIT, -OCTANT_UNIT),
    Vector3::new(OCTANT_UNIT, -OCTANT_UNIT, OCTANT_UNIT),
    Vector3::new(OCTANT_UNIT, OCTANT_UNIT, -OCTANT_UNIT),
    Vector3::new(OCTANT_UNIT, OCTANT_UNIT, OCTANT_UNIT),
];

pub const DEFAULT_SIMULATION_CONSTANTS: utils::SimulationConstants = utils::SimulationConstants {
    time_step: TIME_STEP,
    force_constant: FORCE_CONSTANT,
    opening_angle: OPENING_ANGLE,
    pool_capacity: POOL_CAPACITY,
    root_size: ROOT_NODE_SIZE,
    max_depth: MAX_TREE_DEPTH,
    self_interaction_epsilon: SELF_INTERACTION_EPSILON,
};
