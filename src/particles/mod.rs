mod particle_pool;
mod body;
mod barnes_hut_octree;
mod direct_summation;
mod scenes;
mod particle_simulation;

pub use particle_pool::*;
pub use body::*;
pub use barnes_hut_octree::*;
pub use direct_summation::*;
pub use scenes::*;
pub use particle_simulation::*;

#[cfg(test)]
mod barnes_hut_octree_tests;
