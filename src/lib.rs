//! Barnes-Hut gravity approximation over a structure-of-arrays particle pool.
//!
//! - [`particles::ParticlePool`] stores particle attributes in index-aligned
//!   sequences that renderers can read as flat buffers.
//! - [`particles::BarnesHutTree`] approximates the field at any point in
//!   O(log n) per query.
//! - [`particles::NBodySimulation`] runs the insert, query, move, reset cycle.
pub mod utils;
pub mod particles;
