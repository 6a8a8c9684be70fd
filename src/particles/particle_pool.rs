//! Structure-of-arrays storage for every simulated particle.
//!
//! The pool keeps four index-aligned sequences (position, velocity, force and
//! color). Slot `i` of every sequence belongs to the same particle, so a
//! renderer can stream [`ParticlePool::positions_flat`] and
//! [`ParticlePool::colors_flat`] straight into vertex buffers without copying.
//!
//! Bodies address their slot by index, never by reference. Growing past the
//! reserved capacity therefore cannot dangle a [`Body`]; it only breaks the
//! "no reallocation mid-run" promise made to renderers, which is logged.
//! [`ParticlePool::reset`] bumps the pool generation, and every handle issued
//! before it is rejected afterwards with [`SimulationError::StaleHandle`].
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use starwell::particles::ParticlePool;
//!
//! let mut pool = ParticlePool::with_capacity(16);
//! let body = pool
//!     .create(Vector3::new(1.0, 2.0, 3.0), Vector3::zeros(), 1.0, None)
//!     .expect("valid body");
//!
//! assert_eq!(pool.len(), 1);
//! assert_eq!(pool.positions_flat(), &[1.0, 2.0, 3.0]);
//! assert_eq!(body.position(&pool).unwrap(), Vector3::new(1.0, 2.0, 3.0));
//! ```
use log::{info, warn};
use nalgebra::Vector3;

use crate::particles::Body;
use crate::utils::{SimulationError, POOL_CAPACITY};

/// RGBA color, one byte per channel.
pub type Color = [u8; 4];

/// Color given to particles created without one.
pub const DEFAULT_COLOR: Color = [255, 255, 255, 255];

/// Append-only, index-aligned particle attribute storage.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    positions: Vec<Vector3<f32>>,
    velocities: Vec<Vector3<f32>>,
    forces: Vec<Vector3<f32>>,
    colors: Vec<Color>,
    capacity: usize,
    generation: u32,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticlePool {
    /// Creates an empty pool that will reserve [`POOL_CAPACITY`] slots on first use.
    pub fn new() -> Self {
        Self::with_capacity(POOL_CAPACITY)
    }

    /// Creates an empty pool that will reserve `capacity` slots on first use.
    ///
    /// Nothing is allocated until the first [`ParticlePool::create`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::new(),
            velocities: Vec::new(),
            forces: Vec::new(),
            colors: Vec::new(),
            capacity,
            generation: 0,
        }
    }

    /// Appends one particle to every sequence and returns a handle to its slot.
    ///
    /// Exceeding the reserved capacity is logged, not refused: the sequences
    /// grow and existing handles stay valid, but any buffer a renderer mapped
    /// from the old allocation must be re-read.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidMass`] if `mass` is not a positive finite number.
    pub fn create(
        &mut self,
        position: Vector3<f32>,
        velocity: Vector3<f32>,
        mass: f32,
        color: Option<Color>,
    ) -> Result<Body, SimulationError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimulationError::InvalidMass(mass));
        }

        if self.positions.capacity() == 0 {
            info!("Creating particle pool with {} capacity", self.capacity);
            self.reserve_all(self.capacity);
        }

        if self.positions.len() == self.capacity {
            warn!(
                "Particle pool reached its reserved capacity of {}; buffers will reallocate",
                self.capacity
            );
        }

        let index = self.positions.len();
        self.positions.push(position);
        self.velocities.push(velocity);
        self.forces.push(Vector3::zeros());
        self.colors.push(color.unwrap_or(DEFAULT_COLOR));

        Ok(Body::new(index, self.generation, mass))
    }

    /// Same as [`ParticlePool::create`], but refuses to grow past the reservation.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::CapacityExceeded`] when the pool is full, or
    /// [`SimulationError::InvalidMass`] for a bad mass.
    pub fn try_create(
        &mut self,
        position: Vector3<f32>,
        velocity: Vector3<f32>,
        mass: f32,
        color: Option<Color>,
    ) -> Result<Body, SimulationError> {
        if self.positions.len() >= self.capacity {
            return Err(SimulationError::CapacityExceeded { capacity: self.capacity });
        }
        self.create(position, velocity, mass, color)
    }

    /// Clears every sequence, releases the backing storage and invalidates
    /// every outstanding [`Body`].
    pub fn reset(&mut self) {
        self.positions.clear();
        self.velocities.clear();
        self.forces.clear();
        self.colors.clear();

        self.positions.shrink_to_fit();
        self.velocities.shrink_to_fit();
        self.forces.shrink_to_fit();
        self.colors.shrink_to_fit();

        self.generation = self.generation.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of slots reserved on first use.
    pub fn reserved_capacity(&self) -> usize {
        self.capacity
    }

    /// Bumped by every [`ParticlePool::reset`].
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn positions(&self) -> &[Vector3<f32>] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vector3<f32>] {
        &self.velocities
    }

    pub fn forces(&self) -> &[Vector3<f32>] {
        &self.forces
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Positions as a flat `x, y, z, x, y, z, ...` buffer.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Colors as a flat `r, g, b, a, r, g, b, a, ...` buffer.
    pub fn colors_flat(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Resolves a handle to its slot index, rejecting handles from an older generation.
    pub fn slot_of(&self, body: &Body) -> Result<usize, SimulationError> {
        if body.generation() != self.generation || body.index() >= self.positions.len() {
            return Err(SimulationError::StaleHandle {
                index: body.index(),
                handle_generation: body.generation(),
                pool_generation: self.generation,
            });
        }
        Ok(body.index())
    }

    pub fn position_of(&self, body: &Body) -> Result<Vector3<f32>, SimulationError> {
        self.slot_of(body).map(|i| self.positions[i])
    }

    pub fn velocity_of(&self, body: &Body) -> Result<Vector3<f32>, SimulationError> {
        self.slot_of(body).map(|i| self.velocities[i])
    }

    pub fn force_of(&self, body: &Body) -> Result<Vector3<f32>, SimulationError> {
        self.slot_of(body).map(|i| self.forces[i])
    }

    /// Semi-implicit Euler step on one slot: the force is stored, then the
    /// velocity, then the position is advanced with the new velocity.
    pub(crate) fn integrate(&mut self, slot: usize, force: Vector3<f32>, dt: f32) {
        self.forces[slot] = force;
        self.velocities[slot] += dt * 2.0 * force;
        self.positions[slot] += dt * self.velocities[slot];
    }

    fn reserve_all(&mut self, additional: usize) {
        self.positions.reserve_exact(additional);
        self.velocities.reserve_exact(additional);
        self.forces.reserve_exact(additional);
        self.colors.reserve_exact(additional);
    }
}
