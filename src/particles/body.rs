use nalgebra::Vector3;

use crate::particles::ParticlePool;
use crate::utils::{SimulationError, TIME_STEP};

/// Lightweight handle to one particle slot in a [`ParticlePool`].
///
/// A body owns nothing but its mass. Position, velocity and force live in
/// the pool and are reached through the slot index. The handle also records
/// the pool generation it was issued in, so it is refused once the pool is
/// reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    index: usize,
    generation: u32,
    mass: f32,
}

impl Body {
    pub(crate) fn new(index: usize, generation: u32, mass: f32) -> Self {
        Self { index, generation, mass }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Slot index shared by every sequence of the owning pool.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns true while the handle still refers to a live slot of `pool`.
    pub fn is_valid(&self, pool: &ParticlePool) -> bool {
        pool.slot_of(self).is_ok()
    }

    pub fn position(&self, pool: &ParticlePool) -> Result<Vector3<f32>, SimulationError> {
        pool.position_of(self)
    }

    pub fn velocity(&self, pool: &ParticlePool) -> Result<Vector3<f32>, SimulationError> {
        pool.velocity_of(self)
    }

    /// Advances the body by the fixed [`TIME_STEP`] under `field`.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::Vector3;
    /// use starwell::particles::ParticlePool;
    ///
    /// let mut pool = ParticlePool::with_capacity(4);
    /// let body = pool.create(Vector3::zeros(), Vector3::zeros(), 1.0, None).unwrap();
    /// body.move_by_field(&mut pool, &Vector3::new(1.0, 0.0, 0.0)).unwrap();
    ///
    /// // v = 0.01 * 2 * 1, x = 0.01 * v
    /// assert!((body.velocity(&pool).unwrap().x - 0.02).abs() < 1e-7);
    /// assert!((body.position(&pool).unwrap().x - 0.0002).abs() < 1e-9);
    /// ```
    pub fn move_by_field(&self, pool: &mut ParticlePool, field: &Vector3<f32>) -> Result<(), SimulationError> {
        self.move_by_field_with_step(pool, field, TIME_STEP)
    }

    /// Semi-implicit Euler step: `force = mass * field`,
    /// `velocity += dt * 2 * force`, `position += dt * velocity`.
    pub fn move_by_field_with_step(
        &self,
        pool: &mut ParticlePool,
        field: &Vector3<f32>,
        dt: f32,
    ) -> Result<(), SimulationError> {
        let slot = pool.slot_of(self)?;
        pool.integrate(slot, self.mass * field, dt);
        Ok(())
    }
}
