use nalgebra::Vector3;

use crate::particles::{Body, ParticlePool};

/// Exact O(n) field at `point` under the same inverse-distance law the
/// octree approximates.
///
/// Bodies closer than `epsilon` to `point` are excluded, matching the tree's
/// self-interaction rule. Stale handles are ignored.
///
/// # Example
///
/// ```
/// use nalgebra::Vector3;
/// use starwell::particles::{direct_field_at, ParticlePool};
///
/// let mut pool = ParticlePool::with_capacity(4);
/// let bodies = vec![
///     pool.create(Vector3::new(2.0, 0.0, 0.0), Vector3::zeros(), 1.0, None).unwrap(),
///     pool.create(Vector3::new(-2.0, 0.0, 0.0), Vector3::zeros(), 1.0, None).unwrap(),
/// ];
///
/// // Symmetric masses cancel at the origin.
/// let field = direct_field_at(&pool, &bodies, &Vector3::zeros(), 10.0, 1e-8);
/// assert!(field.norm() < 1e-6);
/// ```
pub fn direct_field_at(
    pool: &ParticlePool,
    bodies: &[Body],
    point: &Vector3<f32>,
    force_constant: f32,
    epsilon: f32,
) -> Vector3<f32> {
    bodies
        .iter()
        .filter_map(|body| pool.position_of(body).ok().map(|position| (body.mass(), position)))
        .fold(Vector3::zeros(), |field, (mass, position)| {
            let offset = position - point;
            let distance = offset.norm();
            if distance < epsilon {
                field
            } else {
                field + (force_constant * mass / distance) * (offset / distance)
            }
        })
}
