//! Particle sources that seed a simulation with initial bodies.
use std::f32::consts::FRAC_PI_2;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::particles::Color;
use crate::utils::SimulationError;

/// Initial state of one body as supplied by a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySpec {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub mass: f32,
    pub color: Option<Color>,
}

impl BodySpec {
    /// A unit-mass body with the pool's default color.
    pub fn new(position: Vector3<f32>, velocity: Vector3<f32>) -> Self {
        Self { position, velocity, mass: 1.0, color: None }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Anything that can (re)generate the initial bodies of a simulation.
///
/// A source is kept by [`crate::particles::NBodySimulation`] so the same scene can be reloaded.
pub trait SceneSource {
    /// Short label used in log output.
    fn name(&self) -> &str;

    /// Builds the initial bodies, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidScene`] when the scene's parameters cannot produce a
    /// usable set of bodies, e.g. mismatched attribute lists or a negative extent.
    ///
    /// # Examples
    ///
    /// ```
    /// use starwell::particles::{RandomCloudScene, SceneSource};
    ///
    /// let scene = RandomCloudScene::new(16, 5.0, 42);
    /// assert_eq!(scene.bodies().unwrap().len(), 16);
    /// ```
    fn bodies(&self) -> Result<Vec<BodySpec>, SimulationError>;
}

/// Parallel attribute lists, e.g. handed over by a scripting layer.
///
/// `colors` may be left empty; otherwise every list must have the same length.
#[derive(Debug, Clone, Default)]
pub struct ExplicitScene {
    pub positions: Vec<Vector3<f32>>,
    pub velocities: Vec<Vector3<f32>>,
    pub colors: Vec<Color>,
    pub mass: f32,
}

impl ExplicitScene {
    pub fn new(positions: Vec<Vector3<f32>>, velocities: Vec<Vector3<f32>>, colors: Vec<Color>) -> Self {
        Self { positions, velocities, colors, mass: 1.0 }
    }
}

impl SceneSource for ExplicitScene {
    fn name(&self) -> &str {
        "explicit"
    }

    fn bodies(&self) -> Result<Vec<BodySpec>, SimulationError> {
        let n = self.positions.len();
        if self.velocities.len() != n || (!self.colors.is_empty() && self.colors.len() != n) {
            return Err(SimulationError::InvalidScene(format!(
                "expected matching (positions, velocities, colors), got ({}, {}, {})",
                n,
                self.velocities.len(),
                self.colors.len()
            )));
        }

        Ok((0..n)
            .map(|i| BodySpec {
                position: self.positions[i],
                velocity: self.velocities[i],
                mass: self.mass,
                color: self.colors.get(i).copied(),
            })
            .collect())
    }
}

/// Four spinning galaxies on the x/z plane, each drifting sideways so they
/// swirl into each other.
///
/// Each galaxy is a fast outer ring plus a slower, denser core. Bodies are
/// placed at integer angles (radians), which scatters them around the circle.
#[derive(Debug, Clone, Copy)]
pub struct GalaxyCollisionScene {
    pub ring_bodies: usize,
    pub core_bodies: usize,
    pub separation: f32,
    pub ring_radius: f32,
    pub core_radius: f32,
    pub ring_speed: f32,
    pub core_speed: f32,
    pub drift_speed: f32,
}

impl Default for GalaxyCollisionScene {
    fn default() -> Self {
        Self {
            ring_bodies: 500,
            core_bodies: 1000,
            separation: 700.0,
            ring_radius: 200.0,
            core_radius: 100.0,
            ring_speed: 150.0,
            core_speed: 50.0,
            drift_speed: 150.0,
        }
    }
}

impl GalaxyCollisionScene {
    fn push_disc(
        out: &mut Vec<BodySpec>,
        count: usize,
        center: Vector3<f32>,
        drift: Vector3<f32>,
        radius: f32,
        speed: f32,
        color: Color,
    ) {
        out.extend((0..count).map(|i| {
            let angle = i as f32;
            let position = center + Vector3::new(radius * angle.sin(), 0.0, radius * angle.cos());
            let velocity = drift
                + Vector3::new(speed * (angle + FRAC_PI_2).sin(), 0.0, speed * (angle + FRAC_PI_2).cos());
            BodySpec::new(position, velocity).with_color(color)
        }));
    }
}

impl SceneSource for GalaxyCollisionScene {
    fn name(&self) -> &str {
        "galaxy-collision"
    }

    fn bodies(&self) -> Result<Vec<BodySpec>, SimulationError> {
        let s = self.separation;
        let v = self.drift_speed;
        let galaxies = [
            (Vector3::new(-s, 0.0, 0.0), Vector3::new(0.0, 0.0, v), [255, 0, 0, 255]),
            (Vector3::new(s, 0.0, 0.0), Vector3::new(0.0, 0.0, -v), [0, 255, 0, 255]),
            (Vector3::new(0.0, 0.0, -s), Vector3::new(-v, 0.0, 0.0), [0, 0, 255, 255]),
            (Vector3::new(0.0, 0.0, s), Vector3::new(v, 0.0, 0.0), [255, 255, 0, 255]),
        ];

        let mut bodies = Vec::with_capacity(4 * (self.ring_bodies + self.core_bodies));
        for (center, drift, color) in galaxies {
            Self::push_disc(&mut bodies, self.ring_bodies, center, drift, self.ring_radius, self.ring_speed, color);
            Self::push_disc(&mut bodies, self.core_bodies, center, drift, self.core_radius, self.core_speed, color);
        }
        Ok(bodies)
    }
}

/// Uniformly scattered bodies in a cube, reproducible from `seed`.
#[derive(Debug, Clone, Copy)]
pub struct RandomCloudScene {
    pub count: usize,
    pub half_extent: f32,
    pub max_speed: f32,
    pub mass_range: (f32, f32),
    pub seed: u64,
}

impl RandomCloudScene {
    pub fn new(count: usize, half_extent: f32, seed: u64) -> Self {
        Self { count, half_extent, max_speed: 0.0, mass_range: (1.0, 1.0), seed }
    }
}

impl SceneSource for RandomCloudScene {
    fn name(&self) -> &str {
        "random-cloud"
    }

    fn bodies(&self) -> Result<Vec<BodySpec>, SimulationError> {
        let (min_mass, max_mass) = self.mass_range;
        if !(min_mass > 0.0 && min_mass <= max_mass && max_mass.is_finite()) {
            return Err(SimulationError::InvalidScene(format!(
                "mass range must be positive, finite and ordered, got ({}, {})",
                min_mass, max_mass
            )));
        }
        if !(self.half_extent.is_finite() && self.half_extent >= 0.0) {
            return Err(SimulationError::InvalidScene(format!(
                "half_extent must be finite and non-negative, got {}",
                self.half_extent
            )));
        }
        if !(self.max_speed.is_finite() && self.max_speed >= 0.0) {
            return Err(SimulationError::InvalidScene(format!(
                "max_speed must be finite and non-negative, got {}",
                self.max_speed
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let h = self.half_extent;
        let s = self.max_speed;
        Ok((0..self.count)
            .map(|_| {
                let position = Vector3::new(
                    rng.random_range(-h..=h),
                    rng.random_range(-h..=h),
                    rng.random_range(-h..=h),
                );
                let velocity = Vector3::new(
                    rng.random_range(-s..=s),
                    rng.random_range(-s..=s),
                    rng.random_range(-s..=s),
                );
                let mass = rng.random_range(min_mass..=max_mass);
                BodySpec::new(position, velocity).with_mass(mass)
            })
            .collect())
    }
}
