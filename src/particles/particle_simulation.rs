//! The per-frame driver tying the particle pool to the octree.
//!
//! Every [`NBodySimulation::step`] runs the same strictly ordered cycle:
//! insert every body into a fresh tree, evaluate the field at every body
//! against the completed tree, move every body, then reset the tree. Field
//! queries only read the tree, so with the `parallel` feature they are spread
//! over Rayon's thread pool; insertion and integration stay serial.
//!
//! # Example
//!
//! ```
//! use starwell::particles::{NBodySimulation, RandomCloudScene};
//! use starwell::utils::SimulationConstants;
//!
//! let mut sim = NBodySimulation::new(SimulationConstants::default())
//!     .expect("default constants are valid");
//! sim.load_scene(RandomCloudScene::new(64, 10.0, 7)).expect("scene loads");
//!
//! sim.simulate(3).expect("simulation runs");
//! assert_eq!(sim.step_count(), 3);
//! assert_eq!(sim.pool().positions_flat().len(), 64 * 3);
//! ```
use log::{debug, info};
use nalgebra::Vector3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::particles::{BarnesHutTree, Body, BodySpec, Color, ParticlePool, SceneSource};
use crate::utils::{SimulationConstants, SimulationError};

/// Owns the particle pool, the body handles and the octree, and advances them
/// one fixed time step at a time.
///
/// The tree only holds content during [`NBodySimulation::step`]; it is reset
/// before the call returns. The last loaded [`SceneSource`] is kept so
/// [`NBodySimulation::reload`] can rebuild the initial state.
pub struct NBodySimulation {
    pool: ParticlePool,
    bodies: Vec<Body>,
    tree: BarnesHutTree,
    constants: SimulationConstants,
    source: Option<Box<dyn SceneSource>>,
    steps: u64,
}

impl NBodySimulation {
    /// Creates an empty simulation.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfiguration`] if `constants` fail validation.
    pub fn new(constants: SimulationConstants) -> Result<Self, SimulationError> {
        constants.validate()?;
        Ok(Self {
            pool: ParticlePool::with_capacity(constants.pool_capacity),
            bodies: Vec::new(),
            tree: BarnesHutTree::from_constants(&constants),
            constants,
            source: None,
            steps: 0,
        })
    }

    /// Replaces every body with the ones produced by `source` and remembers
    /// it for [`NBodySimulation::reload`]. Returns the number of bodies created.
    ///
    /// On error the current bodies and scene are left untouched.
    pub fn load_scene<S: SceneSource + 'static>(&mut self, source: S) -> Result<usize, SimulationError> {
        let specs = source.bodies()?;
        info!("Loading scene '{}' with {} bodies", source.name(), specs.len());
        let count = self.populate(specs)?;
        self.source = Some(Box::new(source));
        Ok(count)
    }

    /// Re-runs the current scene source from scratch.
    ///
    /// The pool is reset, so every [`Body`] obtained earlier becomes stale.
    pub fn reload(&mut self) -> Result<usize, SimulationError> {
        let specs = match &self.source {
            Some(source) => {
                debug!("Reloading scene '{}'", source.name());
                source.bodies()?
            }
            None => Vec::new(),
        };
        self.populate(specs)
    }

    fn populate(&mut self, specs: Vec<BodySpec>) -> Result<usize, SimulationError> {
        if let Some(bad) = specs.iter().find(|spec| !spec.mass.is_finite() || spec.mass <= 0.0) {
            return Err(SimulationError::InvalidMass(bad.mass));
        }

        self.clear();
        self.bodies.reserve(specs.len());
        for spec in specs {
            let body = self.pool.create(spec.position, spec.velocity, spec.mass, spec.color)?;
            self.bodies.push(body);
        }
        Ok(self.bodies.len())
    }

    /// Drops every body and releases the pool storage.
    pub fn clear(&mut self) {
        self.pool.reset();
        self.bodies.clear();
        self.tree.reset();
        self.steps = 0;
    }

    /// Adds a single body outside of any scene.
    pub fn add_body(
        &mut self,
        position: Vector3<f32>,
        velocity: Vector3<f32>,
        mass: f32,
        color: Option<Color>,
    ) -> Result<Body, SimulationError> {
        let body = self.pool.create(position, velocity, mass, color)?;
        self.bodies.push(body);
        Ok(body)
    }

    /// Advances every body by one time step and returns how many tree nodes
    /// the step built.
    pub fn step(&mut self) -> Result<usize, SimulationError> {
        for &body in &self.bodies {
            self.tree.insert(&self.pool, body);
        }

        let fields = self.compute_fields();

        let dt = self.constants.time_step;
        for (body, field) in self.bodies.iter().zip(fields.iter()) {
            body.move_by_field_with_step(&mut self.pool, field, dt)?;
        }

        let node_count = self.tree.node_count();
        debug!("Step {}: {} bodies, {} tree nodes", self.steps, self.bodies.len(), node_count);

        self.tree.reset();
        self.steps += 1;
        Ok(node_count)
    }

    /// Runs [`NBodySimulation::step`] `steps` times.
    pub fn simulate(&mut self, steps: usize) -> Result<(), SimulationError> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Evaluates the field at every body against the current tree.
    fn compute_fields(&self) -> Vec<Vector3<f32>> {
        let tree = &self.tree;
        let pool = &self.pool;
        let threshold = self.constants.opening_angle;
        let field_on = |body: &Body| match pool.position_of(body) {
            Ok(position) => tree.field_at(&position, threshold),
            Err(_) => Vector3::zeros(),
        };

        #[cfg(feature = "parallel")]
        let fields: Vec<_> = self.bodies.par_iter().map(field_on).collect();
        #[cfg(not(feature = "parallel"))]
        let fields: Vec<_> = self.bodies.iter().map(field_on).collect();

        fields
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// The tree of the step in progress; empty between steps.
    pub fn tree(&self) -> &BarnesHutTree {
        &self.tree
    }

    pub fn constants(&self) -> &SimulationConstants {
        &self.constants
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }
}
