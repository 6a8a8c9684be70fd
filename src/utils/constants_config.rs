// src/utils/constants_config.rs
use crate::utils::{
    DEFAULT_SIMULATION_CONSTANTS,
    errors::SimulationError
};

/// Tunable parameters shared by the particle pool, the octree and the
/// simulation loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConstants {
    pub time_step: f32,
    pub force_constant: f32,
    pub opening_angle: f32,
    pub pool_capacity: usize,
    pub root_size: f32,
    pub max_depth: usize,
    pub self_interaction_epsilon: f32,
}

impl Default for SimulationConstants {
    fn default() -> Self {
        DEFAULT_SIMULATION_CONSTANTS
    }
}

impl SimulationConstants {
    /// Builds a set of constants, falling back to the defaults for every `None`.
    ///
    /// # Example
    /// ```
    /// use starwell::utils::SimulationConstants;
    ///
    /// let constants = SimulationConstants::new(None, None, Some(0.8), None, None, None, None);
    /// assert_eq!(constants.opening_angle, 0.8);
    /// assert_eq!(constants.time_step, 0.01);
    /// ```
    pub fn new(
        time_step: Option<f32>,
        force_constant: Option<f32>,
        opening_angle: Option<f32>,
        pool_capacity: Option<usize>,
        root_size: Option<f32>,
        max_depth: Option<usize>,
        self_interaction_epsilon: Option<f32>,
    ) -> Self {
        let default = DEFAULT_SIMULATION_CONSTANTS;
        Self {
            time_step: time_step.unwrap_or(default.time_step),
            force_constant: force_constant.unwrap_or(default.force_constant),
            opening_angle: opening_angle.unwrap_or(default.opening_angle),
            pool_capacity: pool_capacity.unwrap_or(default.pool_capacity),
            root_size: root_size.unwrap_or(default.root_size),
            max_depth: max_depth.unwrap_or(default.max_depth),
            self_interaction_epsilon: self_interaction_epsilon.unwrap_or(default.self_interaction_epsilon),
        }
    }

    /// Checks that every value can drive a simulation.
    ///
    /// `self_interaction_epsilon` must be strictly positive: a body queried at its own position
    /// sits at distance zero and is only excluded when `0 < epsilon`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfiguration`] naming the first offending field.
    ///
    /// # Examples
    ///
    /// ```
    /// use starwell::utils::SimulationConstants;
    ///
    /// assert!(SimulationConstants::default().validate().is_ok());
    /// let bad = SimulationConstants { max_depth: 0, ..Default::default() };
    /// assert!(bad.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!("time_step must be positive, got {}", self.time_step)));
        }
        if !self.force_constant.is_finite() {
            return Err(SimulationError::InvalidConfiguration("force_constant must be finite".to_string()));
        }
        if self.opening_angle.is_nan() || self.opening_angle < 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!("opening_angle must be non-negative, got {}", self.opening_angle)));
        }
        if self.pool_capacity == 0 {
            return Err(SimulationError::InvalidConfiguration("pool_capacity must be non-zero".to_string()));
        }
        if !self.root_size.is_finite() || self.root_size <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!("root_size must be positive, got {}", self.root_size)));
        }
        if self.max_depth == 0 {
            return Err(SimulationError::InvalidConfiguration("max_depth must be non-zero".to_string()));
        }
        if !self.self_interaction_epsilon.is_finite() || self.self_interaction_epsilon <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "self_interaction_epsilon must be positive, got {}",
                self.self_interaction_epsilon
            )));
        }
        Ok(())
    }
}
