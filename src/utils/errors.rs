use std::fmt;
use std::error::Error;

/// Represents errors that can occur while building or stepping a simulation.
///
/// The octree itself never produces these: insertion and field evaluation
/// resolve every condition locally. Errors come from the particle pool, the
/// configuration and the particle sources.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Indicates a non-positive or non-finite body mass.
    InvalidMass(f32),
    /// Indicates a body handle issued before the last pool reset.
    StaleHandle {
        index: usize,
        handle_generation: u32,
        pool_generation: u32,
    },
    /// Indicates that appending would grow the pool past its reservation.
    CapacityExceeded { capacity: usize },
    /// Indicates a rejected configuration value.
    InvalidConfiguration(String),
    /// Indicates that a particle source produced unusable data.
    InvalidScene(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::InvalidMass(mass) => write!(f, "Invalid mass value: {}", mass),
            SimulationError::StaleHandle { index, handle_generation, pool_generation } => write!(
                f,
                "Stale body handle for slot {} (handle generation {}, pool generation {})",
                index, handle_generation, pool_generation
            ),
            SimulationError::CapacityExceeded { capacity } => {
                write!(f, "Particle pool reached its reserved capacity of {}", capacity)
            }
            SimulationError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            SimulationError::InvalidScene(msg) => write!(f, "Invalid scene: {}", msg),
        }
    }
}

impl Error for SimulationError {}
