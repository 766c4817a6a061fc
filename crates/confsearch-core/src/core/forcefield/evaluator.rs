use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForceFieldError {
    #[error("Coordinate set has {actual} atoms, expected {expected}")]
    AtomCountMismatch { expected: usize, actual: usize },
    #[error("Atom index {index} is out of range for a {atom_count}-atom molecule")]
    AtomOutOfRange { index: usize, atom_count: usize },
    #[error("Force field setup failed: {0}")]
    Setup(String),
}

/// Result of one minimization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizeStatus {
    Converged,
    NotConverged,
}

impl MinimizeStatus {
    #[inline]
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

/// Stateful energy evaluator bound to one conformer's coordinates.
///
/// The capability set is deliberately narrow: add constraints, initialize,
/// run a bounded minimization cycle, and query the energy. A fresh evaluator
/// is created for every conformer and dropped once its coordinates have been
/// read back.
pub trait Evaluator {
    /// Holds the atom at its current position.
    fn add_fixed_point(&mut self, atom: usize) -> Result<(), ForceFieldError>;

    /// Adds a stiff flat-bottom spring that lets the atom move at most
    /// `max_displacement` away from `anchor`.
    fn add_position_constraint(
        &mut self,
        atom: usize,
        anchor: Point3<f64>,
        max_displacement: f64,
        force_constant: f64,
    ) -> Result<(), ForceFieldError>;

    /// Prepares internal state. Must be called after all constraints are added.
    fn initialize(&mut self);

    /// Runs at most `max_steps` optimizer steps and reports convergence.
    fn minimize(&mut self, max_steps: usize) -> MinimizeStatus;

    /// Potential energy of the current coordinates, constraint terms included.
    fn energy(&self) -> f64;

    fn positions(&self) -> &[Point3<f64>];

    fn into_positions(self) -> Vec<Point3<f64>>
    where
        Self: Sized;
}

/// Factory for per-conformer evaluators.
pub trait ForceField: Sync {
    type Evaluator: Evaluator;

    fn create_evaluator(
        &self,
        molecule: &Molecule,
        positions: Vec<Point3<f64>>,
    ) -> Result<Self::Evaluator, ForceFieldError>;
}
