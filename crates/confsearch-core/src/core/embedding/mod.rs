//! Candidate geometry generation.
//!
//! An [`Embedder`] turns a molecule's topology into a batch of raw 3-D
//! coordinate sets. The search engine treats it as an external service: it
//! asks for a number of candidates, passes the positions constrained atoms
//! must keep, and accepts however many candidates come back.

pub mod perturbation;

use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Molecule has no atoms to embed")]
    EmptyMolecule,
    #[error("Coordinate map references atom {index}, but the molecule has {atom_count} atoms")]
    CoordMapOutOfRange { index: usize, atom_count: usize },
    #[error("Embedding failed: {0}")]
    Failed(String),
}

/// Parameters of one embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    /// Number of candidates requested.
    pub count: usize,
    /// Candidates closer than this heavy-atom RMSD to an accepted candidate
    /// are dropped by the embedder itself. Zero disables pruning.
    pub prune_rms_threshold: f64,
    /// Atoms that must sit at the given positions in every candidate.
    pub coord_map: Vec<(usize, Point3<f64>)>,
    /// Seed for reproducible runs. `None` draws from system entropy.
    pub seed: Option<u64>,
}

impl EmbedRequest {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            prune_rms_threshold: 0.0,
            coord_map: Vec::new(),
            seed: None,
        }
    }

    pub(crate) fn validate(&self, molecule: &Molecule) -> Result<(), EmbeddingError> {
        let atom_count = molecule.atom_count();
        if atom_count == 0 {
            return Err(EmbeddingError::EmptyMolecule);
        }
        match self.coord_map.iter().find(|(index, _)| *index >= atom_count) {
            Some(&(index, _)) => Err(EmbeddingError::CoordMapOutOfRange { index, atom_count }),
            None => Ok(()),
        }
    }
}

/// Source of raw candidate conformations.
///
/// Implementations may return fewer than `request.count` coordinate sets,
/// e.g. after pruning near-duplicates. Every returned set must have one
/// position per atom of `molecule`.
pub trait Embedder {
    fn embed(
        &self,
        molecule: &Molecule,
        request: &EmbedRequest,
    ) -> Result<Vec<Vec<Point3<f64>>>, EmbeddingError>;
}
