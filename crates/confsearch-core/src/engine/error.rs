use thiserror::Error;

use super::config::ConfigError;
use crate::core::embedding::EmbeddingError;
use crate::core::forcefield::evaluator::ForceFieldError;
use crate::core::models::constraints::ConstraintError;
use crate::core::models::molecule::MoleculeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid constraint: {source}")]
    InvalidConstraint {
        #[from]
        source: ConstraintError,
    },

    #[error("No usable starting geometry: {source}")]
    NoStartingGeometry {
        #[from]
        source: MoleculeError,
    },

    #[error("No conformers left after stage '{stage}'")]
    EmptyEnsemble { stage: &'static str },

    #[error("Conformer generation failed: {source}")]
    Embedding {
        #[from]
        source: EmbeddingError,
    },

    #[error("Force field setup failed: {source}")]
    ForceField {
        #[from]
        source: ForceFieldError,
    },

    #[error("Invalid search configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
