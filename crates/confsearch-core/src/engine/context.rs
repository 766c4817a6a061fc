use super::config::SearchConfig;
use super::progress::ProgressReporter;
use crate::core::models::constraints::ConstraintSpec;
use crate::core::models::molecule::Molecule;

/// Read-only inputs shared by every stage of one search.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub molecule: &'a Molecule,
    pub config: &'a SearchConfig,
    pub constraints: &'a ConstraintSpec,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        molecule: &'a Molecule,
        config: &'a SearchConfig,
        constraints: &'a ConstraintSpec,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            molecule,
            config,
            constraints,
            reporter,
        }
    }
}
