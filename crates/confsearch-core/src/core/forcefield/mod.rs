//! Energy evaluation for conformer relaxation.
//!
//! The search engine never talks to a concrete force field. It creates one
//! [`evaluator::Evaluator`] per conformer through the [`evaluator::ForceField`]
//! factory, constrains it, runs bounded minimization cycles, and reads back
//! the energy and coordinates.
//!
//! [`restraint::RestraintForceField`] is the built-in implementation. It relaxes
//! candidates toward the input geometry's bond lengths and angles and is meant
//! for testing and for runs where no external force field is plugged in.
//!
//! - [`evaluator`] - The evaluator and factory traits
//! - [`potentials`] - Scalar potential terms with analytic derivatives
//! - [`restraint`] - The restraint-based reference evaluator

pub mod evaluator;
pub mod potentials;
pub mod restraint;
