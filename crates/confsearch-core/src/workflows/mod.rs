//! # Workflows Module
//!
//! High-level entry points that tie the `engine` and `core` layers together.
//!
//! - **Search Workflow** ([`search`]) - Generation, constrained minimization,
//!   energy window, and RMS sieve for one molecule
//! - **Report** ([`report`]) - Human-readable summary of best energies

pub mod report;
pub mod search;
