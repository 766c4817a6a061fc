//! # Core Models Module
//!
//! Data structures describing one molecule and the conformers searched for it.
//!
//! ## Key Components
//!
//! - [`atom`] - Elements and atoms with their input coordinates
//! - [`topology`] - Bonds and bond orders
//! - [`molecule`] - The fixed topology plus the original input geometry
//! - [`conformer`] - Conformer ids and the tombstoning [`conformer::Ensemble`] arena
//! - [`constraints`] - Fixed and bounded positional constraints for one search
//!
//! All conformers of an ensemble share their molecule's atom and bond topology
//! and differ only in coordinates.

pub mod atom;
pub mod conformer;
pub mod constraints;
pub mod molecule;
pub mod topology;
