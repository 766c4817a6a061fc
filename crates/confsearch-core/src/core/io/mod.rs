//! Reading and writing molecule files.
//!
//! Input structures arrive as MDL molfiles. Search results leave as a molfile
//! for the best conformer, a structure-data file for the surviving ensemble,
//! and a CSV energy table.

pub mod energies;
pub mod molfile;
pub mod sdf;
pub mod traits;
