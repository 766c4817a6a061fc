//! # Core Module
//!
//! Stateless building blocks of the conformer search: the molecule and
//! conformer models, rigid-body geometry, the collaborator traits through
//! which candidate geometries and energies are obtained, and molecule file
//! I/O.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds, molecules, the conformer arena and positional constraints
//! - **Candidate Generation** ([`embedding`]) - The embedder trait and a perturbation-based implementation
//! - **Energy Evaluation** ([`forcefield`]) - The evaluator traits and a restraint-based reference force field
//! - **File I/O** ([`io`]) - MDL molfile input, SDF and CSV output
//! - **Geometry** ([`utils`]) - Centroids, RMSD and best-fit superposition

pub mod embedding;
pub mod forcefield;
pub mod io;
pub mod models;
pub mod utils;
