//! # confsearch
//!
//! Conformational ensemble search and sieving for small molecules: generate
//! candidate geometries, relax them under optional positional constraints,
//! and prune the batch by an energy window and by pairwise heavy-atom RMSD.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Ensemble`,
//!   `ConstraintSpec`), geometry, the collaborator traits (`Embedder`,
//!   `ForceField`) with built-in reference implementations, and file I/O.
//!
//! - **[`engine`]: The Logic Core.** Search configuration, energy bookkeeping,
//!   progress reporting, and one task per pipeline stage.
//!
//! - **[`workflows`]: The Public API.** [`workflows::search::run`] executes the
//!   whole pipeline and returns the surviving ensemble, its energies, and the
//!   best conformer.
//!
//! ```no_run
//! use confsearch::core::io::molfile::MolFile;
//! use confsearch::core::io::traits::MolecularFile;
//! use confsearch::engine::config::SearchConfig;
//! use confsearch::engine::progress::ProgressReporter;
//! use confsearch::workflows::search;
//!
//! let (molecule, _) = MolFile::read_from_path("ethanol.mol")?;
//! let config = SearchConfig::builder()
//!     .num_conformers(20)
//!     .rms_threshold(0.5)
//!     .energy_window(5.0)
//!     .max_cycles(10)
//!     .build()?;
//! let result = search::run_with_defaults(&molecule, &config, &ProgressReporter::new())?;
//! println!("{} conformers survived", result.ensemble.live_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
