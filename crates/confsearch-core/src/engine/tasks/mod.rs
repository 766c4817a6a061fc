//! Pipeline stages of a conformer search.
//!
//! Each submodule implements one stage as a free `run` function taking the
//! shared [`SearchContext`](super::context::SearchContext). Stages that prune
//! the ensemble mark conformers as removed and drop their energy entries, so
//! later stages only ever see survivors.

pub mod energy_window;
pub mod generation;
pub mod minimization;
pub mod rms_sieve;
