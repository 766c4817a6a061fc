//! # Engine Module
//!
//! The stateful layer of confsearch. It holds the search configuration, the
//! energy bookkeeping, progress reporting, and the four pipeline stages that
//! turn a molecule into a pruned conformer ensemble.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Search parameters, defaults, and validation
//! - **Energy Tracking** ([`energy`]) - Per-conformer energies and the running minimum
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error type
//! - **Stages** ([`tasks`]) - Generation, minimization, energy window, and RMS sieve
//!
//! Stages are run in order by [`crate::workflows::search`]; they can also be
//! driven individually through a [`context::SearchContext`].

pub mod config;
pub mod context;
pub mod energy;
pub mod error;
pub mod progress;
pub mod tasks;
pub(crate) mod utils;
