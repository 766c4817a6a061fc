//! Helpers shared by the engine's stage implementations.

pub mod triangular;
