//! Domain layer types and invariants.

pub mod board;
pub mod entities;
pub mod error;
