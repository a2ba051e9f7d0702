//! Application boundaries: the repository oracle, the markup renderer and
//! error mapping.

pub mod error;
pub mod markup;
pub mod repos;
