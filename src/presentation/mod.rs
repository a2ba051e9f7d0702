//! Server-rendered markup for cached views.

pub mod views;
