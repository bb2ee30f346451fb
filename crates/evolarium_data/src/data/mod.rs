//! Core data structures for the Evolarium simulation.

pub mod color;
pub mod environment;
pub mod food;
pub mod math;
pub mod snapshot;
