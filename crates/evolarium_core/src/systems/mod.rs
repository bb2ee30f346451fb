//! Per-tick simulation systems, in the order the world runs them.

pub mod environment;
pub mod feeding;
pub mod lifecycle;
pub mod reproduction;
