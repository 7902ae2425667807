//! Domain models for provctl.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod cluster;
pub mod permission;
pub mod pool;
pub mod resource;
pub mod token;
