//! Shared helpers for integration tests.

#![allow(dead_code)]

mod agent;
mod fixtures;

pub use agent::*;
pub use fixtures::*;
