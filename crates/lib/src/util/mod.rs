//! Shared utilities.
//!
//! Test fixtures used across the crate.

#[cfg(test)]
pub mod testutil;
