//! Shared utilities.
//!
//! Hashing helpers and, under test, a recording container engine.

pub mod hash;

#[cfg(test)]
pub mod testutil;
