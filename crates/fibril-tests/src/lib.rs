//! Integration test crate for Fibril.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every fibril crate to verify they work together.

#[cfg(test)]
mod analysis;

#[cfg(test)]
mod tracking;

#[cfg(test)]
mod pipeline;
