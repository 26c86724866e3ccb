//! Integration test crate for Montage.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every engine crate to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod edit;

#[cfg(test)]
mod eval;

#[cfg(test)]
mod sync;
