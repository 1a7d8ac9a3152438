//! Integration test crate for Reel.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the reel crates to verify they work together.



#[cfg(test)]
mod tickets;

#[cfg(test)]
mod model;
