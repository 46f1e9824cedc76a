//! Integration and end-to-end tests for the rill resource layer.
//!
//! This crate provides:
//! - An in-memory network store with programmable acknowledgement delay
//! - A settable block oracle and a key-holding test validator
//! - A handler harness over a temporary on-disk chunk store

pub mod harness;

pub use harness::{MemoryNetStore, TestOracle, TestSetup, TestValidator};
