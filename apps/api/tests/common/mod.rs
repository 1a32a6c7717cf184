//! Common test utilities for API integration tests
//!
//! This module provides shared test infrastructure for integration tests:
//! an app wired to the in-memory backend, seed fixtures, and request and
//! response helpers.

#![allow(unused_imports)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
