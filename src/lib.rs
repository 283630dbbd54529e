//! ecodash library
//!
//! This module exposes the cache, limiter, fetch and data modules for use in
//! integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod fetch;
pub mod limiter;
