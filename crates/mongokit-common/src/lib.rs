//! Common utilities for mongokit
//!
//! This crate provides the error type shared by the mongokit crates.

pub mod error;

pub use error::{MongoKitError, Result};
