//! MongoDB convenience layer for mongokit
//!
//! This crate wraps the official MongoDB driver with:
//! - ObjectId generation (timestamp, machine and process fingerprints, counter)
//! - A client handle whose CRUD and aggregation helpers run under a per-call timeout
//! - Update operator and find option builders
//! - TOML client configuration

pub mod client;
pub mod config;
pub mod fingerprint;
pub mod object_id;
pub mod query;
pub mod update;

pub use bson::oid::ObjectId;
pub use client::{Client, UpdateOutcome};
pub use config::ClientConfig;
pub use mongokit_common::{MongoKitError, Result};
pub use object_id::{new_object_id, ObjectIdGenerator, ObjectIdParts};
pub use query::FindOptionsBuilder;
pub use update::UpdateType;
