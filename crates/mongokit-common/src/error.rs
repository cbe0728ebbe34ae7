//! Error types for mongokit

use thiserror::Error;

/// Result type alias for mongokit operations
pub type Result<T> = std::result::Result<T, MongoKitError>;

/// Unified error type for all mongokit operations
#[derive(Error, Debug, Clone)]
pub enum MongoKitError {
    #[error("MongoDB error: {0}")]
    MongoDB(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The per-call deadline elapsed before the driver answered
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    /// No document matched the filter of a find-and-update call
    #[error("update conditions not met")]
    UpdateConditionsNotMet,

    /// The OS secure random source could not seed the ObjectId counter
    #[error("cannot read random object id seed: {0}")]
    Entropy(String),
}

impl From<serde_json::Error> for MongoKitError {
    fn from(err: serde_json::Error) -> Self {
        MongoKitError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MongoKitError {
    fn from(err: toml::de::Error) -> Self {
        MongoKitError::Config(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for MongoKitError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        MongoKitError::Timeout(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for MongoKitError {
    fn from(err: mongodb::error::Error) -> Self {
        MongoKitError::MongoDB(err.to_string())
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for MongoKitError {
    fn from(err: bson::ser::Error) -> Self {
        MongoKitError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for MongoKitError {
    fn from(err: bson::de::Error) -> Self {
        MongoKitError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::oid::Error> for MongoKitError {
    fn from(err: bson::oid::Error) -> Self {
        MongoKitError::InvalidObjectId(err.to_string())
    }
}
