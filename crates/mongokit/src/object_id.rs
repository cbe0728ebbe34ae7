//! ObjectId generation
//!
//! Produces 12-byte identifiers in the MongoDB ObjectId layout:
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0-3   | Unix seconds, big endian |
//! | 4-6   | Machine fingerprint |
//! | 7-8   | Low 16 bits of the process id, big endian |
//! | 9-11  | Counter, big endian, wrapping at 2^24 |
//!
//! Fingerprints are fixed for the lifetime of a generator. The counter is
//! seeded from the OS secure random source and bumped atomically on every
//! call, so ids from one process never collide within the same second.
//!
//! # Example
//!
//! ```ignore
//! use mongokit::object_id;
//!
//! // Surface a missing random source at startup instead of on first use
//! object_id::init()?;
//!
//! let id = object_id::new_object_id();
//! println!("{}", id.to_hex());
//! ```

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use mongokit_common::{MongoKitError, Result};
use once_cell::sync::OnceCell;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

use crate::fingerprint::{machine_fingerprint, process_fingerprint};

static GLOBAL: OnceCell<ObjectIdGenerator> = OnceCell::new();

/// Generator holding the per-process ObjectId state
#[derive(Debug)]
pub struct ObjectIdGenerator {
    machine: [u8; 3],
    process: u32,
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    /// Create a generator for the running process.
    ///
    /// # Errors
    /// Returns `MongoKitError::Entropy` if the secure random source cannot
    /// seed the counter.
    pub fn new() -> Result<Self> {
        let seed = seed_counter()?;
        let generator = Self::from_parts(machine_fingerprint(), process_fingerprint(), seed);

        debug!(
            machine = ?generator.machine,
            process = generator.process,
            "ObjectId generator initialized"
        );

        Ok(generator)
    }

    /// Create a generator from explicit fingerprints and counter seed
    pub fn from_parts(machine: [u8; 3], process: u32, seed: u32) -> Self {
        Self {
            machine,
            process,
            counter: AtomicU32::new(seed),
        }
    }

    /// Machine fingerprint embedded in bytes 4-6
    pub fn machine(&self) -> [u8; 3] {
        self.machine
    }

    /// Process fingerprint; bytes 7-8 carry its low 16 bits
    pub fn process(&self) -> u32 {
        self.process
    }

    /// Generate a new ObjectId. Never fails and never blocks.
    pub fn generate(&self) -> ObjectId {
        let timestamp = Utc::now().timestamp() as u32;
        let count = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..7].copy_from_slice(&self.machine);
        bytes[7..9].copy_from_slice(&(self.process as u16).to_be_bytes());
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);

        ObjectId::from_bytes(bytes)
    }
}

/// Read a random 32-bit counter seed from the OS secure random source
pub fn seed_counter() -> Result<u32> {
    let mut buf = [0u8; 4];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| MongoKitError::Entropy(e.to_string()))?;
    Ok(u32::from_le_bytes(buf))
}

/// Initialize the process-wide generator, returning it.
///
/// Call this during startup so that an unavailable random source aborts
/// the application before any id is produced. Later calls are no-ops.
pub fn init() -> Result<&'static ObjectIdGenerator> {
    GLOBAL.get_or_try_init(ObjectIdGenerator::new)
}

/// The process-wide generator, initialized on first use.
///
/// # Panics
/// Panics if the generator was never initialized and the secure random
/// source is unavailable. Use [`init`] to handle that case at startup.
pub fn global() -> &'static ObjectIdGenerator {
    GLOBAL.get_or_init(|| {
        ObjectIdGenerator::new().unwrap_or_else(|e| panic!("{}", e))
    })
}

/// Generate a new ObjectId from the process-wide generator
pub fn new_object_id() -> ObjectId {
    global().generate()
}

/// Parse the 24-character hex form of an ObjectId
pub fn parse_hex(hex: &str) -> Result<ObjectId> {
    Ok(ObjectId::parse_str(hex)?)
}

/// Decoded fields of an ObjectId
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectIdParts {
    /// Unix seconds
    pub timestamp: u32,
    pub machine: [u8; 3],
    /// Low 16 bits of the generating process id
    pub process: u16,
    /// 24-bit counter value
    pub counter: u32,
}

impl ObjectIdParts {
    /// Timestamp field as a UTC datetime
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0).unwrap_or_default()
    }
}

impl From<ObjectId> for ObjectIdParts {
    fn from(oid: ObjectId) -> Self {
        let b = oid.bytes();
        Self {
            timestamp: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            machine: [b[4], b[5], b[6]],
            process: u16::from_be_bytes([b[7], b[8]]),
            counter: u32::from_be_bytes([0, b[9], b[10], b[11]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_parts() {
        let gen = ObjectIdGenerator::from_parts([0xaa, 0xbb, 0xcc], 0x0001_2345, 0x0010_0000);
        let oid = gen.generate();
        let b = oid.bytes();

        assert_eq!(&b[4..7], &[0xaa, 0xbb, 0xcc]);
        // Process id truncated to its low 16 bits
        assert_eq!(&b[7..9], &[0x23, 0x45]);
        assert_eq!(&b[9..12], &[0x10, 0x00, 0x01]);
    }

    #[test]
    fn test_counter_emits_low_24_bits() {
        let gen = ObjectIdGenerator::from_parts([0; 3], 1, 0xAB12_3456);
        let parts = ObjectIdParts::from(gen.generate());
        assert_eq!(parts.counter, 0x0012_3457);
    }

    #[test]
    fn test_counter_wraps_at_24_bits() {
        let gen = ObjectIdGenerator::from_parts([0; 3], 1, 0x00FF_FFFE);
        assert_eq!(ObjectIdParts::from(gen.generate()).counter, 0x00FF_FFFF);
        assert_eq!(ObjectIdParts::from(gen.generate()).counter, 0);
        assert_eq!(ObjectIdParts::from(gen.generate()).counter, 1);
    }

    #[test]
    fn test_counter_wraps_at_32_bits() {
        let gen = ObjectIdGenerator::from_parts([0; 3], 1, u32::MAX);
        assert_eq!(ObjectIdParts::from(gen.generate()).counter, 0);
        assert_eq!(ObjectIdParts::from(gen.generate()).counter, 1);
    }

    #[test]
    fn test_parts_decode() {
        let oid = parse_hex("507f1f77bcf86cd799439011").unwrap();
        let parts = ObjectIdParts::from(oid);

        assert_eq!(parts.timestamp, 0x507f1f77);
        assert_eq!(parts.machine, [0xbc, 0xf8, 0x6c]);
        assert_eq!(parts.process, 0xd799);
        assert_eq!(parts.counter, 0x439011);
        assert_eq!(parts.datetime().to_rfc3339(), "2012-10-17T21:13:27+00:00");
    }

    #[test]
    fn test_parse_hex_rejects_invalid() {
        assert!(matches!(
            parse_hex("not-an-objectid"),
            Err(MongoKitError::InvalidObjectId(_))
        ));
        assert!(parse_hex("507f1f77bcf86cd79943901").is_err());
    }

    #[test]
    fn test_seed_counter() {
        assert!(seed_counter().is_ok());
    }

    #[test]
    fn test_init_returns_global() {
        let initialized = init().unwrap();
        assert!(std::ptr::eq(initialized, global()));
        assert_eq!(global().process(), std::process::id());
    }
}
