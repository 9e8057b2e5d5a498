// ===================================================================================================
// Error Handling System - Error Types for the Storage Core
// ===================================================================================================
//
// Structured error types for the compress/encrypt/shard pipeline, manifest and
// placement layer, threshold key layer, and auto-heal controller. Each variant
// maps to one of the error categories from the design: input errors, crypto
// errors, coding errors, transport errors, integrity errors, and resource
// errors. Pure functions surface these directly; the upload/download facades
// aggregate per-peer failures without losing the underlying kind.
//
// ===================================================================================================

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub enum MeshError {
    // ===== INPUT ERRORS =====
    /// The caller supplied a zero-length blob.
    EmptyBlob,
    /// No candidate peers were given for placement.
    NoPeers,
    /// A threshold `t` is invalid for `n` participants (t == 0 or t > n).
    InvalidThreshold(u8, usize),

    // ===== CRYPTO ERRORS =====
    /// AEAD decryption failed; irrecoverable for that ciphertext.
    AeadAuth,
    /// A Feldman VSS share failed its commitment check.
    InvalidShare,
    /// Fewer than `need` distinct shares were collected for reconstruction.
    InsufficientShares(usize, usize),

    // ===== CODING ERRORS =====
    /// Compression/decompression failed; distinct from AEAD failure.
    Compression(String),
    /// Present shards did not share a common byte length.
    ShardLengthMismatch,
    /// Fewer than `k` shards were present; reconstruction is impossible.
    Unrecoverable(usize, usize),

    // ===== I/O / TRANSPORT ERRORS =====
    /// A peer could not be reached for a fetch or send.
    PeerUnreachable(u32),
    /// A per-peer operation exceeded its deadline.
    Timeout(u32),
    /// Fewer than `k` placements succeeded during upload.
    InsufficientPlacements(usize, usize),

    // ===== INTEGRITY ERRORS =====
    /// The reconstructed blob's hash did not match the manifest's file-hash.
    HashMismatch,

    // ===== RESOURCE ERRORS =====
    /// A read found no shards because the TTL had already swept them.
    TtlExpired,

    // ===== SYSTEM-LEVEL ERRORS =====
    Io(String),
    Config(String),
    Serialization(String),

    /// Catch-all for errors that don't fit another category.
    Generic(String),
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::EmptyBlob => write!(f, "blob is empty"),
            MeshError::NoPeers => write!(f, "no candidate peers available"),
            MeshError::InvalidThreshold(t, n) => {
                write!(f, "invalid threshold {} for {} participants", t, n)
            }
            MeshError::AeadAuth => write!(f, "AEAD authentication failed"),
            MeshError::InvalidShare => write!(f, "share failed VSS commitment check"),
            MeshError::InsufficientShares(have, need) => {
                write!(f, "insufficient shares: have {}, need {}", have, need)
            }
            MeshError::Compression(e) => write!(f, "compression error: {}", e),
            MeshError::ShardLengthMismatch => write!(f, "shards have mismatched lengths"),
            MeshError::Unrecoverable(have, need) => {
                write!(f, "unrecoverable: have {} shards, need {}", have, need)
            }
            MeshError::PeerUnreachable(peer) => write!(f, "peer {} unreachable", peer),
            MeshError::Timeout(peer) => write!(f, "peer {} timed out", peer),
            MeshError::InsufficientPlacements(placed, need) => {
                write!(f, "insufficient placements: placed {}, need {}", placed, need)
            }
            MeshError::HashMismatch => write!(f, "reconstructed file-hash mismatch"),
            MeshError::TtlExpired => write!(f, "shards swept after TTL expiry"),
            MeshError::Io(e) => write!(f, "IO error: {}", e),
            MeshError::Config(e) => write!(f, "configuration error: {}", e),
            MeshError::Serialization(e) => write!(f, "serialization error: {}", e),
            MeshError::Generic(e) => write!(f, "error: {}", e),
        }
    }
}

impl StdError for MeshError {}

impl From<std::io::Error> for MeshError {
    fn from(error: std::io::Error) -> Self {
        MeshError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(error: serde_json::Error) -> Self {
        MeshError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for MeshError {
    fn from(error: toml::de::Error) -> Self {
        MeshError::Config(format!("TOML parse error: {}", error))
    }
}

impl From<toml::ser::Error> for MeshError {
    fn from(error: toml::ser::Error) -> Self {
        MeshError::Config(format!("TOML serialize error: {}", error))
    }
}

impl From<reed_solomon_erasure::Error> for MeshError {
    fn from(error: reed_solomon_erasure::Error) -> Self {
        MeshError::Generic(format!("Reed-Solomon error: {:?}", error))
    }
}

/// Result type alias for storage-core operations.
pub type MeshResult<T> = Result<T, MeshError>;
