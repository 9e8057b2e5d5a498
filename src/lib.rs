// ===================================================================================================
// Storage Core — content-addressed storage and compute fabric
// ===================================================================================================
//
// A peer-to-peer content-addressed storage core: a Compress → Encrypt →
// Shard pipeline and its inverse, a manifest/placement layer, a threshold
// key-distribution layer (Shamir dealer DKG plus Feldman VSS), and an
// auto-heal controller that maintains target replica counts. Transport and
// peer discovery are consumed through the `transport` module's traits, not
// implemented here.
//
// ===================================================================================================

pub mod aead;
pub mod auto_heal;
pub mod compressor;
pub mod config;
pub mod error;
pub mod facade;
pub mod file_detector;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod placement;
pub mod reed_solomon;
pub mod resilience;
pub mod store;
pub mod threshold;
pub mod transport;

pub use config::Config;
pub use error::{MeshError, MeshResult};
pub use manifest::Manifest;
pub use pipeline::Pipeline;
