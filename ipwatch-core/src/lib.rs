//! Core types, errors and configuration for ipwatch
//!
//! This crate provides the fundamental types, error handling and runtime
//! configuration shared by the ipwatch packet decoder, history store,
//! capture session and daemon.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::WatchConfig;
pub use error::{Error, Result};
pub use types::{CurrentMappings, IpVersion, MacAddr, Observation, PacketTime};
