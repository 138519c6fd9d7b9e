//! Packet capture for ipwatch
//!
//! A thin, type-safe wrapper around pcap providing interface validation,
//! the fixed ARP/ND capture filter, and a bounded-timeout frame pull that
//! lets the capture loop poll its shutdown flag.

pub mod capture;
pub mod filters;
pub mod interface;

// Re-export main types
pub use capture::{CaptureConfig, CaptureSession, RawFrame};
pub use filters::capture_filter;
pub use interface::interface_exists;
