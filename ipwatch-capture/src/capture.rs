//! Capture session wrapper around pcap

use pcap::{Active, Capture, Device};
use tracing::{debug, info};

use ipwatch_core::{config, Error, PacketTime, Result};

/// Poll timeout for the capture loop (milliseconds)
///
/// Bounds how long a frame pull blocks so the loop can periodically check
/// for shutdown.
const CAPTURE_TIMEOUT_MS: i32 = 100;

/// Configuration for a capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per frame
    pub snaplen: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Poll timeout in milliseconds
    pub timeout_ms: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: config::MIN_SNAPLEN,
            promiscuous: true,
            timeout_ms: CAPTURE_TIMEOUT_MS,
        }
    }
}

/// A frame pulled from the capture source
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Captured bytes, possibly fewer than were on the wire
    pub data: Vec<u8>,
    /// Wire timestamp
    pub captured_at: PacketTime,
}

/// An activated capture session on one interface
pub struct CaptureSession {
    interface: String,
    capture: Capture<Active>,
}

impl CaptureSession {
    /// Open and activate a capture session on the interface
    pub fn open(interface: &str, config: &CaptureConfig) -> Result<Self> {
        debug!(
            "opening capture on {} (snaplen {}, promisc {})",
            interface, config.snaplen, config.promiscuous
        );

        let device = Device::from(interface);
        let capture = Capture::from_device(device)
            .map_err(|e| Error::capture(format!("failed to create capture: {}", e)))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .open()
            .map_err(|e| {
                Error::capture(format!("failed to open capture on {}: {}", interface, e))
            })?;

        info!("capture opened on {}", interface);

        Ok(Self {
            interface: interface.to_string(),
            capture,
        })
    }

    /// Compile and apply a BPF filter
    pub fn set_filter(&mut self, filter: &str) -> Result<()> {
        self.capture
            .filter(filter, true)
            .map_err(|e| Error::capture(format!("failed to apply filter: {}", e)))?;
        debug!("applied filter: {}", filter);
        Ok(())
    }

    /// Pull the next frame
    ///
    /// Returns `Ok(None)` when the poll timeout expires with no traffic,
    /// letting the caller check its shutdown flag.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(RawFrame {
                data: packet.data.to_vec(),
                captured_at: PacketTime::new(
                    packet.header.ts.tv_sec as i64,
                    packet.header.ts.tv_usec as i64,
                ),
            })),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(Error::capture(format!(
                "capture on {} failed: {}",
                self.interface, e
            ))),
        }
    }

    /// Interface this session captures on
    pub fn interface(&self) -> &str {
        &self.interface
    }
}
