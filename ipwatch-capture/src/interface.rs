//! Network interface validation

use pcap::Device;

use ipwatch_core::{Error, Result};

/// List the names of the capture-capable interfaces
pub fn list_interfaces() -> Result<Vec<String>> {
    let devices =
        Device::list().map_err(|e| Error::capture(format!("device list failed: {}", e)))?;
    Ok(devices.into_iter().map(|d| d.name).collect())
}

/// Confirm that `name` is a known capture interface
///
/// Gives a clear fatal error at startup instead of an opaque activation
/// failure later.
pub fn interface_exists(name: &str) -> Result<()> {
    if list_interfaces()?.iter().any(|d| d == name) {
        Ok(())
    } else {
        Err(Error::InterfaceNotFound(name.to_string()))
    }
}
