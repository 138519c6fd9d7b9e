//! Notification dispatch
//!
//! Every mapping event produces an operator-visible log line. When a notify
//! command is configured, the rest of the work (reverse name resolution,
//! spawning and reaping the command) happens on a small dedicated tokio
//! runtime so the capture loop never blocks. Vendor lookups stay on the
//! capture thread: the store connection has a single owner.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::TimeZone;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

use ipwatch_core::{Error, PacketTime, Result, WatchConfig};
use ipwatch_db::HistoryStore;

use crate::detector::MappingEvent;

/// Hostname substituted for link-local addresses, which are never resolved
const LINK_LOCAL_NAME: &str = "(link-local)";

/// Hostname substituted when resolution fails
const UNKNOWN_NAME: &str = "(unknown)";

/// Dispatches mapping-change notifications without blocking the capture
/// loop
///
/// The notifier command is invoked as
/// `cmd date_time ifname hostname ipaddr new_hwaddr new_hwaddr_org
/// old_hwaddr old_hwaddr_org`.
pub struct NotificationDispatcher {
    ifname: String,
    notify_cmd: Option<PathBuf>,
    runtime: Runtime,
}

impl NotificationDispatcher {
    /// Create the dispatcher and its background runtime
    pub fn new(config: &WatchConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("ipwatch-notify")
            .enable_all()
            .build()
            .map_err(|e| Error::notify(format!("failed to start notify runtime: {}", e)))?;
        Ok(Self {
            ifname: config.ifname.clone(),
            notify_cmd: config.notify_cmd.clone(),
            runtime,
        })
    }

    /// Handle to the dispatcher's runtime
    pub fn runtime_handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Log a mapping event and, when configured, fire the notifier
    ///
    /// Dispatch is best effort: failures inside the background task are
    /// logged there and never reach the capture loop.
    pub fn dispatch(&self, store: &HistoryStore, event: &MappingEvent, captured_at: PacketTime) {
        let ip_addr = event.ip_addr().to_string();
        let new_hw = event.new_hw().to_string();
        let old_hw = match event.old_hw() {
            Some(old) => old.to_string(),
            None => "(none)".to_string(),
        };

        info!("ip address {} changed from {} to {}", ip_addr, old_hw, new_hw);

        let Some(cmd) = self.notify_cmd.clone() else {
            return;
        };

        let new_org = store.vendor_org(&new_hw).unwrap_or_else(|e| {
            warn!("{}", e);
            UNKNOWN_NAME.to_string()
        });
        let old_org = match event.old_hw() {
            Some(_) => store.vendor_org(&old_hw).unwrap_or_else(|e| {
                warn!("{}", e);
                UNKNOWN_NAME.to_string()
            }),
            None => "(none)".to_string(),
        };

        let timestamp = format_timestamp(captured_at.sec);
        let ifname = self.ifname.clone();
        let ip = ip_addr.parse::<IpAddr>().ok();

        self.runtime.spawn(async move {
            let hostname = resolve_name(ip).await;
            let status = Command::new(&cmd)
                .arg(&timestamp)
                .arg(&ifname)
                .arg(&hostname)
                .arg(&ip_addr)
                .arg(&new_hw)
                .arg(&new_org)
                .arg(&old_hw)
                .arg(&old_org)
                .status()
                .await;
            match status {
                Ok(status) if status.success() => {
                    debug!("notify command completed for {}", ip_addr);
                }
                Ok(status) => {
                    warn!("notify command for {} exited with {}", ip_addr, status);
                }
                Err(e) => {
                    warn!("failed to run notify command {}: {}", cmd.display(), e);
                }
            }
        });
    }
}

/// Format an epoch second as a local date and time
fn format_timestamp(sec: i64) -> String {
    match chrono::Local.timestamp_opt(sec, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => sec.to_string(),
    }
}

/// Reverse resolve an address to a name; never fails
///
/// Link-local addresses are not resolvable through global DNS and are
/// substituted directly.
async fn resolve_name(ip: Option<IpAddr>) -> String {
    let Some(ip) = ip else {
        return UNKNOWN_NAME.to_string();
    };
    if is_link_local(&ip) {
        return LINK_LOCAL_NAME.to_string();
    }
    tokio::task::spawn_blocking(move || {
        dns_lookup::lookup_addr(&ip).unwrap_or_else(|_| UNKNOWN_NAME.to_string())
    })
    .await
    .unwrap_or_else(|_| UNKNOWN_NAME.to_string())
}

/// IPv4 169.254.0.0/16 or IPv6 fe80::/10
fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_link_local(),
        IpAddr::V6(addr) => (addr.segments()[0] & 0xffc0) == 0xfe80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_local_ranges() {
        assert!(is_link_local(&"169.254.12.34".parse().unwrap()));
        assert!(!is_link_local(&"192.0.2.10".parse().unwrap()));
        assert!(is_link_local(&"fe80::1".parse().unwrap()));
        assert!(is_link_local(&"febf::1".parse().unwrap()));
        assert!(!is_link_local(&"fec0::1".parse().unwrap()));
        assert!(!is_link_local(&"2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_link_local_skips_resolution() {
        let runtime = Builder::new_current_thread().build().unwrap();
        let name = runtime.block_on(resolve_name(Some("fe80::1".parse().unwrap())));
        assert_eq!(name, LINK_LOCAL_NAME);
        let name = runtime.block_on(resolve_name(None));
        assert_eq!(name, UNKNOWN_NAME);
    }

    #[test]
    fn test_timestamp_format() {
        let formatted = format_timestamp(0);
        // Local time of the epoch, but always this shape
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[13..14], ":");
    }
}
