//! Runtime configuration for the ipwatch daemon
//!
//! All operator-supplied settings are carried in an explicit [`WatchConfig`]
//! owned by the daemon's run function and threaded through the capture loop
//! rather than held as process-wide state.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Default directory for the ipwatch data files
pub const DEFAULT_LIB_DIR: &str = "/var/lib/ipwatch";

/// Default number of days before old records are deleted
pub const DEFAULT_OLDER_THAN_DAYS: i64 = 30;

/// How frequently record refreshes and store maintenance happen (seconds)
pub const MAINTENANCE_INTERVAL: i64 = 28800;

/// Age (minutes) after which an unchanged mapping's last-seen time is
/// refreshed in place instead of being left alone
pub const REFRESH_THRESHOLD_MINUTES: i64 = 480;

// Snapshot length notes:
//
// IPv4 ARP (fixed size):       42 bytes
//  ether header                14
//  arp header                  28
//
// IPv6 ICMP ND (minimum size): 86 bytes
//  ether header                14
//  ip6 header                  40
//  nd solicit / advertise      24 (includes icmp6 header of size 8)
//  nd option link layer addr    8 (includes option header of size 2)
//
// ND packets are variable sized and may carry additional options. We assume
// the link layer address option comes first to keep the snapshot length
// small.

/// Minimum (and default) capture snapshot length
pub const MIN_SNAPLEN: i32 = 86;

/// Maximum length of an operator-supplied capture filter expression
pub const USER_FILTER_MAX: usize = 512;

/// File suffix for the SQLite stores
pub const DB_SUFFIX: &str = ".sqlite";

/// Name of the shared vendor directory database
pub const MA_DB_NAME: &str = "ma_db";

/// Daemon configuration, validated before capture begins
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Interface to monitor
    pub ifname: String,
    /// Directory holding the history and vendor databases
    pub lib_dir: PathBuf,
    /// External command invoked on mapping changes
    pub notify_cmd: Option<PathBuf>,
    /// Days a mapping may go unseen before the retention sweep forgets it
    pub older_than_days: i64,
    /// Capture snapshot length
    pub snaplen: i32,
    /// Capture in promiscuous mode
    pub promiscuous: bool,
    /// Additional operator capture filter, ANDed with the fixed filter
    pub user_filter: Option<String>,
}

impl WatchConfig {
    /// Create a configuration with defaults for the given interface
    pub fn new<S: Into<String>>(ifname: S) -> Self {
        Self {
            ifname: ifname.into(),
            lib_dir: PathBuf::from(DEFAULT_LIB_DIR),
            notify_cmd: None,
            older_than_days: DEFAULT_OLDER_THAN_DAYS,
            snaplen: MIN_SNAPLEN,
            promiscuous: true,
            user_filter: None,
        }
    }

    /// Validate the configuration
    ///
    /// Errors here are fatal at startup, before any capture begins.
    pub fn validate(&self) -> Result<()> {
        if self.ifname.is_empty() || self.ifname.contains('/') || self.ifname.contains('\0') {
            return Err(Error::config(format!(
                "invalid interface name \"{}\"",
                self.ifname
            )));
        }
        if self.older_than_days < 1 {
            return Err(Error::config(format!(
                "invalid retention period of {} days",
                self.older_than_days
            )));
        }
        if self.snaplen < MIN_SNAPLEN {
            return Err(Error::config(format!(
                "snaplen {} is below the minimum of {}",
                self.snaplen, MIN_SNAPLEN
            )));
        }
        if let Some(filter) = &self.user_filter {
            if filter.len() > USER_FILTER_MAX {
                return Err(Error::config(format!(
                    "capture filter exceeds maximum length of {} bytes",
                    USER_FILTER_MAX
                )));
            }
        }
        Ok(())
    }

    /// Retention cutoff in seconds
    pub fn retention_secs(&self) -> i64 {
        self.older_than_days * 86400
    }

    /// Path of this interface's history database
    pub fn history_db_path(&self) -> PathBuf {
        history_db_path(&self.lib_dir, &self.ifname)
    }

    /// Path of the shared vendor directory database
    pub fn vendor_db_path(&self) -> PathBuf {
        vendor_db_path(&self.lib_dir)
    }
}

/// History database path for an interface
pub fn history_db_path(lib_dir: &Path, ifname: &str) -> PathBuf {
    lib_dir.join(format!("{}{}", ifname, DB_SUFFIX))
}

/// Vendor directory database path
pub fn vendor_db_path(lib_dir: &Path) -> PathBuf {
    lib_dir.join(format!("{}{}", MA_DB_NAME, DB_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::new("eth0");
        assert_eq!(config.older_than_days, DEFAULT_OLDER_THAN_DAYS);
        assert_eq!(config.snaplen, MIN_SNAPLEN);
        assert!(config.promiscuous);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = WatchConfig::new("eth0");
        config.snaplen = 42;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::new("eth0");
        config.older_than_days = 0;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::new("../etc");
        assert!(config.validate().is_err());
        config.ifname = "eth0".into();
        config.user_filter = Some("a".repeat(USER_FILTER_MAX + 1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_db_paths() {
        let config = WatchConfig::new("eth0");
        assert_eq!(
            config.history_db_path(),
            PathBuf::from("/var/lib/ipwatch/eth0.sqlite")
        );
        assert_eq!(
            config.vendor_db_path(),
            PathBuf::from("/var/lib/ipwatch/ma_db.sqlite")
        );
    }
}
