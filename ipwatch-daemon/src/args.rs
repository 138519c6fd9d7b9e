//! Daemon command line

use std::path::PathBuf;

use clap::Parser;

use ipwatch_core::{config, WatchConfig};

#[derive(Parser, Debug)]
#[command(name = "ipwatchd")]
#[command(version, about = "Passive IP to hardware address mapping monitor", long_about = None)]
pub struct Cli {
    /// Network interface to monitor
    pub ifname: String,

    /// Command invoked on mapping changes as
    /// "cmd date_time ifname hostname ipaddr new_hwaddr new_hwaddr_org old_hwaddr old_hwaddr_org"
    #[arg(short = 'n', long, value_name = "CMD")]
    pub notify_cmd: Option<PathBuf>,

    /// Additional capture filter, ANDed with the built-in ARP/ND filter
    #[arg(short = 'F', long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// Directory for the database files
    #[arg(short = 'L', long, value_name = "DIR", default_value = config::DEFAULT_LIB_DIR)]
    pub lib_dir: PathBuf,

    /// Number of days before old records are deleted
    #[arg(short = 'O', long, value_name = "DAYS", default_value_t = config::DEFAULT_OLDER_THAN_DAYS)]
    pub older_than_days: i64,

    /// Disable promiscuous mode
    #[arg(short = 'P', long)]
    pub no_promiscuous: bool,

    /// Capture snapshot length
    #[arg(short = 'S', long, value_name = "LEN", default_value_t = config::MIN_SNAPLEN)]
    pub snaplen: i32,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Convert the parsed arguments into a watch configuration
    pub fn into_config(self) -> WatchConfig {
        WatchConfig {
            ifname: self.ifname,
            lib_dir: self.lib_dir,
            notify_cmd: self.notify_cmd,
            older_than_days: self.older_than_days,
            snaplen: self.snaplen,
            promiscuous: !self.no_promiscuous,
            user_filter: self.filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["ipwatchd", "eth0"]);
        let config = cli.into_config();
        assert_eq!(config.ifname, "eth0");
        assert_eq!(config.snaplen, config::MIN_SNAPLEN);
        assert_eq!(config.older_than_days, config::DEFAULT_OLDER_THAN_DAYS);
        assert!(config.promiscuous);
        assert!(config.notify_cmd.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_options() {
        let cli = Cli::parse_from([
            "ipwatchd",
            "-n",
            "/usr/local/bin/notify",
            "-F",
            "vlan 100",
            "-L",
            "/tmp/ipwatch",
            "-O",
            "7",
            "-P",
            "-S",
            "256",
            "eth1",
        ]);
        let config = cli.into_config();
        assert_eq!(config.ifname, "eth1");
        assert_eq!(
            config.notify_cmd,
            Some(PathBuf::from("/usr/local/bin/notify"))
        );
        assert_eq!(config.user_filter.as_deref(), Some("vlan 100"));
        assert_eq!(config.lib_dir, PathBuf::from("/tmp/ipwatch"));
        assert_eq!(config.older_than_days, 7);
        assert!(!config.promiscuous);
        assert_eq!(config.snaplen, 256);
    }
}
