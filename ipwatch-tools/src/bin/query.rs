//! ipwatch-query: report IP to hardware address mappings

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::error;

use ipwatch_core::{config, IpVersion, Result};
use ipwatch_db::{HistoryStore, OpenMode, ReportFilter};

#[derive(Parser, Debug)]
#[command(name = "ipwatch-query")]
#[command(version, about = "Report IP to hardware address mappings", long_about = None)]
struct Cli {
    /// Select all records instead of just the last one
    #[arg(short = 'a', long)]
    all: bool,

    /// Select IPv4 records only
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    ipv4: bool,

    /// Select IPv6 records only
    #[arg(short = '6', long = "ipv6")]
    ipv6: bool,

    /// Directory for the database files
    #[arg(short = 'L', long, value_name = "DIR", default_value = config::DEFAULT_LIB_DIR)]
    lib_dir: PathBuf,

    /// Interface whose history to query
    ifname: String,

    /// Restrict to one IP or hardware address
    addr: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<()> {
    let store = HistoryStore::open(&cli.lib_dir, &cli.ifname, OpenMode::ReadOnly)?;
    store.attach_vendor(&cli.lib_dir)?;

    let ip_version = if cli.ipv4 {
        Some(IpVersion::V4)
    } else if cli.ipv6 {
        Some(IpVersion::V6)
    } else {
        None
    };
    let filter = ReportFilter {
        ip_version,
        addr: cli.addr,
        all: cli.all,
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    for row in store.report(&filter, now)? {
        println!(
            "{} {} {} {} {}",
            row.captured_at, row.age_minutes, row.ip_addr, row.hw_addr, row.organization
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    ipwatch_tools::init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
