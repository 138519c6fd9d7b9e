//! ipwatch-update-ma: download the IEEE MAC assignment files and rebuild
//! the vendor directory

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use ipwatch_core::{config, Result};
use ipwatch_db::{OpenMode, VendorDirectory};
use ipwatch_tools::download::{build_agent, csv_path, download, MA_SOURCES};
use ipwatch_tools::malist::parse_malist;

#[derive(Parser, Debug)]
#[command(name = "ipwatch-update-ma")]
#[command(version, about = "Download the IEEE MAC assignment files and rebuild the vendor directory", long_about = None)]
struct Cli {
    /// Skip the download and load csv files already in the library
    /// directory
    #[arg(short = 'D', long)]
    skip_download: bool,

    /// Directory for the database files
    #[arg(short = 'L', long, value_name = "DIR", default_value = config::DEFAULT_LIB_DIR)]
    lib_dir: PathBuf,

    /// User agent for http
    #[arg(short = 'U', long, default_value = concat!("ipwatch/", env!("CARGO_PKG_VERSION")))]
    user_agent: String,

    /// Verbose output
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<()> {
    if !cli.skip_download {
        let agent = build_agent(&cli.user_agent);
        for source in &MA_SOURCES {
            download(&agent, source, &cli.lib_dir)?;
        }
    }

    let mut entries = Vec::new();
    for source in &MA_SOURCES {
        let path = csv_path(&cli.lib_dir, source.table);
        let file = File::open(&path)?;
        let parsed = parse_malist(BufReader::new(file))?;
        info!("loaded {} assignments from {}", parsed.len(), path.display());
        entries.extend(parsed);
    }

    let mut directory = VendorDirectory::open(&cli.lib_dir, OpenMode::ReadWrite)?;
    directory.rebuild(&entries)?;
    directory.maintenance();

    info!("vendor directory rebuilt with {} assignments", entries.len());
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
