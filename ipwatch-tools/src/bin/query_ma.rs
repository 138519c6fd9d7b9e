//! ipwatch-query-ma: look up the vendor organization for a hardware address

use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use ipwatch_core::{config, Error, Result};
use ipwatch_db::{OpenMode, VendorDirectory};

#[derive(Parser, Debug)]
#[command(name = "ipwatch-query-ma")]
#[command(version, about = "Look up the vendor organization for a hardware address", long_about = None)]
struct Cli {
    /// Directory for the database files
    #[arg(short = 'L', long, value_name = "DIR", default_value = config::DEFAULT_LIB_DIR)]
    lib_dir: PathBuf,

    /// Hardware address to look up (aa:bb:cc:dd:ee:ff)
    hwaddr: String,

    /// Verbose output
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<()> {
    let directory = VendorDirectory::open(&cli.lib_dir, OpenMode::ReadOnly)?;
    if !directory.is_initialized() {
        return Err(Error::VendorDirectoryUninitialized(
            config::vendor_db_path(&cli.lib_dir).display().to_string(),
        ));
    }

    let organization = directory.lookup(&cli.hwaddr.to_lowercase())?;
    println!("{}", organization);
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
