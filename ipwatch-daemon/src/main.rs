use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use ipwatch_capture::interface_exists;
use ipwatch_daemon::args::Cli;
use ipwatch_daemon::run;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.into_config();
    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }
    if let Err(e) = interface_exists(&config.ifname) {
        error!("{}", e);
        std::process::exit(1);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = run(&config, shutdown) {
        error!("{}", e);
        std::process::exit(1);
    }
}
