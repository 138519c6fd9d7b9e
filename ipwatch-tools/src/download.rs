//! Download of the IEEE MAC assignment files
//!
//! Files are fetched to a `.tmp` name and renamed into place, so a partial
//! download never replaces a good csv file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;
use ureq::{Agent, AgentBuilder};

use ipwatch_core::{Error, Result};

/// Suffix of the downloaded assignment files
pub const CSV_SUFFIX: &str = ".csv";
const TMP_SUFFIX: &str = ".tmp";

/// One IEEE assignment registry source
pub struct MaSource {
    /// Vendor directory table the file loads into
    pub table: &'static str,
    /// Download URL
    pub url: &'static str,
}

/// The registries the directory is built from, per
/// <https://standards.ieee.org/products-programs/regauth/>
pub const MA_SOURCES: [MaSource; 3] = [
    MaSource {
        table: "ma_l",
        url: "https://standards-oui.ieee.org/oui/oui.csv",
    },
    MaSource {
        table: "ma_m",
        url: "https://standards-oui.ieee.org/oui28/mam.csv",
    },
    MaSource {
        table: "ma_s",
        url: "https://standards-oui.ieee.org/oui36/oui36.csv",
    },
];

/// Where a registry's csv file lives under `lib_dir`
pub fn csv_path(lib_dir: &Path, table: &str) -> PathBuf {
    lib_dir.join(format!("{}{}", table, CSV_SUFFIX))
}

/// Build the http agent used for the downloads
pub fn build_agent(user_agent: &str) -> Agent {
    AgentBuilder::new()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(300))
        .build()
}

/// Download one registry file into `lib_dir`
pub fn download(agent: &Agent, source: &MaSource, lib_dir: &Path) -> Result<()> {
    let tmp_path = lib_dir.join(format!("{}{}", source.table, TMP_SUFFIX));
    let csv_path = csv_path(lib_dir, source.table);

    info!("downloading {} to {}", source.url, csv_path.display());

    let response = agent
        .get(source.url)
        .call()
        .map_err(|e| Error::download(format!("download of {} failed: {}", source.url, e)))?;

    let mut tmp_file = File::create(&tmp_path)?;
    io::copy(&mut response.into_reader(), &mut tmp_file)?;
    drop(tmp_file);

    fs::rename(&tmp_path, &csv_path)?;
    Ok(())
}
