//! Vendor directory: MAC prefix to organization lookups
//!
//! The IEEE assigns hardware address blocks at three prefix granularities
//! (MA-L 24 bit, MA-M 28 bit, MA-S 36 bit). The directory keeps one table
//! per granularity plus a single-nibble table for locally administered
//! addresses, and answers lookups longest prefix first: more specific
//! assignments are carved out of broader MA-L blocks.

use std::path::Path;

use rusqlite::params;

use ipwatch_core::{config, Error, Result};

use crate::history::{open_database, run_maintenance, OpenMode};

/// Longest organization name kept in the directory
pub const ORG_NAME_LIMIT: usize = 128;

pub(crate) const TBL_MA_L: &str = "ma_l";
pub(crate) const TBL_MA_M: &str = "ma_m";
pub(crate) const TBL_MA_S: &str = "ma_s";
pub(crate) const TBL_MA_U: &str = "ma_u";

/// IEEE MAC assignment registry granularities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaRegistry {
    /// MA-L, 24-bit prefix
    Large,
    /// MA-M, 28-bit prefix
    Medium,
    /// MA-S, 36-bit prefix
    Small,
}

impl MaRegistry {
    /// Directory table holding this registry's assignments
    pub fn table(&self) -> &'static str {
        match self {
            MaRegistry::Large => TBL_MA_L,
            MaRegistry::Medium => TBL_MA_M,
            MaRegistry::Small => TBL_MA_S,
        }
    }

    /// Registry tag as it appears in the IEEE csv files
    pub fn tag(&self) -> &'static str {
        match self {
            MaRegistry::Large => "MA-L",
            MaRegistry::Medium => "MA-M",
            MaRegistry::Small => "MA-S",
        }
    }
}

/// One loadable vendor assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorEntry {
    registry: MaRegistry,
    prefix: String,
    organization: String,
}

impl VendorEntry {
    /// Build an entry from an IEEE assignment value (6, 7 or 9 hex digits)
    /// and an organization name
    ///
    /// The organization name is truncated to [`ORG_NAME_LIMIT`] characters
    /// and embedded single quotes are replaced with a backtick.
    pub fn from_assignment(assignment: &str, organization: &str) -> Result<Self> {
        let registry = match assignment.len() {
            6 => MaRegistry::Large,
            7 => MaRegistry::Medium,
            9 => MaRegistry::Small,
            _ => {
                return Err(Error::config(format!(
                    "unexpected assignment value: {}",
                    assignment
                )))
            }
        };
        if !assignment.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::config(format!(
                "unexpected assignment value: {}",
                assignment
            )));
        }

        let mut prefix = String::with_capacity(assignment.len() + assignment.len() / 2);
        for (i, c) in assignment.chars().enumerate() {
            if i > 0 && i % 2 == 0 {
                prefix.push(':');
            }
            prefix.push(c.to_ascii_lowercase());
        }

        let mut organization: String = organization.chars().take(ORG_NAME_LIMIT).collect();
        if organization.contains('\'') {
            organization = organization.replace('\'', "`");
        }

        Ok(Self {
            registry,
            prefix,
            organization,
        })
    }

    /// The registry this entry belongs to
    pub fn registry(&self) -> MaRegistry {
        self.registry
    }

    /// The colon-separated lowercase prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The sanitized organization name
    pub fn organization(&self) -> &str {
        &self.organization
    }
}

/// SQL fragment resolving an address expression to an organization,
/// longest prefix first
pub(crate) fn org_coalesce(qualifier: &str, addr_expr: &str) -> String {
    format!(
        "coalesce(\
           (SELECT org FROM {q}{s} WHERE prefix = substr({a}, 1, 13)),\
           (SELECT org FROM {q}{m} WHERE prefix = substr({a}, 1, 10)),\
           (SELECT org FROM {q}{l} WHERE prefix = substr({a}, 1, 8)),\
           (SELECT org FROM {q}{u} WHERE prefix = substr({a}, 2, 1)),\
           '(unknown)')",
        q = qualifier,
        a = addr_expr,
        s = TBL_MA_S,
        m = TBL_MA_M,
        l = TBL_MA_L,
        u = TBL_MA_U,
    )
}

const ALL_TABLES: [&str; 4] = [TBL_MA_L, TBL_MA_M, TBL_MA_S, TBL_MA_U];

/// The persisted vendor directory
pub struct VendorDirectory {
    conn: rusqlite::Connection,
}

impl VendorDirectory {
    /// Open the shared vendor directory under `lib_dir`
    pub fn open(lib_dir: &Path, mode: OpenMode) -> Result<Self> {
        let path = config::vendor_db_path(lib_dir);
        let conn = open_database(&path, mode)?;
        let directory = Self { conn };
        if mode == OpenMode::ReadWrite {
            directory.create_tables()?;
        }
        Ok(directory)
    }

    /// Open an in-memory directory
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| Error::database(format!("open of in-memory database failed: {}", e)))?;
        let directory = Self { conn };
        directory.create_tables()?;
        Ok(directory)
    }

    fn create_tables(&self) -> Result<()> {
        for table in ALL_TABLES {
            self.conn
                .execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {} (\
                       prefix TEXT NOT NULL PRIMARY KEY ON CONFLICT REPLACE,\
                       org TEXT NOT NULL\
                     );",
                    table
                ))
                .map_err(|e| Error::database(format!("create table failed: {}", e)))?;
        }
        Ok(())
    }

    /// Replace the directory contents with `entries`
    ///
    /// All four tables are dropped, recreated and repopulated inside one
    /// transaction, so a concurrent reader never sees a partially populated
    /// directory. The private (locally administered) placeholder rows are
    /// reseeded as part of the same transaction.
    pub fn rebuild(&mut self, entries: &[VendorEntry]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::database(format!("begin transaction failed: {}", e)))?;

        for table in ALL_TABLES {
            tx.execute_batch(&format!(
                "DROP TABLE IF EXISTS {t};\
                 CREATE TABLE {t} (\
                   prefix TEXT NOT NULL PRIMARY KEY ON CONFLICT REPLACE,\
                   org TEXT NOT NULL\
                 );",
                t = table
            ))
            .map_err(|e| Error::database(format!("recreate of {} failed: {}", table, e)))?;
        }

        for registry in [MaRegistry::Large, MaRegistry::Medium, MaRegistry::Small] {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} VALUES (?1, ?2)",
                    registry.table()
                ))
                .map_err(|e| Error::database(format!("insert prepare failed: {}", e)))?;
            for entry in entries.iter().filter(|e| e.registry == registry) {
                stmt.execute(params![entry.prefix, entry.organization])
                    .map_err(|e| Error::database(format!("vendor insert failed: {}", e)))?;
            }
        }

        // Locally administered addresses have the second bit of the first
        // octet set; the second nibble is one of 2, 6, a, e.
        for nibble in ["2", "6", "a", "e"] {
            tx.execute(
                &format!("INSERT INTO {} VALUES (?1, ?2)", TBL_MA_U),
                params![nibble, "(private)"],
            )
            .map_err(|e| Error::database(format!("vendor insert failed: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| Error::database(format!("end transaction failed: {}", e)))
    }

    /// Lookup the organization name for a hardware address
    ///
    /// Returns `"(unknown)"` when no prefix matches.
    pub fn lookup(&self, hwaddr: &str) -> Result<String> {
        let sql = format!("SELECT {}", org_coalesce("", "?1"));
        self.conn
            .query_row(&sql, params![hwaddr], |row| row.get(0))
            .map_err(|e| Error::database(format!("vendor lookup failed: {}", e)))
    }

    /// Has the directory ever been populated?
    ///
    /// The private placeholder rows are reseeded on every rebuild, so an
    /// empty private table means the loader has never run.
    pub fn is_initialized(&self) -> bool {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {})", TBL_MA_U);
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n != 0)
            .unwrap_or(false)
    }

    /// Reclaim space and refresh query planning statistics
    pub fn maintenance(&self) {
        run_maintenance(&self.conn);
    }
}
