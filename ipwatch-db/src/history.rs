//! Address history store
//!
//! One SQLite database per monitored interface holds the `ipmap` table: an
//! append-mostly log of address observations. The newest row per
//! `(iptype, ipaddr)` is the current mapping; `utime` (last seen) is the
//! only column ever updated in place, which bounds write volume for stable
//! hosts to roughly one write per refresh interval.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::warn;

use ipwatch_core::{config, CurrentMappings, Error, IpVersion, MacAddr, Observation, Result};

use crate::vendor::org_coalesce;

/// Longest address accepted by report queries (IPv6 text form)
const ADDR_STR_MAX: usize = 46;

/// Database access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Open a SQLite database, creating it only in read-write mode
pub(crate) fn open_database(path: &Path, mode: OpenMode) -> Result<Connection> {
    let flags = match mode {
        OpenMode::ReadWrite => {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
        }
        OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
    };
    Connection::open_with_flags(path, flags)
        .map_err(|e| Error::database(format!("open of {} failed: {}", path.display(), e)))
}

/// Reclaim space and refresh query planning statistics; advisory only
pub(crate) fn run_maintenance(conn: &Connection) {
    if let Err(e) = conn.execute_batch("PRAGMA optimize;") {
        warn!("database optimize failed: {}", e);
    }
    if let Err(e) = conn.execute_batch("VACUUM;") {
        warn!("database vacuum failed: {}", e);
    }
}

const SQL_IPMAP_CREATE: &str = "\
    CREATE TABLE IF NOT EXISTS ipmap (\
        iptype INTEGER NOT NULL,\
        ipaddr TEXT NOT NULL,\
        hwaddr TEXT NOT NULL,\
        sec INTEGER NOT NULL,\
        usec INTEGER NOT NULL,\
        utime INTEGER NOT NULL\
    );\
    CREATE INDEX IF NOT EXISTS ipmap_last ON ipmap(iptype, ipaddr, sec, usec);";

/// The current mapping for an IP address
#[derive(Debug, Clone)]
pub struct CurrentMapping {
    /// Row id of the current record
    pub rowid: i64,
    /// Minutes since the record was last seen
    pub age_minutes: i64,
    /// Hardware address currently mapped
    pub hw_addr: MacAddr,
}

/// Row returned by the report queries
#[derive(Debug, Clone)]
pub struct ReportRow {
    /// Capture time, local date and time
    pub captured_at: String,
    /// Minutes since the record was last seen
    pub age_minutes: i64,
    pub ip_addr: String,
    pub hw_addr: String,
    /// Organization resolved through the vendor directory
    pub organization: String,
}

/// Filter for the report queries
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Restrict to one IP version
    pub ip_version: Option<IpVersion>,
    /// Restrict to one address; a 17-character colon form selects by
    /// hardware address, anything else by IP address
    pub addr: Option<String>,
    /// Full history instead of only each address's current row
    pub all: bool,
}

/// Is this a hardware address in colon form?
fn is_hwaddr(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 17 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if i % 3 == 2 {
            *b == b':'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

/// Persisted history of address observations for one interface
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (and in read-write mode create) the history database for an
    /// interface
    pub fn open(lib_dir: &Path, ifname: &str, mode: OpenMode) -> Result<Self> {
        let path = config::history_db_path(lib_dir, ifname);
        let conn = open_database(&path, mode)?;
        if mode == OpenMode::ReadWrite {
            conn.execute_batch(SQL_IPMAP_CREATE)
                .map_err(|e| Error::database(format!("create table failed: {}", e)))?;
        }
        Ok(Self { conn })
    }

    /// Open an in-memory history store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database(format!("open of in-memory database failed: {}", e)))?;
        conn.execute_batch(SQL_IPMAP_CREATE)
            .map_err(|e| Error::database(format!("create table failed: {}", e)))?;
        Ok(Self { conn })
    }

    /// Attach the vendor directory read-only and confirm it has been
    /// initialized
    ///
    /// The daemon and the query tools refuse to run without a populated
    /// vendor directory.
    pub fn attach_vendor(&self, lib_dir: &Path) -> Result<()> {
        let path = config::vendor_db_path(lib_dir);
        let uri = format!("file:{}?mode=ro", path.display());
        let attached = self
            .conn
            .execute("ATTACH DATABASE ?1 AS ma_db", params![uri])
            .and_then(|_| {
                self.conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM ma_db.ma_u)",
                    [],
                    |row| row.get::<_, i64>(0),
                )
            });
        match attached {
            Ok(n) if n != 0 => Ok(()),
            _ => Err(Error::VendorDirectoryUninitialized(
                path.display().to_string(),
            )),
        }
    }

    /// Append a new history record; it becomes the current mapping for its
    /// address
    pub fn insert(&self, obs: &Observation) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO ipmap VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    obs.ip_version.as_db(),
                    obs.ip_addr,
                    obs.hw_addr.to_string(),
                    obs.captured_at.sec,
                    obs.captured_at.usec,
                    obs.captured_at.sec,
                ],
            )
            .map_err(|e| Error::database(format!("ipmap insert failed: {}", e)))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Refresh the last-seen time of a record in place
    pub fn touch(&self, rowid: i64, utime: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE ipmap SET utime = ?1 WHERE rowid = ?2",
                params![utime, rowid],
            )
            .map_err(|e| Error::database(format!("ipmap update failed: {}", e)))?;
        Ok(())
    }

    /// The current mapping for an IP address, with its age in minutes
    /// relative to `now`
    pub fn current_for(
        &self,
        ip_version: IpVersion,
        ip_addr: &str,
        now: i64,
    ) -> Result<Option<CurrentMapping>> {
        let row = self
            .conn
            .query_row(
                "SELECT rowid, (?1 - utime) / 60, hwaddr FROM ipmap \
                 WHERE rowid = (\
                     SELECT rowid FROM ipmap \
                     WHERE iptype = ?2 AND ipaddr = ?3 \
                     ORDER BY sec DESC, usec DESC \
                     LIMIT 1\
                 )",
                params![now, ip_version.as_db(), ip_addr],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::database(format!("ipmap get current failed: {}", e)))?;

        match row {
            None => Ok(None),
            Some((rowid, age_minutes, hwaddr)) => {
                let hw_addr = hwaddr
                    .parse::<MacAddr>()
                    .map_err(|_| Error::database(format!("bad hwaddr in ipmap: {}", hwaddr)))?;
                Ok(Some(CurrentMapping {
                    rowid,
                    age_minutes,
                    hw_addr,
                }))
            }
        }
    }

    /// Delete every record last seen at or before `cutoff`
    ///
    /// Current records are removed too: an address not seen within the
    /// retention window is forgotten entirely.
    pub fn delete_older_than(&self, cutoff: i64) -> Result<usize> {
        self.conn
            .execute("DELETE FROM ipmap WHERE utime <= ?1", params![cutoff])
            .map_err(|e| Error::database(format!("ipmap delete old records failed: {}", e)))
    }

    /// Resolve a hardware address to its vendor organization through the
    /// attached vendor directory
    pub fn vendor_org(&self, hwaddr: &str) -> Result<String> {
        let sql = format!("SELECT {}", org_coalesce("ma_db.", "?1"));
        self.conn
            .query_row(&sql, params![hwaddr], |row| row.get(0))
            .map_err(|e| Error::database(format!("vendor lookup failed: {}", e)))
    }

    /// Report history rows matching `filter`, ordered by capture time
    /// ascending
    ///
    /// Requires the vendor directory to be attached. With `filter.all`
    /// false only each address's current row is returned.
    pub fn report(&self, filter: &ReportFilter, now: i64) -> Result<Vec<ReportRow>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = vec![Value::Integer(now)];

        if let Some(addr) = &filter.addr {
            if addr.len() > ADDR_STR_MAX {
                return Err(Error::config(format!("invalid query address: \"{}\"", addr)));
            }
            if is_hwaddr(addr) {
                values.push(Value::Text(addr.clone()));
                clauses.push(format!("hwaddr = ?{}", values.len()));
                if let Some(ip_version) = filter.ip_version {
                    values.push(Value::Integer(ip_version.as_db()));
                    clauses.push(format!("iptype = ?{}", values.len()));
                }
            } else {
                values.push(Value::Text(addr.clone()));
                clauses.push(format!("ipaddr = ?{}", values.len()));
            }
        } else if let Some(ip_version) = filter.ip_version {
            values.push(Value::Integer(ip_version.as_db()));
            clauses.push(format!("iptype = ?{}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let columns = format!(
            "datetime(sec, 'unixepoch', 'localtime'), (?1 - utime) / 60, ipaddr, hwaddr, {}",
            org_coalesce("ma_db.", "hwaddr")
        );

        let sql = if filter.all {
            format!(
                "SELECT {columns} FROM ipmap {where_clause} ORDER BY sec, usec",
                columns = columns,
                where_clause = where_clause
            )
        } else {
            format!(
                "SELECT {columns} FROM (\
                     SELECT sec, usec, utime, ipaddr, hwaddr, row_number() \
                     OVER (PARTITION BY ipaddr ORDER BY sec DESC, usec DESC) AS number \
                     FROM ipmap {where_clause}\
                 ) WHERE number = 1 ORDER BY sec, usec",
                columns = columns,
                where_clause = where_clause
            )
        };

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::database(format!("report query failed: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(ReportRow {
                    captured_at: row.get(0)?,
                    age_minutes: row.get(1)?,
                    ip_addr: row.get(2)?,
                    hw_addr: row.get(3)?,
                    organization: row.get(4)?,
                })
            })
            .map_err(|e| Error::database(format!("report query failed: {}", e)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::database(format!("report query failed: {}", e)))
    }

    /// Reclaim space and refresh query planning statistics; advisory only,
    /// failures are logged and never fatal
    pub fn maintenance(&self) {
        run_maintenance(&self.conn);
    }
}

impl CurrentMappings for HistoryStore {
    fn current_hw(&self, ip_version: IpVersion, ip_addr: &str) -> Option<MacAddr> {
        let row = self
            .conn
            .query_row(
                "SELECT hwaddr FROM ipmap \
                 WHERE iptype = ?1 AND ipaddr = ?2 \
                 ORDER BY sec DESC, usec DESC \
                 LIMIT 1",
                params![ip_version.as_db(), ip_addr],
                |row| row.get::<_, String>(0),
            )
            .optional();
        match row {
            Ok(hwaddr) => hwaddr.and_then(|s| s.parse().ok()),
            Err(e) => {
                warn!("ipmap get current failed: {}", e);
                None
            }
        }
    }
}
