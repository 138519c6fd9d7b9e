//! Durable storage for ipwatch
//!
//! Two SQLite stores back the system: a per-interface history database
//! holding the `ipmap` observation log, and a shared vendor directory
//! holding the IEEE MAC assignment tables. The daemon is the sole writer of
//! a history database; any number of external readers (the query tools) may
//! open the same files read-only at any time.

pub mod history;
pub mod vendor;

// Re-export main types
pub use history::{CurrentMapping, HistoryStore, OpenMode, ReportFilter, ReportRow};
pub use vendor::{MaRegistry, VendorDirectory, VendorEntry};
