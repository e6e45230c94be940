//! Storage layer: credential store, tabular sink and run lock.

pub mod credentials;
pub mod lock;
pub mod tables;

pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use lock::RunLock;
pub use tables::{JsonlTableStore, MemoryTableStore, Row, TableSink};

/// Table names as constants.
pub mod table_names {
    /// Latest pull of enriched activities, replaced on every run
    pub const STAGING_ACTIVITIES: &str = "StravaData";
    /// Latest pull of splits, replaced on every run
    pub const STAGING_SPLITS: &str = "Splits";
    /// Append-only activity history
    pub const ACTIVITIES: &str = "Data";
    /// Append-only split history
    pub const SPLITS: &str = "SplitsDataStored";
}
