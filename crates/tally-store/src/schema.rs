//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Organization records, keyed by `org_id`.
    pub const ORGS: &str = "orgs";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "entries";

    /// Index: entries by organization, keyed by `org_id || entry_id`.
    /// The value is the entry's signed credit amount (8-byte LE), so
    /// balance recomputation never leaves this index.
    pub const ENTRIES_BY_ORG: &str = "entries_by_org";

    /// Idempotency receipts, keyed by `org_id || request_id`.
    pub const RECEIPTS: &str = "receipts";

    /// Usage rates, keyed by feature type.
    pub const RATES: &str = "rates";

    /// Lifecycle transition audit records, keyed by `transition_id` (ULID).
    pub const TRANSITIONS: &str = "transitions";

    /// Index: transitions by organization, keyed by
    /// `org_id || transition_id`. Value is empty (index only).
    pub const TRANSITIONS_BY_ORG: &str = "transitions_by_org";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ORGS,
        cf::ENTRIES,
        cf::ENTRIES_BY_ORG,
        cf::RECEIPTS,
        cf::RATES,
        cf::TRANSITIONS,
        cf::TRANSITIONS_BY_ORG,
    ]
}
