//! Pure reconciliation rules.
//!
//! Ownership is never stored. It is inferred from whether a provenance
//! record exists and whether the asset still hashes to what the record says.

use serde::Serialize;

use crate::provenance::{Fingerprint, LocalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Asset present without a record: someone else put it there.
    UserSupplied,
    /// Asset no longer matches the fingerprint we recorded.
    UserModified,
    /// Fingerprint matches and the catalog still points at the same source.
    UpToDate,
    /// A fetch was warranted but the catalog had no usable answer.
    NoTheme,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UserSupplied => "user supplied",
            SkipReason::UserModified => "user modified",
            SkipReason::UpToDate => "up to date",
            SkipReason::NoTheme => "no theme in catalog",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    /// Record is stale (asset gone). Purge it, then fetch.
    PurgeThenFetch,
    Fetch,
}

impl Decision {
    pub fn wants_fetch(&self) -> bool {
        matches!(self, Decision::Fetch | Decision::PurgeThenFetch)
    }
}

/// Apply the rules in order. `live_url` is this run's catalog answer,
/// `existing_url` the source recorded last time (if a record was read).
pub fn decide(local: &LocalState, live_url: Option<&str>, existing_url: Option<&str>) -> Decision {
    match (local.asset_exists, local.record_exists) {
        (false, false) => Decision::Fetch,
        (false, true) => Decision::PurgeThenFetch,
        (true, false) => Decision::Skip(SkipReason::UserSupplied),
        (true, true) => match local.fingerprint {
            Fingerprint::Unknown => Decision::Fetch,
            Fingerprint::Mismatch => Decision::Skip(SkipReason::UserModified),
            Fingerprint::Match => match live_url {
                // Nothing upstream to move to; keep what we wrote.
                None => Decision::Skip(SkipReason::UpToDate),
                Some(live) if Some(live) == existing_url => Decision::Skip(SkipReason::UpToDate),
                Some(_) => Decision::Fetch,
            },
        },
    }
}
