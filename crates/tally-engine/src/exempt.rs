//! Exemption registry.
//!
//! Exempt organizations bypass metering entirely: no gate check, no rate
//! lookup, no ledger write, and a sentinel unlimited balance. Membership is
//! external configuration, not ledger state.

use std::collections::HashSet;

use tally_core::{IdError, OrgId};

/// The configured set of unmetered organizations.
#[derive(Debug, Clone, Default)]
pub struct ExemptionSet {
    ids: HashSet<OrgId>,
}

impl ExemptionSet {
    /// An empty set: every organization is metered.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list of organization ids, the format used
    /// by the `TALLY_EXEMPT_ORG_IDS` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if any non-empty token is not a valid UUID.
    pub fn from_csv(value: &str) -> Result<Self, IdError> {
        let mut ids = HashSet::new();
        for token in value.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            ids.insert(token.parse()?);
        }
        Ok(Self { ids })
    }

    /// Whether an organization is exempt from metering.
    #[must_use]
    pub fn is_exempt(&self, org_id: &OrgId) -> bool {
        self.ids.contains(org_id)
    }

    /// Number of exempt organizations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<OrgId> for ExemptionSet {
    fn from_iter<I: IntoIterator<Item = OrgId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
