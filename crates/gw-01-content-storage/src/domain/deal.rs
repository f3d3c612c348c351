//! Deal settlement value objects.

use std::fmt;

/// Identifier of a storage deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DealId(pub String);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of the custodian holding a deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustodianAddress(pub String);

impl fmt::Display for CustodianAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of starting a deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealInfo {
    pub deal_id: DealId,
    pub custodian: CustodianAddress,
}

/// Settlement progress of a deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealStatus {
    /// Proposed, not yet sealed by the custodian.
    Pending,
    /// Sealed and retained.
    Active,
    /// Permanently failed.
    Failed(String),
}

impl DealStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DealStatus::Pending)
    }
}
