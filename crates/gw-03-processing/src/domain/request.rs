//! # Processing Requests
//!
//! A request groups the external sub-operations ("legs") one API call
//! started: storage deals and ledger transactions.
//!
//! ## State Machine
//!
//! ```text
//! Pending ──first leg──→ Processing ──all legs Done──→ Done
//!    │                        │
//!    │                        └──any leg Failed──→ Failed
//!    └─────────────abort──────────────────────────→ Failed
//! ```
//!
//! A request is aborted when its pipeline stops before the ledger accepts
//! the batch. Legs already submitted keep their own state.
//!
//! `Done` and `Failed` are terminal. A terminal request never changes status
//! again, even if a straggling leg resolves later.

use serde::Serialize;
use shared_types::MutationKind;
use std::fmt;

/// Identifier handed to clients for status polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Done | RequestStatus::Failed)
    }
}

/// What a leg waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegKind {
    FilecoinDeal,
    LedgerTx(MutationKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LegState {
    /// Ledger leg queued in a batch that has not been committed yet.
    Reserved,
    /// Submitted, awaiting settlement or confirmation.
    Pending,
    Done,
    Failed(String),
}

impl LegState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LegState::Done | LegState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingLeg {
    pub kind: LegKind,
    /// Deal id, or hex tx hash once known.
    pub external_id: Option<String>,
    pub state: LegState,
    /// Content id the leg makes durable (deal legs only).
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingRequest {
    pub id: RequestId,
    pub user_id: String,
    pub ehr_id: Option<String>,
    pub status: RequestStatus,
    pub legs: Vec<ProcessingLeg>,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds at which the status became terminal.
    pub finished_at: Option<u64>,
}

impl ProcessingRequest {
    pub fn new(id: RequestId, user_id: &str, ehr_id: Option<&str>, created_at: u64) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            ehr_id: ehr_id.map(str::to_string),
            status: RequestStatus::Pending,
            legs: Vec::new(),
            created_at,
            finished_at: None,
        }
    }

    /// Returns the index of the new leg.
    pub fn add_deal_leg(&mut self, deal_id: &str, content_id: &str) -> usize {
        self.legs.push(ProcessingLeg {
            kind: LegKind::FilecoinDeal,
            external_id: Some(deal_id.to_string()),
            state: LegState::Pending,
            content_id: Some(content_id.to_string()),
        });
        self.recompute_status();
        self.legs.len() - 1
    }

    /// Returns the index of the new leg.
    pub fn reserve_ledger_leg(&mut self, kind: MutationKind) -> usize {
        self.legs.push(ProcessingLeg {
            kind: LegKind::LedgerTx(kind),
            external_id: None,
            state: LegState::Reserved,
            content_id: None,
        });
        self.recompute_status();
        self.legs.len() - 1
    }

    /// Point the first reserved leg of `kind` at `tx_hash`, or append a new
    /// pending leg when none was reserved.
    pub fn attach_ledger_tx(&mut self, kind: MutationKind, tx_hash: &str) {
        let reserved = self
            .legs
            .iter_mut()
            .find(|leg| leg.kind == LegKind::LedgerTx(kind) && leg.state == LegState::Reserved);
        match reserved {
            Some(leg) => {
                leg.external_id = Some(tx_hash.to_string());
                leg.state = LegState::Pending;
            }
            None => self.legs.push(ProcessingLeg {
                kind: LegKind::LedgerTx(kind),
                external_id: Some(tx_hash.to_string()),
                state: LegState::Pending,
                content_id: None,
            }),
        }
        self.recompute_status();
    }

    /// Fail every leg still reserved and the request itself, including a
    /// request that has no legs yet. Returns how many legs failed.
    pub fn abort(&mut self, reason: &str) -> usize {
        let mut failed = 0;
        for leg in self.legs.iter_mut().filter(|l| l.state == LegState::Reserved) {
            leg.state = LegState::Failed(reason.to_string());
            failed += 1;
        }
        if !self.status.is_terminal() {
            self.status = RequestStatus::Failed;
        }
        failed
    }

    /// Move a non-terminal leg to `state`. Returns false if nothing changed.
    pub fn resolve_leg(&mut self, index: usize, state: LegState) -> bool {
        let Some(leg) = self.legs.get_mut(index) else {
            return false;
        };
        if leg.state.is_terminal() || leg.state == state {
            return false;
        }
        leg.state = state;
        self.recompute_status();
        true
    }

    fn recompute_status(&mut self) {
        if self.status.is_terminal() || self.legs.is_empty() {
            return;
        }
        self.status = if self.legs.iter().any(|l| matches!(l.state, LegState::Failed(_))) {
            RequestStatus::Failed
        } else if self.legs.iter().all(|l| l.state == LegState::Done) {
            RequestStatus::Done
        } else {
            RequestStatus::Processing
        };
    }

    /// True while any leg still waits on an external system.
    pub fn is_in_flight(&self) -> bool {
        !self.status.is_terminal()
    }

    /// True while the leg at `index` has no outcome yet.
    pub fn is_leg_open(&self, index: usize) -> bool {
        self.legs
            .get(index)
            .map(|leg| !leg.state.is_terminal())
            .unwrap_or(false)
    }
}
