//! # Processing Subsystem (gw-03)
//!
//! Tracks the external legs every write request leaves behind and settles
//! them in the background.
//!
//! ## Flow
//!
//! ```text
//! save pipeline ──add_record_legs────────────────────→ ProcessingTracker
//! commit        ──attach_ledger_tx / abort───────────→ ProcessingTracker
//! SettlementWatcher ──deal_status / tx_status──→ resolve_leg
//! client        ──status(request_id)──→ Pending | Processing | Done | Failed
//! ```
//!
//! The tracker is the only shared mutable state between pipelines. Requests
//! live in a sharded map, so updates to one request never block another.
//! No leg is ever retried here.

pub mod domain;
pub mod tracker;
pub mod watcher;

pub use domain::{
    LegKind, LegState, ProcessingError, ProcessingLeg, ProcessingRequest, RequestId,
    RequestStatus,
};
pub use tracker::{PendingLeg, ProcessingTracker};
pub use watcher::{SettlementWatcher, SyncReport, DEFAULT_RETENTION};
