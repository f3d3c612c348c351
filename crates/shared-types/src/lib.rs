//! # Shared Types Crate
//!
//! Domain types shared by every crate of the document gateway.
//!
//! ## Contents
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `versioned_id` | `uid::authority::version` identifiers and base identity hashing |
//! | `record` | The index entry (`DocumentRecord`) and its ordered attribute list |
//! | `entities` | Document kinds, mutation kinds, hash and address aliases |
//! | `errors` | The gateway error taxonomy |
//! | `time` | Clock abstraction used for record timestamps |
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary lives here.
//! - **No Ambient State**: nothing in this crate performs I/O.

pub mod entities;
pub mod errors;
pub mod record;
pub mod time;
pub mod versioned_id;

pub use entities::*;
pub use errors::{ErrorKind, GatewayError};
pub use record::{AttributeCode, Attributes, DocumentRecord, DocumentStatus};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use versioned_id::{base_identity_of, VersionedId, ID_DELIMITER};
