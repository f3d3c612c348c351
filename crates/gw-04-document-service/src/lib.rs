//! # Document Service Subsystem (gw-04)
//!
//! Turns plaintext clinical documents into encrypted, content-addressed,
//! versioned index records and back.
//!
//! ## Services
//!
//! | Service | Documents | Storage |
//! |---------|-----------|---------|
//! | `EhrService` | EHR + initial EHR_STATUS, user and subject mappings | content store + one batch |
//! | `StatusService` | EHR_STATUS versions | content store + one batch |
//! | `CompositionService` | COMPOSITION versions, soft delete, listing | content store + one batch |
//! | `QueryService` | stored queries | inline on the index record, single tx |
//!
//! ## Guarantees
//!
//! - Malformed ids and failed preconditions return before any external call.
//! - A (base identity, version) pair is written at most once.
//! - A tombstoned version reads as `AlreadyDeleted`, never `NotFound`.
//! - A record whose content has not settled reads as `StillProcessing`.
//! - Completed content and deal legs are never rolled back; the processing
//!   request records them.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): document shapes, request context, outcomes
//! - **Ports Layer** (`ports/`): `Keystore`
//! - **Adapters Layer** (`adapters/`): `InMemoryKeystore`
//! - **Application** (`pipeline`, `service/`): save/read state machines and the services over them

pub mod adapters;
pub mod config;
pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod service;

pub use adapters::InMemoryKeystore;
pub use config::DocumentServiceConfig;
pub use domain::{
    Composition, DeleteOutcome, Document, DocumentItem, Ehr, EhrCreated, EhrStatus, ObjectRef,
    PartyRef, PartySelf, RequestContext, SavedDocument, StoredQuery,
};
pub use pipeline::{DocumentPipeline, OpenedRecord, ReadTarget, SaveTarget};
pub use ports::{Keystore, UserKeys};
pub use service::{
    CompositionService, EhrService, QueryService, StatusService, DEFAULT_QUERY_VERSION,
};
