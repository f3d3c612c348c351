//! Domain layer for the document services.

pub mod context;
pub mod documents;
pub mod outcomes;

pub use context::RequestContext;
pub use documents::{
    Composition, Document, DocumentItem, Ehr, EhrStatus, ObjectRef, PartyRef, PartySelf,
    StoredQuery,
};
pub use outcomes::{DeleteOutcome, EhrCreated, SavedDocument};
