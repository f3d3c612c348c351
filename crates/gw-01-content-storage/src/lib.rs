//! # Content Storage Subsystem (gw-01)
//!
//! Boundary to the two external systems that hold document bodies:
//!
//! - the **content store**, which accepts ciphertext and returns a content
//!   identifier derived from the stored bytes, and
//! - the **deal settlement network**, which takes custody of a content
//!   identifier and reports a deal id plus the custodian's address.
//!
//! Both are consumed through outbound ports so the pipeline never depends on
//! a concrete network client. In-memory adapters back tests and the dev runtime.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): content ids, deal ids, compression, errors
//! - **Ports Layer** (`ports/`): `ContentStore`, `DealSettlement`
//! - **Adapters Layer** (`adapters/`): `InMemoryContentStore`, `InMemoryDealSettlement`

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryContentStore, InMemoryDealSettlement};
pub use domain::{
    CompressionConfig, CompressionError, Compressor, ContentError, ContentId, CustodianAddress,
    DealError, DealId, DealInfo, DealStatus, NoopCompressor, ZstdCompressor,
};
pub use ports::{ContentStore, DealSettlement};
