//! Domain layer for content storage.

pub mod compression;
pub mod content_id;
pub mod deal;
pub mod errors;

pub use compression::{
    CompressionConfig, CompressionError, Compressor, NoopCompressor, ZstdCompressor,
};
pub use content_id::ContentId;
pub use deal::{CustodianAddress, DealId, DealInfo, DealStatus};
pub use errors::{ContentError, DealError};
