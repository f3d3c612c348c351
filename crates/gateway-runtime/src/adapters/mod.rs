//! Port decorators added by the runtime.

pub mod metered;

pub use metered::{MeteredContentStore, MeteredLedger};
