//! # Clinical Document Gateway Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Gateway on a manual clock with hand-driven settlement
//! └── integration/
//!     ├── scenarios.rs   # End-to-end scenarios A–E
//!     ├── properties.rs  # Identifier, envelope, duplicate and tombstone properties
//!     └── failures.rs    # Partial failures and concurrent writers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gw-tests
//! cargo test -p gw-tests integration::scenarios::
//! ```

pub mod harness;
pub mod integration;
