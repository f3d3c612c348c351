//! Ports layer for the document services.

pub mod keystore;

pub use keystore::{Keystore, UserKeys};
