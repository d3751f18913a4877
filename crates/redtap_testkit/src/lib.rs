//! Test utilities for redtap.
//!
//! This crate provides:
//! - Snapshot dump builders and on-disk fixtures
//! - Byte scripts for the source side of a replication session
//! - Property-based generators using proptest
//!
//! It is a dev-dependency of the other redtap crates; nothing here is
//! part of the library surface proper.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod script;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::script::*;
}

pub use fixtures::*;
pub use generators::*;
pub use script::*;
