//! CLI command implementations.

pub mod dump;
pub mod tail;
pub mod verify;
