//! `contentforge-core`: foundation building blocks shared by every crate.
//!
//! This crate contains **pure** primitives (no IO, no runtime).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
