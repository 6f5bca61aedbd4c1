//! obsdemo core: error types and JSON response bodies shared by the server and
//! its tests.
//!
//! This crate carries no transport or runtime dependencies so the wire shapes
//! of the demo routes can be asserted on without pulling in axum or tokio.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ObsDemoError, Result};
