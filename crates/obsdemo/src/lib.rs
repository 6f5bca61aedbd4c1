//! Top-level facade crate for obsdemo.
//!
//! Re-exports the core types and the server library so users can depend on a single crate.

pub mod core {
    pub use obsdemo_core::*;
}

pub mod server {
    pub use obsdemo_server::*;
}
