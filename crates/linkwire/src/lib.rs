//! Top-level facade crate for linkwire.
//!
//! Re-exports the envelope core and the client library so users can depend on
//! a single crate.

pub mod core {
    pub use linkwire_core::*;
}

pub mod client {
    pub use linkwire_client::*;
}
