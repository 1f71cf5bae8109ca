//! Authentication primitives.
//!
//! - [`session`] -- Server-side login sessions keyed by hashed opaque tokens.

pub mod session;
