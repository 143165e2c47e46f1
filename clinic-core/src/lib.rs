//! Shared collaborator seams for the clinic engine
//!
//! The scheduling and cashdesk services consume a few concerns the clinic
//! owns elsewhere: human-readable document numbering, the acting user on a
//! mutation, and the act/convention pricing catalog. This crate exposes them
//! as traits with in-memory implementations so the domain services stay
//! decoupled from their eventual backends.

pub mod catalog;
pub mod convention;
pub mod error;
pub mod sequence;
pub mod session;

pub use catalog::*;
pub use convention::*;
pub use error::*;
pub use sequence::*;
pub use session::*;
