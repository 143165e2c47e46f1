//! Clinic cash ledger
//!
//! Cash statements form a chain ordered by date (ledger number breaking
//! ties): each statement opens on its predecessor's closing balance and
//! freezes its own at close. Cash entries bill acts inside an open
//! statement, derive their payment state from partial and supplemental
//! payments, and carry each doctor's revenue share per line.

pub mod entry;
pub mod error;
pub mod models;
pub mod pricing;
pub mod revenue;
pub mod service;
pub mod statement;

pub use entry::*;
pub use error::*;
pub use models::*;
pub use pricing::*;
pub use revenue::*;
pub use service::*;
pub use statement::*;
