//! Shared domain types and error surface for the crawl engine.
//!
//! Every other `vantage-*` crate depends on this one; it has no dependency on
//! any runtime or transport crate beyond serialization.

pub mod error;
pub mod model;

pub use error::{VantageError, VantageResult};
pub use model::*;
