//! Document adapters
//!
//! This module provides adapters that parse raw input into the structured
//! `GpxDocument` tree the engine consumes. A malformed tree is `InvalidInput`;
//! XML the `gpx` crate rejects is a `ParseError`.

mod tree_json;
#[cfg(feature = "gpx")]
mod xml;

pub use tree_json::TreeJsonAdapter;
#[cfg(feature = "gpx")]
pub use xml::GpxXmlAdapter;

use crate::error::IngestError;
use crate::schema::GpxDocument;

/// Trait for document adapters
pub trait DocumentAdapter {
    /// Parse raw input into a document tree
    fn parse(&self, raw: &str) -> Result<GpxDocument, IngestError>;
}
