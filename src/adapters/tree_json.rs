//! JSON document tree adapter
//!
//! Reads the JSON form of an already-parsed GPX tree: track containers with
//! segments and points, optional waypoints and routes. Numeric attributes may be
//! given as numbers or strings.

use crate::error::IngestError;
use crate::schema::GpxDocument;
use log::debug;

use super::DocumentAdapter;

/// JSON tree adapter
pub struct TreeJsonAdapter;

impl DocumentAdapter for TreeJsonAdapter {
    fn parse(&self, raw: &str) -> Result<GpxDocument, IngestError> {
        let document: GpxDocument = serde_json::from_str(raw)
            .map_err(|e| IngestError::InvalidInput(format!("malformed document tree: {}", e)))?;

        debug!(
            "parsed document tree: {} tracks, {} waypoints, {} routes",
            document.tracks.len(),
            document.waypoints.len(),
            document.routes.len()
        );
        Ok(document)
    }
}
