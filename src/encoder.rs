//! Journey encoding
//!
//! Serializes the output graph to JSON and loads it back. Field order follows
//! the graph (tracks, segments and points stay in ingestion order) so encoding
//! the same journey twice yields identical bytes.

use crate::error::IngestError;
use crate::types::Journey;
use log::debug;

/// JSON encoder for ingested journeys
#[derive(Debug, Clone, Copy, Default)]
pub struct JourneyEncoder {
    pretty: bool,
}

impl JourneyEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder that emits indented JSON
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Encode a journey to a JSON string
    pub fn encode_to_json(&self, journey: &Journey) -> Result<String, IngestError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(journey)?
        } else {
            serde_json::to_string(journey)?
        };
        debug!("encoded journey to {} bytes of JSON", json.len());
        Ok(json)
    }

    /// Encode a journey to a JSON value
    pub fn encode_to_value(&self, journey: &Journey) -> Result<serde_json::Value, IngestError> {
        serde_json::to_value(journey).map_err(IngestError::JsonError)
    }

    /// Load a previously encoded journey
    pub fn decode(&self, json: &str) -> Result<Journey, IngestError> {
        serde_json::from_str(json).map_err(|e| IngestError::EncodingError(e.to_string()))
    }
}
