//! Error types for gpx-ingest

use std::fmt;
use thiserror::Error;

/// Where in the rollup tree an aggregate was being computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Segment { track: String, segment: String },
    Track { track: String },
    Journey,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Segment { track, segment } => write!(f, "segment {}/{}", track, segment),
            Scope::Track { track } => write!(f, "track {}", track),
            Scope::Journey => write!(f, "journey"),
        }
    }
}

/// Errors that can occur during ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot compute {aggregate} over an empty collection in {scope}")]
    DegenerateAggregate {
        scope: Scope,
        aggregate: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse GPX document: {0}")]
    ParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("No journey has been ingested or loaded")]
    NotIngested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_aggregate_names_scope() {
        let err = IngestError::DegenerateAggregate {
            scope: Scope::Segment {
                track: "journey0".to_string(),
                segment: "seg2".to_string(),
            },
            aggregate: "avg_speed",
        };

        let message = err.to_string();
        assert!(message.contains("avg_speed"));
        assert!(message.contains("segment journey0/seg2"));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Journey.to_string(), "journey");
        assert_eq!(
            Scope::Track {
                track: "journey1".to_string()
            }
            .to_string(),
            "track journey1"
        );
    }
}
