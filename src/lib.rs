//! gpx-ingest - Single-pass statistics engine for GPS track documents
//!
//! gpx-ingest turns a parsed GPX tree into a journey object graph through a
//! deterministic pipeline: document adaptation → per-point normalization →
//! derived values → scope accumulation → stats rollup → JSON encoding.
//!
//! ## Modules
//!
//! - **Engine**: One pass over tracks, segments and points, with SmartTrack
//!   splitting on long time gaps and category suppression
//! - **Pipeline**: One-shot functions and the stateful `GpxProcessor` for
//!   ingesting, saving, reloading and querying a journey

pub mod accumulator;
pub mod adapters;
pub mod context;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod features;
pub mod index;
pub mod normalizer;
pub mod pipeline;
pub mod policy;
pub mod schema;
pub mod stats;
pub mod types;

pub use engine::{Ingested, IngestionEngine};
pub use error::{IngestError, Scope};
pub use index::JourneyIndex;
pub use policy::{Category, ExperimentalFeatures, IngestConfig, SmartTrack, Suppression};
pub use types::{Journey, Point, Segment, Stats, Track};

#[cfg(feature = "gpx")]
pub use pipeline::ingest_gpx;
pub use pipeline::{ingest_document, ingest_tree_json, GpxProcessor};

// Schema exports
pub use schema::GpxDocument;

/// Engine version recorded in every journey's metadata
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
