//! Input boundary
//!
//! This module defines the parsed-tree shape the ingestion engine consumes:
//! tracks of segments of points, plus standalone waypoints and routes.

mod document;

pub use document::*;
