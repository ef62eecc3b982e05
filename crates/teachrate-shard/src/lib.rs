//! teachrate-shard
//!
//! Publishes a build as static JSON: per-teacher shards, a manifest, the
//! search index and catalog summaries. Everything is written into a staging
//! directory and promoted in one rename.
pub mod overview;
pub mod schema;
pub mod staging;
pub mod writer;

pub use staging::{write_json, StagingArea};
pub use writer::JsonShardWriter;
