#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! teachrate-core
//!
//! Configuration, domain types and the record-level stages of the build:
//! CSV ingestion and normalization (`data_processor`, `normalize`),
//! deduplication (`dedup`) and aggregation (`aggregate`).

pub mod aggregate;
pub mod config;
pub mod data_processor;
pub mod dedup;
pub mod error;
pub mod ids;
pub mod normalize;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
