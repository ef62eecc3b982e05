//! teachrate-index
//!
//! Prefix search index over the aggregated catalog. `tokenizer` holds the
//! name normalization shared by index construction and lookup.
pub mod index;
pub mod search;
pub mod tokenizer;

pub use index::IndexBuilder;
pub use search::{IndexSearcher, SearchHit};
