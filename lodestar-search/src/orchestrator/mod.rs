//! Source orchestration: deduplication, relevance ranking and the
//! bounded concurrent gathering loop that ties search and fetch together.

pub mod dedup;
pub mod gather;
pub mod scoring;
