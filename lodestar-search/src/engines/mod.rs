//! Search backend implementations.
//!
//! Each module provides a struct implementing [`crate::engine::SearchBackend`].

pub mod serper;

pub use serper::SerperBackend;
