//! Render pipeline construction and caching.
//!
//! - `basic` turns a material into a pipeline descriptor and builds wgpu pipelines
//! - `cache` memoizes one pipeline per material kind and topology

pub mod basic;
pub mod cache;
