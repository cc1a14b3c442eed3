//! Platform probes
//!
//! Environment checks made once at the edge; their results are passed into
//! the core as plain values.

pub mod environment;

pub use environment::{detect_headless, headless_from};
