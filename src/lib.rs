//! Summarize benchmark metrics exports into per-operation timer statistics.

pub mod metrics;
pub mod model;
pub mod render;

pub type Result<T> = anyhow::Result<T>;
