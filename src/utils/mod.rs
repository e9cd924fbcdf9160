//! Utility modules for the slice exporter.

pub mod exec;
pub mod path;
