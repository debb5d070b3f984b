//! Run reporting.

pub mod manifest;

pub use manifest::{format_manifest, write_manifest};
