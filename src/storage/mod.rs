//! Persistent registry of downloaded files.

pub mod sqlite;

pub use sqlite::{FileRecord, FileRegistry};
