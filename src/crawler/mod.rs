//! Crawl orchestration: pacing, HTML extraction, and per-company sequencing.

pub mod coordinator;
pub mod pacing;
pub mod parser;

pub use coordinator::{
    CompanyOutcome, CompanyReport, DownloadedFile, HarvestReport, Harvester, SkipReason,
};
pub use pacing::Pacer;
pub use parser::{CompanyListing, PdfLink};
