//! Markdown run manifest
//!
//! This module renders a human-readable summary of a harvest run: which
//! companies were harvested, which were skipped and why, and the files
//! saved for each.

use crate::crawler::{CompanyOutcome, HarvestReport};
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the run manifest to `output_path`.
///
/// # Arguments
///
/// * `report` - The harvest run result
/// * `output_path` - Path where the markdown file should be written
pub fn write_manifest(report: &HarvestReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_manifest(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a harvest report as markdown.
pub fn format_manifest(report: &HarvestReport) -> String {
    let mut md = String::new();

    md.push_str("# MSE Harvest Manifest\n\n");
    md.push_str(&format!(
        "- **Generated**: {}\n",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    ));
    md.push_str(&format!("- **Companies**: {}\n", report.companies.len()));

    let harvested = report
        .companies
        .iter()
        .filter(|c| matches!(c.outcome, CompanyOutcome::Harvested(_)))
        .count();
    let files = report.downloaded().count();
    md.push_str(&format!("- **Harvested**: {}\n", harvested));
    md.push_str(&format!(
        "- **Skipped**: {}\n",
        report.companies.len() - harvested
    ));
    md.push_str(&format!("- **Files Saved**: {}\n\n", files));

    md.push_str("## Companies\n\n");
    for company in &report.companies {
        match &company.outcome {
            CompanyOutcome::Harvested(downloads) => {
                md.push_str(&format!(
                    "### {} ({} file{})\n\n",
                    company.name,
                    downloads.len(),
                    if downloads.len() == 1 { "" } else { "s" }
                ));
                if downloads.is_empty() {
                    md.push_str("_No files saved this run._\n\n");
                    continue;
                }
                md.push_str("| Label | File | Source |\n");
                md.push_str("|-------|------|--------|\n");
                for file in downloads {
                    md.push_str(&format!(
                        "| {} | `{}` | {} |\n",
                        file.label,
                        file.path.display(),
                        file.url
                    ));
                }
                md.push('\n');
            }
            CompanyOutcome::Skipped(reason) => {
                md.push_str(&format!("### {} (skipped)\n\n", company.name));
                md.push_str(&format!("_{}_\n\n", reason));
            }
        }
    }

    md
}
