//! Filesystem layout and name sanitization
//!
//! Downloaded reports land under `<financials_dir>/<sanitized company>/`,
//! with filenames prefixed by a sanitized human-readable label.

use std::path::{Path, PathBuf};

/// Sanitizes a report label into a filesystem-safe token.
///
/// Runs of anything that is not a word character or hyphen collapse into a
/// single underscore, with no leading or trailing separators. An empty
/// result falls back to `"financial"`.
pub fn sanitize_label(label: &str) -> String {
    let replaced: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut out = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        "financial".to_string()
    } else {
        out
    }
}

/// Sanitizes a company name into a directory name.
///
/// Keeps alphanumerics, hyphens, underscores and spaces; drops the rest.
pub fn sanitize_company(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect();
    let kept = kept.trim().to_string();
    if kept.is_empty() {
        "company".to_string()
    } else {
        kept
    }
}

/// Directory receiving a company's downloaded reports.
pub fn company_financials_dir(financials_dir: &Path, company: &str) -> PathBuf {
    financials_dir.join(sanitize_company(company))
}

/// Filename for a downloaded PDF: the URL's last path segment, prefixed
/// with the sanitized label unless the name already carries it
/// (case-insensitive containment).
pub fn pdf_file_name(url: &url::Url, label: &str) -> String {
    let base = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("download.pdf")
        .to_string();

    let prefix = sanitize_label(label);
    if base.to_lowercase().contains(&prefix.to_lowercase()) {
        base
    } else {
        format!("{}_{}", prefix, base)
    }
}
