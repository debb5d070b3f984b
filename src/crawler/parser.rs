//! HTML extraction for the fixed site topology
//!
//! Three extraction points: company anchors on the listings page, the
//! "Financials" navigation link on a company page, and labeled PDF anchors
//! on the financials page. The origin's markup has drifted over time, so
//! selectors are tried in sequence rather than exclusively.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A company discovered on the listings page.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyListing {
    pub name: String,
    pub url: Url,
}

/// A candidate PDF with its human-readable label.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLink {
    pub label: String,
    pub url: Url,
}

/// Longer anchor texts on the listings page are navigation items, not
/// ticker names.
const MAX_COMPANY_NAME_LEN: usize = 30;

/// Extracts `(name, url)` company pairs from the listings page.
///
/// De-duplicates by `(name, url)` preserving first-seen order.
pub fn parse_companies(html: &str, base_url: &Url) -> Vec<CompanyListing> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href*='/company/']").expect("static selector");

    let mut seen = HashSet::new();
    let mut companies = Vec::new();

    for anchor in document.select(&selector) {
        let name = element_text(&anchor);
        if name.is_empty() || name.len() > MAX_COMPANY_NAME_LEN {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(url) = base_url.join(href) else {
            continue;
        };

        if seen.insert((name.clone(), url.clone())) {
            companies.push(CompanyListing { name, url });
        }
    }

    companies
}

/// Locates the "Financials" navigation link on a company page.
///
/// Anchor text is scanned first; a class-based selector is the fallback for
/// the older markup variant.
pub fn find_financials_url(html: &str, page_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);

    let any_anchor = Selector::parse("a[href]").expect("static selector");
    for anchor in document.select(&any_anchor) {
        if element_text(&anchor).to_lowercase().contains("financials") {
            if let Some(url) = join_href(&anchor, page_url) {
                return Some(url);
            }
        }
    }

    for fallback in ["a.nav-link[href*='financial']", "a.vav-link[href*='financial']"] {
        let selector = Selector::parse(fallback).expect("static selector");
        if let Some(url) = document
            .select(&selector)
            .next()
            .and_then(|anchor| join_href(&anchor, page_url))
        {
            return Some(url);
        }
    }

    None
}

/// Collects `(label, url)` PDF pairs from the financials page.
///
/// The label comes from the row's `.sorting_1` cell when present, else the
/// anchor's own text, else a generic placeholder. De-duplicated by resolved
/// absolute URL, first-seen order preserved.
pub fn extract_pdf_links(html: &str, page_url: &Url) -> Vec<PdfLink> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr").expect("static selector");
    let label_selector = Selector::parse(".sorting_1").expect("static selector");
    let anchor_selector =
        Selector::parse("a[href$='.pdf'], a[href*='.pdf'], a.btn.btn-success[href]")
            .expect("static selector");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for row in document.select(&row_selector) {
        let row_label = row
            .select(&label_selector)
            .next()
            .map(|cell| element_text(&cell))
            .filter(|label| !label.is_empty());

        for anchor in row.select(&anchor_selector) {
            let Some(url) = join_href(&anchor, page_url) else {
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let label = row_label.clone().unwrap_or_else(|| {
                let text = element_text(&anchor);
                if text.is_empty() {
                    "financial".to_string()
                } else {
                    text
                }
            });
            links.push(PdfLink { label, url });
        }
    }

    links
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_href(anchor: &ElementRef, base: &Url) -> Option<Url> {
    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}
