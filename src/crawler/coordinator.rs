//! Page fetch orchestration
//!
//! Sequences listings -> company page -> financials page -> PDF downloads,
//! strictly one request at a time. Failures are scoped: a company that
//! cannot be harvested is skipped with a diagnostic, never aborting the
//! batch.

use crate::config::Settings;
use crate::crawler::pacing::Pacer;
use crate::crawler::parser::{self, PdfLink};
use crate::http::{DiskCache, FetchEngine, FetchOptions, HttpConfig, NoopCache, ResponseCache};
use crate::paths;
use crate::robots::RobotsPolicy;
use crate::state::{ConditionalStore, HtmlCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Why a company (or page) was skipped rather than harvested.
#[derive(Debug)]
pub enum SkipReason {
    /// robots.txt disallows the URL; never retried.
    RobotsDenied,
    /// The page could not be fetched after all retries.
    PageUnavailable(String),
    /// No "Financials" navigation link found on the company page.
    FinancialsLinkMissing,
    /// The financials page carried no recognizable PDF anchors.
    NoPdfLinks,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::RobotsDenied => write!(f, "disallowed by robots.txt"),
            SkipReason::PageUnavailable(detail) => write!(f, "page unavailable: {}", detail),
            SkipReason::FinancialsLinkMissing => write!(f, "financials link not found"),
            SkipReason::NoPdfLinks => write!(f, "no financial PDFs found"),
        }
    }
}

/// A report PDF saved to disk.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub label: String,
    pub url: Url,
    pub path: PathBuf,
}

/// Outcome of one company's harvest; companies are independent.
#[derive(Debug)]
pub enum CompanyOutcome {
    Harvested(Vec<DownloadedFile>),
    Skipped(SkipReason),
}

impl CompanyOutcome {
    pub fn files(&self) -> &[DownloadedFile] {
        match self {
            CompanyOutcome::Harvested(files) => files,
            CompanyOutcome::Skipped(_) => &[],
        }
    }
}

#[derive(Debug)]
pub struct CompanyReport {
    pub name: String,
    pub outcome: CompanyOutcome,
}

/// Aggregate result of a full run.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub companies: Vec<CompanyReport>,
}

impl HarvestReport {
    /// All files saved this run, with their owning company.
    pub fn downloaded(&self) -> impl Iterator<Item = (&str, &DownloadedFile)> {
        self.companies
            .iter()
            .flat_map(|report| report.outcome.files().iter().map(move |f| (report.name.as_str(), f)))
    }
}

/// The orchestrator: owns the fetch engine, the resolved robots policy, and
/// the pacer for the lifetime of a run.
pub struct Harvester {
    engine: FetchEngine,
    robots: RobotsPolicy,
    pacer: Pacer,
    settings: Settings,
}

impl Harvester {
    /// Builds the service graph and resolves the robots policy (one fetch).
    pub async fn new(settings: Settings) -> crate::Result<Self> {
        let base_url = Url::parse(&settings.base_url)?;

        let state = Arc::new(ConditionalStore::new(&settings.http_state_path));
        let html_cache = HtmlCache::new(settings.html_cache_dir());
        let response_cache: Box<dyn ResponseCache> = if settings.http_cache_expire_secs > 0 {
            Box::new(DiskCache::new(
                &settings.http_cache_dir,
                Duration::from_secs(settings.http_cache_expire_secs),
            ))
        } else {
            Box::new(NoopCache)
        };

        let engine = FetchEngine::new(
            HttpConfig::from(&settings),
            state,
            html_cache,
            response_cache,
        );

        let robots = RobotsPolicy::resolve(&engine, &base_url, &settings.user_agent).await;
        let pacer = Pacer::new(robots.crawl_delay_floor());

        Ok(Self {
            engine,
            robots,
            pacer,
            settings,
        })
    }

    /// Harvests every company found on the listings page, sequentially.
    pub async fn run(&self, listings_url: &Url) -> HarvestReport {
        self.run_selected(listings_url, &[]).await
    }

    /// Like [`run`](Self::run), but when `only` is non-empty restricts the
    /// batch to companies whose name matches one of the entries
    /// (case-insensitive).
    pub async fn run_selected(&self, listings_url: &Url, only: &[String]) -> HarvestReport {
        let listings_html = match self.fetch_page_gated(listings_url, "listings page").await {
            Ok(html) => html,
            Err(reason) => {
                tracing::error!("Unable to fetch listings page {}: {}", listings_url, reason);
                return HarvestReport::default();
            }
        };

        let mut companies = parser::parse_companies(&listings_html, listings_url);
        tracing::info!("Found {} companies on listings page", companies.len());

        if !only.is_empty() {
            companies.retain(|company| {
                only.iter()
                    .any(|name| name.eq_ignore_ascii_case(&company.name))
            });
            tracing::info!("Selected {} of the listed companies", companies.len());
        }

        let mut report = HarvestReport::default();
        for company in companies {
            let outcome = self.harvest_company(&company.name, &company.url).await;
            if let CompanyOutcome::Skipped(reason) = &outcome {
                tracing::warn!("Skipping {}: {}", company.name, reason);
            }
            report.companies.push(CompanyReport {
                name: company.name,
                outcome,
            });
        }
        report
    }

    /// Harvests a single company: company page -> financials page -> PDFs.
    ///
    /// Never errors; every failure becomes a `Skipped` outcome.
    pub async fn harvest_company(&self, name: &str, url: &Url) -> CompanyOutcome {
        tracing::info!("Harvesting {} -> {}", name, url);

        let page_html = match self.fetch_page_gated(url, "company page").await {
            Ok(html) => html,
            Err(reason) => return CompanyOutcome::Skipped(reason),
        };

        let Some(financials_url) = parser::find_financials_url(&page_html, url) else {
            return CompanyOutcome::Skipped(SkipReason::FinancialsLinkMissing);
        };

        let financials_html = match self
            .fetch_page_gated(&financials_url, "financials page")
            .await
        {
            Ok(html) => html,
            Err(reason) => return CompanyOutcome::Skipped(reason),
        };

        let pdf_links = parser::extract_pdf_links(&financials_html, &financials_url);
        if pdf_links.is_empty() {
            return CompanyOutcome::Skipped(SkipReason::NoPdfLinks);
        }
        tracing::info!("{}: {} candidate PDF(s)", name, pdf_links.len());

        let dest_dir = paths::company_financials_dir(&self.settings.financials_dir, name);
        let mut saved = Vec::new();
        for link in &pdf_links {
            if let Some(file) = self.download_pdf(link, &dest_dir).await {
                tracing::info!("Saved {}", file.path.display());
                saved.push(file);
            }
        }
        CompanyOutcome::Harvested(saved)
    }

    /// Robots-gated page fetch with pacing after origin round-trips.
    async fn fetch_page_gated(&self, url: &Url, what: &str) -> Result<String, SkipReason> {
        if !self.robots.allow(url) {
            tracing::warn!("robots.txt disallows fetching {}: {}", what, url);
            return Err(SkipReason::RobotsDenied);
        }

        match self.engine.fetch_page(url).await {
            Ok(page) => {
                if page.origin_touched {
                    self.pacer.wait(self.settings.page_delay).await;
                }
                Ok(page.text)
            }
            Err(e) => Err(SkipReason::PageUnavailable(e.to_string())),
        }
    }

    /// Downloads one PDF with conditional semantics.
    ///
    /// A 304 with the local file still present means unchanged: the file is
    /// left untouched. Failures skip the link, not the company.
    async fn download_pdf(&self, link: &PdfLink, dest_dir: &Path) -> Option<DownloadedFile> {
        let url = &link.url;
        if !self.robots.allow(url) {
            tracing::warn!("Skipping {} (disallowed by robots.txt)", url);
            return None;
        }

        let dest = dest_dir.join(paths::pdf_file_name(url, &link.label));

        // Downloads bypass the response cache: the byte payload lives on
        // disk already, revalidation is the conditional request itself.
        let opts = FetchOptions::get().uncacheable();
        let mut response = match self.engine.fetch(url, &opts).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", url, e);
                return None;
            }
        };

        if response.is_not_modified() {
            if dest.exists() {
                tracing::info!("Unchanged: {}", dest.display());
                self.pacer.wait(self.settings.download_delay).await;
                return Some(DownloadedFile {
                    label: link.label.clone(),
                    url: url.clone(),
                    path: dest,
                });
            }

            // Validators exist but the file is gone; refresh both.
            response = match self
                .engine
                .fetch(url, &FetchOptions::get().unconditional().uncacheable())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Failed to re-download {}: {}", url, e);
                    return None;
                }
            };
        }

        if response.status != 200 {
            tracing::warn!("Unexpected status {} for {}", response.status, url);
            return None;
        }

        if let Err(e) =
            std::fs::create_dir_all(dest_dir).and_then(|_| std::fs::write(&dest, &response.body))
        {
            tracing::warn!("Failed to write {}: {}", dest.display(), e);
            return None;
        }

        if !response.from_cache {
            self.pacer.wait(self.settings.download_delay).await;
        }

        Some(DownloadedFile {
            label: link.label.clone(),
            url: url.clone(),
            path: dest,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
