//! Integration tests for the harvest orchestrator
//!
//! These tests mock the whole site topology (listings page, company pages,
//! financials pages, PDFs) and run the harvester end-to-end.

use mse_harvester::config::{DelayBand, Settings};
use mse_harvester::crawler::{CompanyOutcome, Harvester, SkipReason};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings(base_url: &str, dir: &Path) -> Settings {
    Settings {
        base_url: base_url.to_string(),
        listings_path: "listings".to_string(),
        user_agent: "TestHarvester/1.0".to_string(),
        timeout_secs: 5,
        retries: 1,
        backoff: 0.0,
        data_dir: dir.join("data"),
        financials_dir: dir.join("financials"),
        http_state_path: dir.join("http_state.json"),
        http_cache_dir: dir.join("http_cache"),
        http_cache_expire_secs: 0,
        retry_after_max_attempts: 2,
        retry_after_floor_secs: 0.0,
        page_delay: DelayBand::new(0.0, 0.0),
        download_delay: DelayBand::new(0.0, 0.0),
    }
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts a revalidating page: the full body is served exactly once, and
/// any request carrying the matching validator gets a 304.
async fn mount_revalidating_page(server: &MockServer, at: &str, body: String, etag: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .and(header("if-none-match", etag))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html")
                .insert_header("etag", etag),
        )
        .with_priority(5)
        .expect(1)
        .mount(server)
        .await;
}

fn listings_html(companies: &[&str]) -> String {
    let anchors: String = companies
        .iter()
        .map(|name| format!(r#"<tr><td><a href="/company/{0}">{0}</a></td></tr>"#, name))
        .collect();
    format!("<html><body><table>{}</table></body></html>", anchors)
}

fn company_html(name: &str) -> String {
    format!(
        r#"<html><body><nav>
           <a href="/company/{0}/profile">Profile</a>
           <a href="/company/{0}/financials">Financials</a>
           </nav></body></html>"#,
        name
    )
}

fn financials_html(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(label, href)| {
            format!(
                r#"<tr><td class="sorting_1">{}</td><td><a href="{}">Download</a></td></tr>"#,
                label, href
            )
        })
        .collect();
    format!("<html><body><table><tbody>{}</tbody></table></body></html>", body)
}

#[tokio::test]
async fn test_full_harvest_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&server.uri(), dir.path());

    mount_page(&server, "/robots.txt", "User-agent: *\nAllow: /\n".to_string()).await;
    mount_page(&server, "/listings", listings_html(&["ALPHA", "BETA"])).await;
    mount_page(&server, "/company/ALPHA", company_html("ALPHA")).await;
    mount_page(&server, "/company/BETA", company_html("BETA")).await;
    mount_page(
        &server,
        "/company/ALPHA/financials",
        financials_html(&[("Annual Report 2023", "/files/alpha-2023.pdf")]),
    )
    .await;
    // BETA's financials page has no PDF anchors at all
    mount_page(
        &server,
        "/company/BETA/financials",
        "<html><body><p>Coming soon</p></body></html>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/files/alpha-2023.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 alpha report".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let listings_url = settings.listings_url().unwrap();
    let harvester = Harvester::new(settings).await.unwrap();
    let report = harvester.run(&listings_url).await;

    assert_eq!(report.companies.len(), 2);

    let alpha = &report.companies[0];
    assert_eq!(alpha.name, "ALPHA");
    let files = alpha.outcome.files();
    assert_eq!(files.len(), 1);
    assert_eq!(
        files[0].path,
        dir.path()
            .join("financials/ALPHA/Annual_Report_2023_alpha-2023.pdf")
    );
    assert_eq!(
        std::fs::read(&files[0].path).unwrap(),
        b"%PDF-1.4 alpha report"
    );

    let beta = &report.companies[1];
    assert_eq!(beta.name, "BETA");
    assert!(matches!(
        beta.outcome,
        CompanyOutcome::Skipped(SkipReason::NoPdfLinks)
    ));
}

#[tokio::test]
async fn test_robots_disallow_skips_company_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&server.uri(), dir.path());

    mount_page(
        &server,
        "/robots.txt",
        "User-agent: *\nDisallow: /company/BLOCKED\n".to_string(),
    )
    .await;
    mount_page(&server, "/listings", listings_html(&["ALPHA", "BLOCKED"])).await;
    mount_page(&server, "/company/ALPHA", company_html("ALPHA")).await;
    mount_page(
        &server,
        "/company/ALPHA/financials",
        financials_html(&[("Interim 2024", "/files/alpha-h1.pdf")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/alpha-h1.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 h1".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    // The disallowed company page must never be requested
    Mock::given(method("GET"))
        .and(path("/company/BLOCKED"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&server)
        .await;

    let listings_url = settings.listings_url().unwrap();
    let harvester = Harvester::new(settings).await.unwrap();
    let report = harvester.run(&listings_url).await;

    assert_eq!(report.companies.len(), 2);
    assert_eq!(report.companies[0].outcome.files().len(), 1);
    assert!(matches!(
        report.companies[1].outcome,
        CompanyOutcome::Skipped(SkipReason::RobotsDenied)
    ));
}

#[tokio::test]
async fn test_second_run_leaves_unchanged_download_alone() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&server.uri(), dir.path());

    mount_page(&server, "/robots.txt", "User-agent: *\nAllow: /\n".to_string()).await;
    // Every page revalidates on the second run: the full bodies are
    // transferred exactly once across both runs
    mount_revalidating_page(&server, "/listings", listings_html(&["ALPHA"]), "\"l1\"").await;
    mount_revalidating_page(&server, "/company/ALPHA", company_html("ALPHA"), "\"c1\"").await;
    mount_revalidating_page(
        &server,
        "/company/ALPHA/financials",
        financials_html(&[("Annual Report 2023", "/files/alpha-2023.pdf")]),
        "\"f1\"",
    )
    .await;

    // Second run revalidates and the origin answers 304
    Mock::given(method("GET"))
        .and(path("/files/alpha-2023.pdf"))
        .and(header("if-none-match", "\"p1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    // First run downloads the bytes, exactly once across both runs
    Mock::given(method("GET"))
        .and(path("/files/alpha-2023.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4 alpha report".to_vec())
                .insert_header("etag", "\"p1\""),
        )
        .with_priority(5)
        .expect(1)
        .mount(&server)
        .await;

    let listings_url = settings.listings_url().unwrap();
    let expected_path = dir
        .path()
        .join("financials/ALPHA/Annual_Report_2023_alpha-2023.pdf");

    let first_run = Harvester::new(settings.clone()).await.unwrap();
    let report = first_run.run(&listings_url).await;
    assert_eq!(report.companies[0].outcome.files().len(), 1);
    assert_eq!(
        std::fs::read(&expected_path).unwrap(),
        b"%PDF-1.4 alpha report"
    );

    let second_run = Harvester::new(settings).await.unwrap();
    let report = second_run.run(&listings_url).await;

    // The unchanged file still counts as harvested and is untouched on disk
    assert_eq!(report.companies[0].outcome.files().len(), 1);
    assert_eq!(report.companies[0].outcome.files()[0].path, expected_path);
    assert_eq!(
        std::fs::read(&expected_path).unwrap(),
        b"%PDF-1.4 alpha report"
    );
}

#[tokio::test]
async fn test_deleted_download_restored_after_304() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&server.uri(), dir.path());

    mount_page(&server, "/robots.txt", "User-agent: *\nAllow: /\n".to_string()).await;
    mount_page(&server, "/listings", listings_html(&["ALPHA"])).await;
    mount_page(&server, "/company/ALPHA", company_html("ALPHA")).await;
    mount_page(
        &server,
        "/company/ALPHA/financials",
        financials_html(&[("Annual Report 2023", "/files/alpha-2023.pdf")]),
    )
    .await;

    // The second run revalidates and the origin confirms no change
    Mock::given(method("GET"))
        .and(path("/files/alpha-2023.pdf"))
        .and(header("if-none-match", "\"p1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    // Hit twice: the first download, and the unconditional re-fetch after
    // the local file goes missing
    Mock::given(method("GET"))
        .and(path("/files/alpha-2023.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4 alpha report".to_vec())
                .insert_header("etag", "\"p1\""),
        )
        .with_priority(5)
        .expect(2)
        .mount(&server)
        .await;

    let listings_url = settings.listings_url().unwrap();
    let expected_path = dir
        .path()
        .join("financials/ALPHA/Annual_Report_2023_alpha-2023.pdf");

    let first_run = Harvester::new(settings.clone()).await.unwrap();
    let report = first_run.run(&listings_url).await;
    assert_eq!(report.companies[0].outcome.files().len(), 1);

    // The validators survive but the file itself is gone
    std::fs::remove_file(&expected_path).unwrap();

    let second_run = Harvester::new(settings).await.unwrap();
    let report = second_run.run(&listings_url).await;

    assert_eq!(report.companies[0].outcome.files().len(), 1);
    assert_eq!(report.companies[0].outcome.files()[0].path, expected_path);
    assert_eq!(
        std::fs::read(&expected_path).unwrap(),
        b"%PDF-1.4 alpha report"
    );
}

#[tokio::test]
async fn test_company_without_financials_link_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&server.uri(), dir.path());

    mount_page(&server, "/robots.txt", "User-agent: *\nAllow: /\n".to_string()).await;
    mount_page(&server, "/listings", listings_html(&["GAMMA"])).await;
    mount_page(
        &server,
        "/company/GAMMA",
        r#"<html><body><a href="/company/GAMMA/profile">Profile</a></body></html>"#.to_string(),
    )
    .await;

    let listings_url = settings.listings_url().unwrap();
    let harvester = Harvester::new(settings).await.unwrap();
    let report = harvester.run(&listings_url).await;

    assert!(matches!(
        report.companies[0].outcome,
        CompanyOutcome::Skipped(SkipReason::FinancialsLinkMissing)
    ));
}

#[tokio::test]
async fn test_selection_restricts_batch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let settings = test_settings(&server.uri(), dir.path());

    mount_page(&server, "/robots.txt", "User-agent: *\nAllow: /\n".to_string()).await;
    mount_page(&server, "/listings", listings_html(&["ALPHA", "BETA"])).await;
    mount_page(&server, "/company/ALPHA", company_html("ALPHA")).await;
    mount_page(
        &server,
        "/company/ALPHA/financials",
        financials_html(&[("Annual Report 2023", "/files/alpha-2023.pdf")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/alpha-2023.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .mount(&server)
        .await;

    // BETA is listed but deselected; its page must never be requested
    Mock::given(method("GET"))
        .and(path("/company/BETA"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never served"))
        .expect(0)
        .mount(&server)
        .await;

    let listings_url = settings.listings_url().unwrap();
    let harvester = Harvester::new(settings).await.unwrap();
    let report = harvester
        .run_selected(&listings_url, &["alpha".to_string()])
        .await;

    assert_eq!(report.companies.len(), 1);
    assert_eq!(report.companies[0].name, "ALPHA");
}
