//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the feed site and its media
//! hosts, and run the full login, crawl and download cycle end-to-end.

use likes_harvester::config::Config;
use likes_harvester::crawler::{crawl, ERROR_SNAPSHOT};
use likes_harvester::download::{target_path, ResourceLocator};
use likes_harvester::session::Credentials;
use likes_harvester::HarvestError;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMPTY_PAGE: &str = r#"<html><body><div class="no_posts_found">No posts found.</div></body></html>"#;

/// Creates a test configuration pointing every URL at the mock server
fn create_test_config(server: &MockServer, workers: u32) -> Config {
    let mut config = Config::default();
    let base = server.uri();

    config.crawler.base_url = format!("{}/likes", base);
    config.crawler.concurrency = workers;
    config.crawler.empty_page_limit = 2;
    config.crawler.navigation_retry_delay_ms = 0;

    config.download.concurrency = 4;
    config.download.retry_base_delay_ms = 0;

    config.session.login_url = format!("{}/login", base);
    config.session.dashboard_url = format!("{}/dashboard", base);

    config.filter.content_domain = "127.0.0.1".to_string();
    config
}

fn credentials() -> Credentials {
    Credentials::new("you@example.com", "hunter42")
}

/// Mounts a login form that accepts any POST
async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("location", format!("{}/dashboard", server.uri()).as_str()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>dashboard</html>"))
        .mount(server)
        .await;
}

/// Mounts page 0 with one image and one video, and empty pages after it
async fn mount_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/likes"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <div class="post"><div class="post_media"><img src="/media/a.jpg"></div></div>
                <div class="post"><div class="post_media">
                    <video><source src="/media/b" type="video/mp4"></video>
                </div></div>
                <div class="post"><p>text only</p></div>
            </body></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/likes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/media/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
        .expect(expected_fetches)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/b.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_feed(&server).await;
    mount_media(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 3);

    let summary = crawl(&config, &credentials(), dir.path().to_path_buf())
        .await
        .expect("harvest should succeed");

    assert_eq!(summary.workers, 3);
    assert_eq!(summary.failed_workers, 0);
    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.downloads.downloaded, 2);
    assert_eq!(summary.downloads.bytes, 19);

    let image = target_path(
        dir.path(),
        &ResourceLocator::new(format!("{}/media/a.jpg", server.uri())),
    );
    let video = target_path(
        dir.path(),
        &ResourceLocator::new(format!("{}/media/b.mp4", server.uri())),
    );
    assert_eq!(std::fs::read(&image).unwrap(), b"jpeg-bytes");
    assert_eq!(std::fs::read(&video).unwrap(), b"mp4-bytes");
    assert!(!dir.path().join(ERROR_SNAPSHOT).with_extension("html").exists());
}

#[tokio::test]
async fn test_second_run_skips_existing_files() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_feed(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 1);

    for locator in ["/media/a.jpg", "/media/b.mp4"] {
        let target = target_path(
            dir.path(),
            &ResourceLocator::new(format!("{}{}", server.uri(), locator)),
        );
        std::fs::write(target, b"already here").unwrap();
    }
    mount_media(&server, 0).await;

    let summary = crawl(&config, &credentials(), dir.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(summary.downloads.skipped, 2);
    assert_eq!(summary.downloads.downloaded, 0);
}

#[tokio::test]
async fn test_rejected_login_stops_before_crawling() {
    let server = MockServer::start().await;
    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>bad password</p>"))
        .mount(&server)
        .await;
    Mock::given(path("/likes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 2);

    let err = crawl(&config, &credentials(), dir.path().to_path_buf())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::Session(_)));
}

#[tokio::test]
async fn test_failed_worker_leaves_snapshot() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/likes"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<p>forbidden</p>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 1);

    let err = crawl(&config, &credentials(), dir.path().to_path_buf())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarvestError::WorkersFailed {
            failed: 1,
            total: 1
        }
    ));

    let snapshot = dir.path().join(ERROR_SNAPSHOT).with_extension("html");
    let content = std::fs::read_to_string(snapshot).unwrap();
    assert!(content.contains("forbidden"));
}
