//! End-to-end crawl tests
//!
//! Most of these run the real HTTP fetcher against wiremock servers; the
//! concurrency and render checks use instrumented backends instead.

use crate::common::{mount_html, test_config, CountingRenderer, InstrumentedFetcher};
use flocrawl::crawler::{
    Coordinator, CrawlLimits, CrawlTarget, ErrorKind, HttpFetcher, NoRenderer, StopReason,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REACT_SHELL: &str =
    r#"<html><head><script src="/bundle.js"></script></head><body><div id="root"></div></body></html>"#;

fn limits(max_pages: usize, max_concurrent: usize) -> CrawlLimits {
    CrawlLimits {
        max_pages,
        max_concurrent,
        same_domain_only: true,
    }
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{0}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_html(
        &server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>Content 1 <a href="/page2">again</a></body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body>Content 2</body></html>"#,
    )
    .await;

    let coordinator = Coordinator::new(test_config()).expect("Failed to create coordinator");
    let report = coordinator
        .crawl(CrawlTarget::Seed(format!("{}/", base)), limits(10, 4))
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages.len(), 3, "pages: {:?}", report.pages.keys());
    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stop_reason, StopReason::QueueExhausted);

    let page1 = &report.pages[&format!("{}/page1", base)];
    assert_eq!(page1.title, "Page 1");
    assert_eq!(page1.status_code, Some(200));
}

#[tokio::test]
async fn test_visited_never_exceeds_max_pages() {
    let server = MockServer::start().await;
    let links: String = (0..30)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    mount_html(&server, "/", format!("<html><body>{}</body></html>", links)).await;
    for i in 0..30 {
        mount_html(&server, &format!("/p{}", i), links.clone()).await;
    }

    let coordinator = Coordinator::new(test_config()).unwrap();
    let report = coordinator
        .crawl(CrawlTarget::Seed(format!("{}/", server.uri())), limits(5, 3))
        .await
        .unwrap();

    assert!(report.visited.len() <= 5);
    assert_eq!(report.pages.len(), 5);
    assert!(report.pages.keys().all(|key| report.visited.contains(key)));
    assert_eq!(report.stop_reason, StopReason::PageLimitReached);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">p</a>"#, i))
        .collect();
    let fetcher = Arc::new(InstrumentedFetcher::new(
        format!("<html><body>{}</body></html>", links),
        Duration::from_millis(30),
    ));

    let coordinator =
        Coordinator::with_backends(test_config(), fetcher.clone(), Arc::new(NoRenderer)).unwrap();
    let report = coordinator
        .crawl(
            CrawlTarget::Seed("https://example.com/".to_string()),
            limits(15, 3),
        )
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 15);
    assert_eq!(fetcher.calls(), 15);
    assert!(fetcher.peak() <= 3, "peak in flight was {}", fetcher.peak());
    assert!(fetcher.peak() >= 2, "crawl never overlapped fetches");
}

#[tokio::test]
async fn test_one_timeout_does_not_sink_the_batch() {
    let server = MockServer::start().await;
    for i in 0..4 {
        mount_html(&server, &format!("/ok{}", i), format!("<p>page {}</p>", i)).await;
    }
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>late</p>")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.scraper.request_timeout_ms = 300;
    let coordinator = Coordinator::new(config).unwrap();

    let mut urls: Vec<String> = (0..4).map(|i| format!("{}/ok{}", server.uri(), i)).collect();
    urls.insert(2, format!("{}/slow", server.uri()));

    let report = coordinator
        .crawl(CrawlTarget::Batch(urls), limits(10, 5))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 5);
    assert_eq!(report.successes().count(), 4);

    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].url.ends_with("/slow"));
    assert_eq!(failed[0].error.as_ref().unwrap().kind, ErrorKind::Network);
}

#[tokio::test]
async fn test_batch_with_malformed_entry() {
    let server = MockServer::start().await;
    mount_html(&server, "/a", "<title>A</title><p>alpha</p>").await;
    mount_html(&server, "/c", "<title>C</title><p>gamma</p>").await;

    let coordinator = Coordinator::new(test_config()).unwrap();
    let report = coordinator
        .crawl(
            CrawlTarget::Batch(vec![
                format!("{}/a", server.uri()),
                "http//broken".to_string(),
                format!("{}/c", server.uri()),
            ]),
            limits(10, 2),
        )
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.pages[&format!("{}/a", server.uri())].title, "A");
    assert_eq!(report.pages[&format!("{}/c", server.uri())].title, "C");

    let broken = &report.pages["http//broken"];
    assert_eq!(broken.error.as_ref().unwrap().kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_same_domain_filter() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<a href="/local">local</a>
           <a href="https://example.com/away">away</a>
           <a href="https://sub.example.com/deeper">deeper</a>"#,
    )
    .await;
    mount_html(&server, "/local", "<p>local page</p>").await;

    let coordinator = Coordinator::new(test_config()).unwrap();
    let seed = format!("{}/", server.uri());

    let links = coordinator.list_links(&seed, true).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, format!("{}/local", server.uri()));

    let all = coordinator.list_links(&seed, false).await.unwrap();
    assert_eq!(all.len(), 3);

    let report = coordinator
        .crawl(CrawlTarget::Seed(seed), limits(10, 2))
        .await
        .unwrap();
    assert_eq!(report.pages.len(), 2);
    assert!(report
        .pages
        .keys()
        .all(|key| key.starts_with(&server.uri())));
}

#[tokio::test]
async fn test_page_size_is_enforced() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/big",
        format!("<html><body><p>{}</p></body></html>", "x".repeat(10_000)),
    )
    .await;

    let mut config = test_config();
    config.scraper.max_page_size = 500;
    let coordinator = Coordinator::new(config).unwrap();

    let record = coordinator
        .scrape_one(&format!("{}/big", server.uri()))
        .await
        .unwrap();

    assert!(record.is_success());
    assert!(record.text.len() <= 500);
    assert!(!record.text.is_empty());
}

#[tokio::test]
async fn test_http_error_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(test_config()).unwrap();
    let record = coordinator
        .scrape_one(&format!("{}/gone", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.status_code, Some(404));
    let error = record.error.unwrap();
    assert_eq!(error.kind, ErrorKind::HttpStatus);
    assert_eq!(error.message, "HTTP 404");
}

#[tokio::test]
async fn test_render_backend_untouched_when_disabled() {
    let fetcher = Arc::new(InstrumentedFetcher::new(REACT_SHELL, Duration::ZERO));
    let renderer = Arc::new(CountingRenderer::new());

    let coordinator =
        Coordinator::with_backends(test_config(), fetcher, renderer.clone()).unwrap();
    let record = coordinator.scrape_one("https://example.com/").await.unwrap();

    assert_eq!(renderer.calls(), 0);
    assert!(!record.rendered);
}

#[tokio::test]
async fn test_render_backend_used_for_shells_when_enabled() {
    let fetcher = Arc::new(InstrumentedFetcher::new(REACT_SHELL, Duration::ZERO));
    let renderer = Arc::new(CountingRenderer::new());

    let mut config = test_config();
    config.render.enabled = true;
    config.render.wait_ms = 0;

    let coordinator = Coordinator::with_backends(config, fetcher, renderer.clone()).unwrap();
    let record = coordinator.scrape_one("https://example.com/").await.unwrap();

    assert_eq!(renderer.calls(), 1);
    assert!(record.rendered);
    assert_eq!(record.text, "Rendered content");
}

#[tokio::test]
async fn test_redirect_records_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/new", "<title>New</title>").await;

    let coordinator = Coordinator::with_backends(
        test_config(),
        Arc::new(HttpFetcher::new().unwrap()),
        Arc::new(NoRenderer),
    )
    .unwrap();
    let record = coordinator
        .scrape_one(&format!("{}/old", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.url, format!("{}/old", server.uri()));
    assert_eq!(record.final_url, Some(format!("{}/new", server.uri())));
    assert_eq!(record.title, "New");
}

#[tokio::test]
async fn test_seed_redirect_to_other_host_keeps_crawling() {
    let server = MockServer::start().await;
    let port = server.address().port();
    let moved_to = format!("http://localhost:{}", port);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/home", moved_to).as_str()),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/home", r#"<a href="/a">a</a><a href="/b">b</a>"#).await;
    mount_html(&server, "/a", "<p>a</p>").await;
    mount_html(&server, "/b", "<p>b</p>").await;

    let coordinator = Coordinator::new(test_config()).unwrap();
    let seed = format!("http://127.0.0.1:{}/", port);
    let report = coordinator
        .crawl(CrawlTarget::Seed(seed.clone()), limits(10, 2))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 3, "pages: {:?}", report.pages.keys());
    assert_eq!(
        report.pages[&seed].final_url,
        Some(format!("{}/home", moved_to))
    );
    assert!(report.pages[&format!("{}/a", moved_to)].is_success());
    assert!(report.pages[&format!("{}/b", moved_to)].is_success());
}

#[tokio::test]
async fn test_timed_out_fetch_releases_its_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>late</p>", "text/html")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/fast", "<title>Fast</title>").await;

    let mut config = test_config();
    config.scraper.request_timeout_ms = 300;
    let coordinator = Coordinator::new(config).unwrap();

    let started = std::time::Instant::now();
    let report = coordinator
        .crawl(
            CrawlTarget::Batch(vec![
                format!("{}/slow", server.uri()),
                format!("{}/fast", server.uri()),
            ]),
            limits(10, 1),
        )
        .await
        .unwrap();

    // With one slot, the fast page only runs once the slow one has given up
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "slot held for {:?}",
        started.elapsed()
    );
    let slow = &report.pages[&format!("{}/slow", server.uri())];
    assert_eq!(slow.error.as_ref().unwrap().kind, ErrorKind::Network);
    assert_eq!(report.pages[&format!("{}/fast", server.uri())].title, "Fast");
}
