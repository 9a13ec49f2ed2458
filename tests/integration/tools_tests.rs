//! Tool contracts over real HTTP

use crate::common::{mount_html, test_config};
use flocrawl::crawler::Coordinator;
use flocrawl::search::{DuckDuckGoHtml, DuckDuckGoLite, MetaSearch};
use flocrawl::tools::ToolBox;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LITE_RESULTS: &str = r#"
    <table>
      <tr><td><a class="result-link" href="https://www.rust-lang.org/">Rust</a></td></tr>
      <tr><td class="result-snippet">A language empowering everyone</td></tr>
    </table>
"#;

/// Toolbox whose search chain is a failing HTML backend then a working Lite one
async fn toolbox(server: &MockServer) -> ToolBox {
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lite/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LITE_RESULTS))
        .mount(server)
        .await;

    let client = Client::new();
    let timeout = Duration::from_secs(2);
    let search = MetaSearch::with_backends(vec![
        Box::new(DuckDuckGoHtml::with_endpoint(
            client.clone(),
            &format!("{}/html/", server.uri()),
            timeout,
            "test-agent",
        )),
        Box::new(DuckDuckGoLite::with_endpoint(
            client,
            &format!("{}/lite/", server.uri()),
            timeout,
            "test-agent",
        )),
    ]);

    ToolBox::with_parts(Coordinator::new(test_config()).unwrap(), search)
}

#[tokio::test]
async fn test_search_falls_back_to_second_backend() {
    let server = MockServer::start().await;
    let tools = toolbox(&server).await;

    let output = tools
        .call_tool("search_web_tool", json!({"query": "rust", "max_results": 5}))
        .await
        .unwrap();

    assert_eq!(
        output,
        json!({"results": [{
            "title": "Rust",
            "url": "https://www.rust-lang.org/",
            "snippet": "A language empowering everyone"
        }]})
    );
}

#[tokio::test]
async fn test_scrape_links_tool_crawls_site() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/docs",
        r#"<title>Docs</title><a href="/docs/intro">Intro</a><a href="/docs/missing">Missing</a>"#,
    )
    .await;
    mount_html(&server, "/docs/intro", "<title>Intro</title><p>Start here</p>").await;
    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let tools = toolbox(&server).await;

    let output = tools
        .call_tool(
            "scrape_links_tool",
            json!({"url": format!("{}/docs", server.uri())}),
        )
        .await
        .unwrap();

    let pages = output["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().any(|page| page["title"] == "Intro"));
    assert_eq!(
        output["errors"],
        json!([format!("{}/docs/missing: HTTP 500", server.uri())])
    );
}

#[tokio::test]
async fn test_list_links_tool_reports_fetch_failure() {
    let server = MockServer::start().await;
    let tools = toolbox(&server).await;

    // Nothing is mounted at /nowhere, so wiremock answers 404
    let url = format!("{}/nowhere", server.uri());
    let output = tools
        .call_tool("list_links_tool", json!({ "url": url }))
        .await
        .unwrap();

    assert_eq!(output["url"], url);
    assert_eq!(output["links"], json!([]));
    assert_eq!(output["error"], "HTTP 404");
}

#[tokio::test]
async fn test_scrape_urls_tool() {
    let server = MockServer::start().await;
    mount_html(&server, "/one", "<title>One</title><p>1</p>").await;
    mount_html(&server, "/two", "<title>Two</title><p>2</p>").await;
    let tools = toolbox(&server).await;

    let output = tools
        .call_tool(
            "scrape_urls_tool",
            json!({"urls": [
                format!("{}/two", server.uri()),
                format!("{}/one", server.uri()),
                format!("{}/two#again", server.uri())
            ]}),
        )
        .await
        .unwrap();

    let titles: Vec<&str> = output["pages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|page| page["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Two", "One"]);
    assert_eq!(output["errors"], json!([]));
}
