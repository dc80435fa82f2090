//! arXiv client against a mock API server.

use std::time::Duration;
use syntopical_common::sandbox::CONNECT_TIMEOUT;
use syntopical_ingestion::ArxivClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed(server: &MockServer) -> String {
    let base = server.uri();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <published>2023-01-01T00:00:00Z</published>
    <title>Available Paper</title>
    <summary>Downloads fine.</summary>
    <author><name>Ada</name></author>
    <link title="pdf" href="{base}/pdf/2301.00001v1" rel="related" type="application/pdf"/>
    <category term="cs.IR"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2301.00002v1</id>
    <published>2023-01-02T00:00:00Z</published>
    <title>Withdrawn Paper</title>
    <summary>Gone.</summary>
    <author><name>Bob</name></author>
    <link title="pdf" href="{base}/pdf/2301.00002v1" rel="related" type="application/pdf"/>
  </entry>
</feed>"#
    )
}

async fn mount_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:sparse retrieval"))
        .and(query_param("sortBy", "relevance"))
        .and(query_param("sortOrder", "descending"))
        .and(query_param("max_results", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed(server)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_parses_feed_in_order() {
    let server = MockServer::start().await;
    mount_search(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let client = ArxivClient::new(dir.path()).unwrap().with_base_url(server.uri());
    let papers = client.search("sparse retrieval", 2).await.unwrap();

    let titles: Vec<&str> = papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Available Paper", "Withdrawn Paper"]);
    assert_eq!(papers[0].arxiv_id, "2301.00001v1");
    assert_eq!(papers[0].published, "2023-01-01");
    assert_eq!(papers[0].categories, vec!["cs.IR"]);
}

#[tokio::test]
async fn test_search_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ArxivClient::new(dir.path()).unwrap().with_base_url(server.uri());
    assert!(client.search("anything", 5).await.is_err());
}

#[tokio::test]
async fn test_download_is_idempotent() {
    let server = MockServer::start().await;
    mount_search(&server).await;
    Mock::given(method("GET"))
        .and(path("/pdf/2301.00001v1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.5 fake".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ArxivClient::new(dir.path()).unwrap().with_base_url(server.uri());
    let papers = client.search("sparse retrieval", 2).await.unwrap();

    let first = client.download_paper(&papers[0]).await.unwrap();
    let second = client.download_paper(&papers[0]).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, dir.path().join("2301.00001v1.pdf"));
    assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-1.5 fake");
    // `.expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn test_search_and_download_skips_failures() {
    let server = MockServer::start().await;
    mount_search(&server).await;
    Mock::given(method("GET"))
        .and(path("/pdf/2301.00001v1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.5 ok".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pdf/2301.00002v1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ArxivClient::new(dir.path()).unwrap().with_base_url(server.uri());
    let results = client.search_and_download("sparse retrieval", 2).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.title, "Available Paper");
    assert!(results[0].1.exists());
    // No partial file left behind for the failed download.
    assert!(!dir.path().join("2301.00002v1.pdf").exists());
    assert!(!dir.path().join("2301.00002v1.pdf.part").exists());
}

#[tokio::test]
async fn test_field_query_is_sent_as_written() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "ti:rag AND au:lewis"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed(&server)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ArxivClient::new(dir.path()).unwrap().with_base_url(server.uri());
    let papers = client.search("ti:rag AND au:lewis", 2).await.unwrap();
    assert_eq!(papers.len(), 2);
}

#[tokio::test]
async fn test_slow_download_is_not_cut_off() {
    let server = MockServer::start().await;
    mount_search(&server).await;
    // Slower than any limit the client sets on connecting.
    Mock::given(method("GET"))
        .and(path("/pdf/2301.00001v1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.5 slow".to_vec())
                .set_delay(CONNECT_TIMEOUT + Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ArxivClient::new(dir.path()).unwrap().with_base_url(server.uri());
    let papers = client.search("sparse retrieval", 2).await.unwrap();

    let path = client.download_paper(&papers[0]).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5 slow");
}

#[tokio::test]
async fn test_new_creates_download_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("data").join("arxiv_papers");
    let client = ArxivClient::new(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(client.download_dir(), nested.as_path());
}
