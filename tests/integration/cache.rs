//! Content cache persistence across runs

use dogfetch::config::FetcherConfig;
use dogfetch::crawler::build_http_client;
use dogfetch::ContentCache;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cache_at(dir: &TempDir, ttl: Duration) -> ContentCache {
    let client = build_http_client(&FetcherConfig::default()).unwrap();
    ContentCache::new(dir.path().join("cache"), ttl, client)
}

#[tokio::test]
async fn test_entries_survive_a_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all-dog-breeds/pug.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Pug</h1>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/all-dog-breeds/pug.html", server.uri());

    let first = cache_at(&dir, Duration::from_secs(240));
    assert_eq!(first.get_or_fetch(&url).await.unwrap(), b"<h1>Pug</h1>");
    drop(first);

    let second = cache_at(&dir, Duration::from_secs(240));
    assert_eq!(second.lookup(&url).await.unwrap().unwrap(), b"<h1>Pug</h1>");
    assert_eq!(second.get_or_fetch(&url).await.unwrap(), b"<h1>Pug</h1>");

    let stats = second.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_equivalent_urls_share_an_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all-dog-breeds/pug.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pug"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache = cache_at(&dir, Duration::from_secs(240));
    let base = server.uri();

    cache
        .get_or_fetch(&format!("{}/all-dog-breeds/pug.html", base))
        .await
        .unwrap();
    let body = cache
        .get_or_fetch(&format!("{}/all-dog-breeds/./pug.html#history", base))
        .await
        .unwrap();

    assert_eq!(body, b"pug");
}

#[tokio::test]
async fn test_expired_entries_are_purged_on_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stale = cache_at(&dir, Duration::ZERO);
    for slug in ["akita", "beagle", "boxer"] {
        stale
            .get_or_fetch(&format!("{}/all-dog-breeds/{}.html", server.uri(), slug))
            .await
            .unwrap();
    }

    let restarted = cache_at(&dir, Duration::from_secs(240));
    assert_eq!(restarted.purge_expired().await.unwrap(), 3);
    assert_eq!(restarted.purge_expired().await.unwrap(), 0);
}
