//! Reference enrichment against mock reference hosts

use crate::common::{fixture, test_config};
use dogfetch::config::EnricherConfig;
use dogfetch::crawler::{build_http_client, Enricher};
use dogfetch::{BreedRecord, ContentCache, ReferenceData};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Enricher with no primary sources besides the configured ones, so pages on
/// the mock server count as secondary and get their photos scanned
fn enricher(server: &MockServer, dir: &TempDir) -> (Enricher, EnricherConfig) {
    let config = test_config(&server.uri(), dir);
    let client = build_http_client(&config.fetcher).unwrap();
    let cache = Arc::new(ContentCache::new(
        dir.path().join("cache"),
        Duration::from_secs(240),
        client,
    ));
    let enricher = Enricher::new(cache, config.enricher.clone(), None);
    (enricher, config.enricher)
}

#[tokio::test]
async fn test_video_reference_uses_oembed() {
    let server = MockServer::start().await;
    let video = "https://www.youtube.com/watch?v=yorkie";

    Mock::given(method("GET"))
        .and(path("/oembed"))
        .and(query_param("url", video))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "video",
            "title": "Yorkshire Terrier Facts",
            "author_name": "Dog Channel"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (enricher, _) = enricher(&server, &dir);

    let (record, summary) = enricher
        .enrich(BreedRecord::default(), &[Url::parse(video).unwrap()])
        .await;

    assert_eq!(summary.embeds, 1);
    match &record.refs[video] {
        ReferenceData::Embed { payload } => {
            assert_eq!(payload["title"], "Yorkshire Terrier Facts");
            assert_eq!(payload["author_name"], "Dog Channel");
        }
        other => panic!("expected embed, got {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_document_reference_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (enricher, _) = enricher(&server, &dir);
    let pdf = format!("{}/standards/yorkshire-terrier.pdf", server.uri());

    let (record, summary) = enricher
        .enrich(BreedRecord::default(), &[Url::parse(&pdf).unwrap()])
        .await;

    assert_eq!(summary.opaque, 1);
    assert_eq!(record.refs[&pdf], ReferenceData::opaque(pdf.as_str()));
}

#[tokio::test]
async fn test_secondary_page_metadata_and_photos() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/australian-shepherd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture("reference-article.html")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (enricher, config) = enricher(&server, &dir);
    assert_eq!(config.image_exclude, vec!["Danish"]);

    let gallery = "https://www.dogbreedslist.info/uploads/dog-pictures/australian-shepherd-1.jpg";
    let mut record = BreedRecord::default();
    record.images.push(gallery.to_string());

    let article = format!("{}/articles/australian-shepherd", server.uri());
    let (record, summary) = enricher
        .enrich(record, &[Url::parse(&article).unwrap()])
        .await;

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.images_added, 2);
    assert_eq!(
        record.refs[&article],
        ReferenceData::Page {
            title: "Australian Shepherd Dog Breed Profile".to_string(),
            description: "Everything you need to know about the Australian Shepherd.".to_string(),
        }
    );

    assert_eq!(
        record.images,
        vec![
            gallery.to_string(),
            "https://cdn.breedprofiles.test/photos/aussie-running.jpg".to_string(),
            format!("{}/img/breeds/australian-shepherd-puppy.jpg", server.uri()),
        ]
    );
    assert!(!record.images.iter().any(|i| i.contains("Danish")));
    assert!(!record.images.iter().any(|i| i.ends_with(".png")));
}

#[tokio::test]
async fn test_primary_source_page_is_not_scanned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/australian-shepherd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture("reference-article.html")))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &dir);
    let cache = Arc::new(ContentCache::from_config(
        &config.cache,
        build_http_client(&config.fetcher).unwrap(),
    ));
    let enricher = Enricher::new(cache, config.enricher, Some("127.0.0.1"));

    let article = format!("{}/articles/australian-shepherd", server.uri());
    let (record, summary) = enricher
        .enrich(BreedRecord::default(), &[Url::parse(&article).unwrap()])
        .await;

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.images_added, 0);
    assert!(record.images.is_empty());
}

#[tokio::test]
async fn test_unreachable_reference_degrades_to_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oembed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (enricher, _) = enricher(&server, &dir);

    let gone = format!("{}/gone", server.uri());
    let video = "https://www.youtube.com/watch?v=broken";
    let references = vec![Url::parse(&gone).unwrap(), Url::parse(video).unwrap()];

    let record = BreedRecord {
        name: "Pug".to_string(),
        ..Default::default()
    };
    let (record, summary) = enricher.enrich(record, &references).await;

    assert_eq!(record.name, "Pug");
    assert_eq!(summary.opaque, 2);
    assert_eq!(record.refs.len(), 2);
    assert!(record.refs.values().all(ReferenceData::is_opaque));
}
