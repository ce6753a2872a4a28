//! End-to-end crawl tests against a mock catalog

use crate::common::{breed_page, fixture, index_page, test_config, BreedPages, PAGE_PREFIX};
use dogfetch::dataset::{Dataset, ReferenceData};
use dogfetch::{breed_id, BreedRecord, Coordinator, DogfetchError, PageState};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RELATED: [&str; 4] = [
    "miniature-american-shepherd",
    "border-collie",
    "shetland-sheepdog",
    "australian-cattle-dog",
];

async fn mount_index(server: &MockServer, slugs: &[String], expected: u64) {
    Mock::given(method("GET"))
        .and(path("/dog-breeds-a-z/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(slugs)))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_generated_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/all-dog-breeds/[a-z0-9-]+\.html$"))
        .respond_with(BreedPages)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_fixture_page() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/all-dog-breeds/australian-shepherd.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(fixture("australian-shepherd.html").replace("{{REF}}", &uri)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/articles/australian-shepherd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture("reference-article.html")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oembed"))
        .and(query_param("url", "https://www.youtube.com/watch?v=aussie"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "video",
            "title": "Australian Shepherd - Top Facts",
            "provider_name": "YouTube"
        })))
        .expect(1)
        .mount(&server)
        .await;

    for slug in RELATED {
        Mock::given(method("GET"))
            .and(path(format!("{}{}.html", PAGE_PREFIX, slug)))
            .respond_with(ResponseTemplate::new(200).set_body_string(breed_page(slug, &[])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(test_config(&uri, &dir)).unwrap();
    let record = coordinator
        .crawl_page("/all-dog-breeds/australian-shepherd.html")
        .await
        .unwrap();

    assert_eq!(record.id, breed_id("/all-dog-breeds/australian-shepherd.html"));
    assert_eq!(record.name, "Australian Shepherd");
    assert_eq!(record.breed_type, "Purebred");
    assert!(record.other_names.contains(&"Aussie".to_string()));
    assert!(record.other_names.contains(&"Little Blue Dog".to_string()));
    assert_eq!(record.other_names.len(), 2);
    assert_eq!(record.origin, vec!["United States"]);
    assert_eq!(record.size, vec!["Medium", "Large"]);
    assert_eq!(record.lifespan, [12, 15]);
    assert_eq!(record.litter_size, [6, 9]);
    assert_eq!(record.breed_chars.len(), 14);
    assert_eq!(record.breed_chars["Apartment Friendly"], 1);
    assert!(record.history.starts_with("Despite its name"));
    assert_eq!(record.breed_recs.len(), 4);

    let mut colors = record.colors.clone();
    colors.sort();
    colors.dedup();
    assert_eq!(colors.len(), record.colors.len());

    let own_url = format!("{}/all-dog-breeds/australian-shepherd.html", uri);
    assert!(record.refs.contains_key(&own_url));

    let related_urls: Vec<String> = RELATED
        .iter()
        .map(|slug| format!("{}{}{}.html", uri, PAGE_PREFIX, slug))
        .collect();
    let overlap = related_urls
        .iter()
        .filter(|u| record.refs.contains_key(*u))
        .count();
    assert!(overlap * 2 >= related_urls.len());

    match &record.refs["https://www.youtube.com/watch?v=aussie"] {
        ReferenceData::Embed { payload } => {
            assert_eq!(payload["title"], "Australian Shepherd - Top Facts");
        }
        other => panic!("expected embed, got {:?}", other),
    }

    let pdf = "https://www.akc.org/static/australian-shepherd-standard.pdf";
    assert_eq!(record.refs[pdf], ReferenceData::opaque(pdf));

    match &record.refs[&format!("{}/articles/australian-shepherd", uri)] {
        ReferenceData::Page { title, description } => {
            assert_eq!(title, "Australian Shepherd Dog Breed Profile");
            assert_eq!(
                description,
                "Everything you need to know about the Australian Shepherd."
            );
        }
        other => panic!("expected page metadata, got {:?}", other),
    }

    // Gallery only; the article lives on the catalog host and is not scanned
    assert_eq!(record.images.len(), 3);
    assert!(record
        .images
        .iter()
        .all(|i| i.contains("/uploads/dog-pictures/")));
}

#[tokio::test]
async fn test_full_catalog_crawl() {
    let server = MockServer::start().await;
    let uri = server.uri();

    let mut slugs: Vec<String> = (1..=372).map(|i| format!("breed-{:03}", i)).collect();
    slugs.push("yorkshire-terrier".to_string());
    mount_index(&server, &slugs, 1).await;
    mount_generated_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&uri, &dir);
    let snapshot_path = config.output.snapshot_path.clone();
    let coordinator = Coordinator::new(config).unwrap();

    let outcome = coordinator.run().await.unwrap();

    assert!(!outcome.from_snapshot);
    assert_eq!(outcome.dataset.len(), 373);
    assert_eq!(outcome.pages.len(), 373);
    assert_eq!(outcome.failed().count(), 0);

    let yorkie = outcome.dataset.get_by_name("Yorkshire Terrier").unwrap();
    assert_eq!(yorkie.name, "Yorkshire Terrier");
    assert_eq!(yorkie.id, breed_id("/all-dog-breeds/yorkshire-terrier.html"));
    assert_eq!(yorkie.other_names, vec!["Yorkshire Terrier Dog"]);

    assert!(coordinator.gate().peak() <= 8);
    assert_eq!(coordinator.gate().in_flight(), 0);

    let reloaded = Dataset::load_snapshot(&snapshot_path).await.unwrap().unwrap();
    assert_eq!(reloaded, outcome.dataset);
}

#[tokio::test]
async fn test_admission_gate_bounds_in_flight_pages() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path_regex(r"^/all-dog-breeds/[a-z0-9-]+\.html$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(breed_page("Slow Hound", &[]))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&uri, &dir);
    config.crawler.max_concurrent_pages = 4;
    let coordinator = Coordinator::new(config).unwrap();

    let seeds: Vec<url::Url> = (0..30)
        .map(|i| url::Url::parse(&format!("{}/all-dog-breeds/slow-{}.html", uri, i)).unwrap())
        .collect();

    let outcome = coordinator.crawl(seeds).await.unwrap();

    assert_eq!(outcome.stored().count(), 30);
    assert!(coordinator.gate().peak() <= 4);
    assert!(coordinator.gate().peak() > 1);
    assert_eq!(coordinator.gate().in_flight(), 0);
}

/// Breed page whose only outbound reference is `reference`
fn page_with_reference(name: &str, reference: &str) -> String {
    format!(
        r#"<html><body><div class="content">
          <h1>{name}</h1>
          <h3>References</h3>
          <ul><li><a href="{reference}">{name} profile</a></li></ul>
        </div></body></html>"#
    )
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_slot_held_until_enrichment_finishes() {
    let server = MockServer::start().await;
    let uri = server.uri();

    for slug in ["akita", "boxer"] {
        let reference = format!("{}/articles/{}", uri, slug);
        Mock::given(method("GET"))
            .and(path(format!("{}{}.html", PAGE_PREFIX, slug)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_with_reference(slug, &reference)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/articles/{}", slug)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("reference-article.html"))
                    .set_delay(Duration::from_millis(400)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&uri, &dir);
    config.crawler.max_concurrent_pages = 1;
    let coordinator = Coordinator::new(config).unwrap();

    let seeds: Vec<url::Url> = ["akita", "boxer"]
        .iter()
        .map(|slug| url::Url::parse(&format!("{}{}{}.html", uri, PAGE_PREFIX, slug)).unwrap())
        .collect();

    let observe = async {
        // Wait until the first page's reference is pending on the server
        loop {
            if requested_paths(&server)
                .await
                .contains(&"/articles/akita".to_string())
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        let requested = requested_paths(&server).await;
        assert!(!requested.contains(&"/all-dog-breeds/boxer.html".to_string()));
        assert_eq!(coordinator.gate().in_flight(), 1);
    };

    let (outcome, ()) = tokio::join!(coordinator.crawl(seeds), observe);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.stored().count(), 2);

    assert_eq!(
        requested_paths(&server).await,
        vec![
            "/all-dog-breeds/akita.html",
            "/articles/akita",
            "/all-dog-breeds/boxer.html",
            "/articles/boxer",
        ]
    );
    assert_eq!(coordinator.gate().peak(), 1);
}

#[tokio::test]
async fn test_snapshot_skips_crawl() {
    let server = MockServer::start().await;
    mount_index(&server, &[], 0).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &dir);

    let pug = BreedRecord {
        id: breed_id("/all-dog-breeds/pug.html"),
        name: "Pug".to_string(),
        ..Default::default()
    };
    Dataset::from_records(vec![pug])
        .save_snapshot(&config.output.snapshot_path)
        .await
        .unwrap();

    let outcome = Coordinator::new(config).unwrap().run().await.unwrap();

    assert!(outcome.from_snapshot);
    assert_eq!(outcome.dataset.len(), 1);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fresh_run_ignores_snapshot() {
    let server = MockServer::start().await;
    let slugs = vec!["beagle".to_string(), "boxer".to_string()];
    mount_index(&server, &slugs, 1).await;
    mount_generated_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &dir);
    Dataset::from_records(vec![BreedRecord {
        id: "stale".to_string(),
        name: "Stale".to_string(),
        ..Default::default()
    }])
    .save_snapshot(&config.output.snapshot_path)
    .await
    .unwrap();

    let snapshot_path = config.output.snapshot_path.clone();
    let outcome = Coordinator::new(config)
        .unwrap()
        .with_fresh(true)
        .run()
        .await
        .unwrap();

    assert!(!outcome.from_snapshot);
    assert_eq!(outcome.dataset.len(), 2);
    assert!(outcome.dataset.get_by_name("Stale").is_none());

    let rewritten = Dataset::load_snapshot(&snapshot_path).await.unwrap().unwrap();
    assert!(rewritten.get_by_name("Beagle").is_some());
}

#[tokio::test]
async fn test_failed_page_does_not_abort_siblings() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/all-dog-breeds/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_generated_pages(&server).await;

    let slugs = vec![
        "akita".to_string(),
        "broken".to_string(),
        "chow-chow".to_string(),
    ];
    mount_index(&server, &slugs, 1).await;

    let dir = TempDir::new().unwrap();
    let outcome = Coordinator::new(test_config(&uri, &dir))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.dataset.len(), 2);
    assert!(outcome.dataset.get_by_name("Akita").is_some());
    assert!(outcome.dataset.get_by_name("Chow Chow").is_some());

    let failed: Vec<_> = outcome.failed().collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].url.ends_with("/all-dog-breeds/broken.html"));
    assert_eq!(failed[0].state, PageState::Failed);
    assert!(failed[0].error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_fail_fast_stops_crawl() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/all-dog-breeds/broken.html"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_generated_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&uri, &dir);
    config.crawler.fail_fast = true;
    config.crawler.max_concurrent_pages = 1;
    let coordinator = Coordinator::new(config).unwrap();

    let seeds: Vec<url::Url> = ["broken", "akita", "boxer"]
        .iter()
        .map(|slug| url::Url::parse(&format!("{}{}{}.html", uri, PAGE_PREFIX, slug)).unwrap())
        .collect();

    let err = coordinator.crawl(seeds).await.unwrap_err();
    assert!(matches!(err, DogfetchError::HttpStatus { status: 503, .. }));

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(requested, vec!["/all-dog-breeds/broken.html"]);
}

#[tokio::test]
async fn test_index_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dog-breeds-a-z/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), &dir);
    let snapshot_path = config.output.snapshot_path.clone();

    let err = Coordinator::new(config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, DogfetchError::HttpStatus { status: 500, .. }));
    assert!(!snapshot_path.exists());
}
