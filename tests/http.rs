use std::sync::Arc;

use bytes::Bytes;
use serde_json::{json, Value};
use warp::filters::BoxedFilter;
use warp::http::{Response, StatusCode};
use warp::{Filter, Reply};

use kajian_backend::db::memory::MemoryDb;
use kajian_backend::environment::{Config, Environment, Prober, VecStore};
use kajian_backend::routes;
use kajian_backend::service::RecordingService;
use kajian_backend::store::mock::MockStore;
use kajian_backend::urls::Urls;

const ADMIN_TOKEN: &str = "test-admin-token";
const BOUNDARY: &str = "thisisaboundary1234";

/// Seconds the stub prober reports for every file: 1:15:03.
const PROBED_SECONDS: f64 = 4503.0;

fn make_environment() -> (Environment<()>, Arc<MockStore>) {
    let logger = Arc::new(log::discard_logger());
    let store = Arc::new(MockStore::new("https://blobs.example.com/"));
    let store_dyn: Arc<VecStore<()>> = store.clone();

    let service = Arc::new(RecordingService::new(
        logger.clone(),
        Arc::new(MemoryDb::new()),
        store_dyn.clone(),
    ));

    let urls = Arc::new(Urls::new("https://www.example.com/", "recordings"));
    let prober: Arc<Prober> = Arc::new(|_: &[u8]| Ok(PROBED_SECONDS));
    let config = Config::new(ADMIN_TOKEN.to_owned());

    let environment = Environment::new(logger, service, store_dyn, urls, prober, config);

    (environment, store)
}

fn make_filter(environment: &Environment<()>) -> BoxedFilter<(Box<dyn Reply>,)> {
    let logger = environment.logger.clone();

    // `current` and `upload` come before the id-parameterized routes
    // so their literal segments are not consumed as ids
    routes::make_current_route(environment.clone())
        .or(routes::make_upload_route(environment.clone()))
        .or(routes::make_list_route(environment.clone()))
        .or(routes::make_publish_route(environment.clone()))
        .or(routes::make_retrieve_route(environment.clone()))
        .or(routes::make_update_route(environment.clone()))
        .or(routes::make_delete_route(environment.clone()))
        .recover(move |r| routes::format_rejection(logger.clone(), r))
        .map(|reply| Box::new(reply) as Box<dyn Reply>)
        .boxed()
}

fn publish_body(title: &str, class_tag: &str, topic_tag: &str, file_name: &str) -> Value {
    json!({
        "title": title,
        "speaker": "Pak Asa",
        "date": "2024-01-10",
        "class_tag": class_tag,
        "topic_tag": topic_tag,
        "file_url": format!("https://blobs.example.com/{}", file_name),
        "file_name": file_name,
        "file_size": 1024,
        "duration": "75:03",
    })
}

async fn send_json(
    filter: &BoxedFilter<(Box<dyn Reply>,)>,
    method: &str,
    path: &str,
    body: &Value,
    token: Option<&str>,
) -> Response<Bytes> {
    let mut request = warp::test::request().path(path).method(method).json(body);

    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }

    request.reply(filter).await
}

async fn get(filter: &BoxedFilter<(Box<dyn Reply>,)>, path: &str) -> Response<Bytes> {
    warp::test::request()
        .path(path)
        .method("GET")
        .reply(filter)
        .await
}

fn parse_body(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("parse response body as JSON")
}

fn multipart_body(metadata: &Value, file_name: &str, content_type: &str, audio: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();

    body.extend_from_slice(
        format!(
            "--{}\r\ncontent-disposition: form-data; name=\"metadata\"\r\ncontent-type: application/json\r\n\r\n{}\r\n",
            BOUNDARY, metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{}\r\ncontent-disposition: form-data; name=\"audio\"; filename=\"{}\"\r\ncontent-type: {}\r\n\r\n",
            BOUNDARY, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    body
}

async fn send_multipart(
    filter: &BoxedFilter<(Box<dyn Reply>,)>,
    body: Vec<u8>,
    token: Option<&str>,
) -> Response<Bytes> {
    let mut request = warp::test::request()
        .path("/recordings/upload")
        .method("POST")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body);

    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }

    request.reply(filter).await
}

#[tokio::test]
async fn publishing_works() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let response = send_json(
        &filter,
        "POST",
        "/recordings",
        &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
        Some(ADMIN_TOKEN),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let first = parse_body(&response);
    assert_eq!(first["is_active"], json!(true));
    assert_eq!(first["play_count"], json!(0));
    // the legacy-form duration is normalized at the boundary
    assert_eq!(first["duration"], json!("1:15:03"));

    let location = response
        .headers()
        .get("location")
        .expect("get location header")
        .to_str()
        .unwrap();
    assert!(location.starts_with("https://www.example.com/recordings/"));
    assert!(location.ends_with(first["id"].as_str().unwrap()));

    let listed = parse_body(&get(&filter, "/recordings").await);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = send_json(
        &filter,
        "POST",
        "/recordings",
        &publish_body("Tafsir 2", "cepatan", "quran", "tafsir-2.mp3"),
        Some(ADMIN_TOKEN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second = parse_body(&response);

    // the first recording has been archived
    let listed = parse_body(&get(&filter, "/recordings").await);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);

    let archived = listed
        .iter()
        .find(|recording| recording["id"] == first["id"])
        .unwrap();
    assert_eq!(archived["is_active"], json!(false));

    let active = parse_body(&get(&filter, "/recordings?active=true").await);
    let active = active.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], second["id"]);
}

#[tokio::test]
async fn publishing_requires_admin() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let body = publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3");

    for token in vec![None, Some("wrong-token")] {
        let response = send_json(&filter, "POST", "/recordings", &body, token).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let listed = parse_body(&get(&filter, "/recordings").await);
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn publishing_rejects_incomplete_metadata() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let response = send_json(
        &filter,
        "POST",
        "/recordings",
        &publish_body("  ", "cepatan", "quran", "tafsir-1.mp3"),
        Some(ADMIN_TOKEN),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = parse_body(&response);
    assert!(body["message"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn retrieving_works() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let response = get(
        &filter,
        &format!("/recordings/{}", uuid::Uuid::new_v4()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&filter, "/recordings/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let published = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );

    let response = get(
        &filter,
        &format!("/recordings/{}", published["id"].as_str().unwrap()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(&response)["title"], json!("Tafsir 1"));
}

#[tokio::test]
async fn play_counts_accumulate() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let published = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );
    let path = format!("/recordings/{}", published["id"].as_str().unwrap());

    // reporting a play needs no admin session
    for expected in 1..=3 {
        let response = send_json(
            &filter,
            "PUT",
            &path,
            &json!({ "increment_play_count": true }),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(parse_body(&response)["play_count"], json!(expected));
    }
}

#[tokio::test]
async fn restoring_swaps_activation() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let first = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );
    let second = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 2", "cepatan", "quran", "tafsir-2.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );

    let path = format!("/recordings/{}", first["id"].as_str().unwrap());

    let response = send_json(&filter, "PUT", &path, &json!({ "restore": true }), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_json(
        &filter,
        "PUT",
        &path,
        &json!({ "restore": true }),
        Some(ADMIN_TOKEN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(&response)["is_active"], json!(true));

    let active = parse_body(&get(&filter, "/recordings?active=true").await);
    let active = active.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], first["id"]);

    let response = get(
        &filter,
        &format!("/recordings/{}", second["id"].as_str().unwrap()),
    )
    .await;
    assert_eq!(parse_body(&response)["is_active"], json!(false));
}

#[tokio::test]
async fn patching_metadata_works() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let published = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );
    let path = format!("/recordings/{}", published["id"].as_str().unwrap());

    let response = send_json(
        &filter,
        "PUT",
        &path,
        &json!({ "title": "Tafsir Al-Baqarah" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_json(
        &filter,
        "PUT",
        &path,
        &json!({ "title": "Tafsir Al-Baqarah", "speaker": "Pak Yakub" }),
        Some(ADMIN_TOKEN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated = parse_body(&response);
    assert_eq!(updated["title"], json!("Tafsir Al-Baqarah"));
    assert_eq!(updated["speaker"], json!("Pak Yakub"));
    assert_eq!(updated["date"], published["date"]);
}

#[tokio::test]
async fn deleting_works() {
    let (environment, store) = make_environment();
    let filter = make_filter(&environment);

    let published = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );
    let path = format!("/recordings/{}", published["id"].as_str().unwrap());

    let response = send_json(&filter, "DELETE", &path, &json!({}), Some(ADMIN_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(&response)["success"], json!(true));

    let response = get(&filter, &path).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listed = parse_body(&get(&filter, "/recordings").await);
    assert!(listed.as_array().unwrap().is_empty());

    // the blob deletion was issued for the stored reference
    assert_eq!(store.deleted(), vec!["tafsir-1.mp3".to_owned()]);

    // deleting again is a no-op success
    let response = send_json(&filter, "DELETE", &path, &json!({}), Some(ADMIN_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(&response)["success"], json!(true));
}

#[tokio::test]
async fn uploading_works() {
    let (environment, store) = make_environment();
    let filter = make_filter(&environment);

    let metadata = json!({
        "title": "Kajian Pagi",
        "speaker": "Pak Hilal",
        "date": "2024-02-01",
        "class_tag": "lambatan",
        "topic_tag": "hadits",
        "description": "Pembahasan hadits pilihan",
    });
    let audio = b"not really mp3 bytes".to_vec();

    let response = send_multipart(
        &filter,
        multipart_body(&metadata, "kajian pagi.mp3", "audio/mpeg", &audio),
        Some(ADMIN_TOKEN),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let recording = parse_body(&response);
    assert_eq!(recording["is_active"], json!(true));
    assert_eq!(recording["play_count"], json!(0));
    assert_eq!(recording["duration"], json!("1:15:03"));
    assert_eq!(recording["file_size"], json!(audio.len()));

    let key = recording["file_name"].as_str().unwrap().to_owned();
    assert!(key.ends_with("-kajian-pagi.mp3"));

    let url = recording["url"].as_str().unwrap();
    assert_eq!(url, format!("https://blobs.example.com/{}", key));

    // the audio bytes made it into the store
    assert_eq!(store.map.read().unwrap().get(&key), Some(&audio));

    // deleting the recording also removes the blob
    let path = format!("/recordings/{}", recording["id"].as_str().unwrap());
    let response = send_json(&filter, "DELETE", &path, &json!({}), Some(ADMIN_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(store.deleted(), vec![key.clone()]);
    assert!(store.map.read().unwrap().is_empty());
}

#[tokio::test]
async fn uploading_rejects_non_audio_files() {
    let (environment, store) = make_environment();
    let filter = make_filter(&environment);

    let metadata = json!({
        "title": "Kajian Pagi",
        "speaker": "Pak Hilal",
        "date": "2024-02-01",
        "class_tag": "lambatan",
        "topic_tag": "hadits",
    });

    let response = send_multipart(
        &filter,
        multipart_body(&metadata, "notes.txt", "text/plain", b"some notes"),
        Some(ADMIN_TOKEN),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(store.map.read().unwrap().is_empty());
}

#[tokio::test]
async fn current_prefers_active_and_falls_back_within_filter() {
    let (environment, _) = make_environment();
    let filter = make_filter(&environment);

    let quran = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Tafsir 1", "cepatan", "quran", "tafsir-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );
    let hadits = parse_body(
        &send_json(
            &filter,
            "POST",
            "/recordings",
            &publish_body("Hadits 1", "lambatan", "hadits", "hadits-1.mp3"),
            Some(ADMIN_TOKEN),
        )
        .await,
    );

    let response = get(&filter, "/recordings/current").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(&response)["id"], hadits["id"]);

    // the active recording is filtered out, so the newest match wins
    let response = get(&filter, "/recordings/current?class_tag=cepatan&topic_tag=quran").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(&response)["id"], quran["id"]);

    let response = get(&filter, "/recordings/current?class_tag=cepatan&topic_tag=hadits").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&filter, "/recordings/current?class_tag=sedang").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
