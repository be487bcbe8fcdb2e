use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use recommender::models::{LsiConfig, LsiModel};
use recommender::persist::{save_model, save_snapshot, Snapshot, SnapshotPaths};
use recommender::{AnyModel, Dictionary, ModelKind, TfIdf, Tokenizer};
use serde_json::{json, Value};
use server::{build_app, ServerConfig};
use tower::ServiceExt;

const TEXTS: &[&str] = &[
    "взыскать задолженность по договору аренды нежилого помещения",
    "договор аренды помещения расторгнуть задолженность взыскать",
    "налоговая инспекция доначислила налог и пени по декларации",
];

fn build_fixture(dir: &std::path::Path) -> ServerConfig {
    let tokenizer = Tokenizer::new();
    let tokens: Vec<Vec<String>> = TEXTS.iter().map(|t| tokenizer.tokenize(t)).collect();
    let mut dictionary = Dictionary::build(&tokens);
    dictionary.filter_extremes(1, 1.0);
    let bows: Vec<Vec<(u32, u32)>> = tokens.iter().map(|t| dictionary.doc2bow(t)).collect();
    let tfidf = TfIdf::new(&dictionary);
    let corpus_tfidf: Vec<Vec<(u32, f32)>> = bows.iter().map(|b| tfidf.transform(b)).collect();

    let snapshot_dir = dir.join("snapshot");
    let paths = SnapshotPaths::new(&snapshot_dir);
    let doc_ids: Vec<String> = (0..TEXTS.len()).map(|i| format!("case-{i}")).collect();
    let snapshot = Snapshot { doc_ids, dictionary: dictionary.clone(), corpus: bows };
    save_snapshot(&paths, &snapshot, "2026-01-01T00:00:00Z").unwrap();

    let lsi = LsiModel::fit(&corpus_tfidf, dictionary.len(), &LsiConfig::new(2)).unwrap();
    save_model(&paths, &AnyModel::Lsi(lsi)).unwrap();

    ServerConfig {
        snapshot_dir: snapshot_dir.to_string_lossy().into_owned(),
        model: ModelKind::Lsi,
        ratings_path: dir.join("ratings").to_string_lossy().into_owned(),
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(app: Router, uri: &str, body: Value) -> StatusCode {
    let resp = app
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    resp.status()
}

#[tokio::test]
async fn similar_for_document_returns_ranked_neighbors() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(build_fixture(dir.path())).unwrap();

    let (status, json) = get(app, "/similar/case-0?k=2").await;
    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert!(!results.is_empty());
    for hit in results {
        assert_ne!(hit["doc_id"].as_str().unwrap(), "case-0");
    }
}

#[tokio::test]
async fn unknown_document_is_a_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(build_fixture(dir.path())).unwrap();
    let (status, _) = get(app, "/similar/case-999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unrelated_text_yields_an_empty_valid_result() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(build_fixture(dir.path())).unwrap();

    let resp = app
        .oneshot(
            Request::post("/similar")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"text": "completely unrelated english text", "k": 5}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn duplicate_rating_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_fixture(dir.path());
    let app = build_app(config).unwrap();

    let body = json!({"doc_id": "case-0", "recommendation_id": "case-1", "value": 4});
    let status = post_json(app.clone(), "/ratings", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let status = post_json(app.clone(), "/ratings", body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let status =
        post_json(app, "/ratings", json!({"doc_id": "nope", "recommendation_id": "case-1", "value": 1}))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn startup_without_models_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        snapshot_dir: dir.path().join("missing").to_string_lossy().into_owned(),
        model: ModelKind::Lsi,
        ratings_path: dir.path().join("ratings").to_string_lossy().into_owned(),
    };
    assert!(build_app(config).is_err());
}
