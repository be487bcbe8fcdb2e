use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use recommender::persist::{load_model, load_snapshot, SnapshotPaths};
use recommender::recommend::Recommendation;
use recommender::{ModelKind, RatingStore, Recommender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct ServerConfig {
    pub snapshot_dir: String,
    pub model: ModelKind,
    pub ratings_path: String,
}

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub ratings: Arc<RatingStore>,
}

#[derive(Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    10
}

#[derive(Deserialize)]
pub struct SimilarTextRequest {
    pub text: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub doc_id: String,
    pub recommendation_id: String,
    pub value: i32,
}

#[derive(Serialize)]
pub struct SimilarResponse {
    pub took_s: f64,
    pub results: Vec<SimilarHit>,
}

#[derive(Serialize)]
pub struct SimilarHit {
    pub doc_id: String,
    pub score: f32,
}

/// Loads the snapshot, the selected model and the rating store, then wires up
/// the router. Any load failure is fatal: starting without a fully
/// initialized model set would serve wrong answers silently.
pub fn build_app(config: ServerConfig) -> Result<Router> {
    let paths = SnapshotPaths::new(&config.snapshot_dir);
    let snapshot = load_snapshot(&paths)?;
    let model = load_model(&paths, config.model)?;
    let recommender = Recommender::new(snapshot.dictionary, snapshot.doc_ids, model)?;
    let ratings = RatingStore::open(&config.ratings_path)?;
    tracing::info!(
        num_docs = recommender.num_docs(),
        model = recommender.model_kind().as_str(),
        "recommender loaded"
    );

    let state = AppState { recommender: Arc::new(recommender), ratings: Arc::new(ratings) };
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/similar/:doc_id", get(similar_for_document))
        .route("/similar", post(similar_for_text))
        .route("/ratings", post(record_rating))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

pub async fn similar_for_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<SimilarResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    if state.recommender.position_of(&doc_id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("unknown document {doc_id}")));
    }
    let results = state
        .recommender
        .similar_for_document(&doc_id, clamp_k(params.k))
        .map_err(internal)?;
    Ok(Json(respond(start, results)))
}

pub async fn similar_for_text(
    State(state): State<AppState>,
    Json(req): Json<SimilarTextRequest>,
) -> Result<Json<SimilarResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    // Text with no corpus vocabulary legitimately yields an empty list.
    let results = state
        .recommender
        .similar_for_text(&req.text, clamp_k(req.k))
        .map_err(internal)?;
    Ok(Json(respond(start, results)))
}

pub async fn record_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RateRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let doc = state
        .recommender
        .position_of(&req.doc_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown document {}", req.doc_id)))?;
    let rec = state.recommender.position_of(&req.recommendation_id).ok_or_else(|| {
        (StatusCode::NOT_FOUND, format!("unknown document {}", req.recommendation_id))
    })?;
    let reporter = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let inserted = state.ratings.record(doc, rec, req.value, &reporter).map_err(internal)?;
    if inserted {
        Ok(StatusCode::CREATED)
    } else {
        Err((StatusCode::CONFLICT, "pair already rated".to_string()))
    }
}

fn respond(start: std::time::Instant, results: Vec<Recommendation>) -> SimilarResponse {
    SimilarResponse {
        took_s: start.elapsed().as_secs_f64(),
        results: results
            .into_iter()
            .map(|r| SimilarHit { doc_id: r.doc_id, score: r.score })
            .collect(),
    }
}

fn clamp_k(k: usize) -> usize {
    k.clamp(1, 100)
}

fn internal(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
