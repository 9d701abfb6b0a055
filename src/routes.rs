use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::QueryRejection, Query, State},
    http::{header, Method, Request},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analytics::{totals_report, windowed_report};
use crate::classifier::RuleTable;
use crate::clock::Clock;
use crate::errors::{ApiError, ApiResult};
use crate::models::{
    ActivityInput, ActivityRecord, ClassifyInput, ClassifyResponse, ListParams, MessageResponse, NewActivity,
    TotalsReport, WindowedReport,
};
use crate::request_id::{request_id_mw, HEADER_REQUEST_ID};
use crate::store::ActivityStore;

pub const MAX_LIST_LIMIT: usize = 1000;

/// Shared by every handler invocation; the store is the only mutable part.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ActivityStore>,
    pub clock: Arc<dyn Clock>,
    pub rules: &'static RuleTable,
}

impl AppState {
    pub fn new(store: ActivityStore, clock: impl Clock, rules: &'static RuleTable) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(clock),
            rules,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let activity_routes = Router::new()
        .route("/activity", get(list_activities).post(record_activity))
        .layer(cors(&[Method::GET, Method::POST, Method::OPTIONS]));

    let analytics_routes = Router::new()
        .route("/analytics", get(get_analytics))
        .route("/analytics/totals", get(get_totals))
        .layer(cors(&[Method::GET, Method::OPTIONS]));

    let categorize_routes = Router::new()
        .route("/categorize", post(categorize))
        .layer(cors(&[Method::POST, Method::OPTIONS]));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(activity_routes)
        .merge(analytics_routes)
        .merge(categorize_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get(&HEADER_REQUEST_ID)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!("request", method = %req.method(), uri = %req.uri(), request_id)
        }))
        .layer(middleware::from_fn(request_id_mw))
}

/// Answers every OPTIONS request on the wrapped routes with an empty 200
/// advertising `methods`, and stamps `*` as allowed origin on all responses.
fn cors(methods: &[Method]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods.to_vec())
        .allow_headers([header::CONTENT_TYPE])
}

/// Bodies are JSON whatever the declared content type.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    Ok(serde_json::from_slice(body)?)
}

async fn with_store<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ActivityStore) -> ApiResult<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store)).await?
}

async fn root() -> &'static str {
    "Activity Tracker API v0.1.0"
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Append one activity, stamped with the store-local clock
async fn record_activity(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<MessageResponse>> {
    let input: ActivityInput = parse_body(&body)?;
    let activity = NewActivity::try_from(input)?;
    let now = state.clock.now();

    let id = with_store(&state, move |store| store.record(&activity, now)).await?;
    tracing::info!(id, "activity saved");

    Ok(Json(MessageResponse {
        message: "Activity saved successfully".to_string(),
    }))
}

/// Newest first, capped at 1000
async fn list_activities(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ActivityRecord>>> {
    let Query(params) = params.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let limit = params.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);

    let records = with_store(&state, move |store| store.list(limit)).await?;
    Ok(Json(records))
}

async fn get_analytics(State(state): State<AppState>) -> ApiResult<Json<WindowedReport>> {
    let now = state.clock.now();
    let report = with_store(&state, move |store| windowed_report(store, now)).await?;
    Ok(Json(report))
}

async fn get_totals(State(state): State<AppState>) -> ApiResult<Json<TotalsReport>> {
    let now = state.clock.now();
    let report = with_store(&state, move |store| totals_report(store, now)).await?;
    Ok(Json(report))
}

async fn categorize(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ClassifyResponse>> {
    let input: ClassifyInput = parse_body(&body)?;
    let category = state.rules.classify(&input.app, &input.title);
    tracing::debug!(app = %input.app, category, "classified activity");

    Ok(Json(ClassifyResponse {
        category: category.to_string(),
    }))
}
