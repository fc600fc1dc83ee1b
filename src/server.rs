//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/versions`, `/versions/{urn}` | Versions, with `workUrn` metadata |
//! | `GET`  | `/text-parts` | Filtered text parts (`reference` resolves a passage) |
//! | `GET`  | `/text-parts/{urn}` | One text part |
//! | `GET`  | `/text-parts/{urn}/{children,ancestors,descendants,siblings}` | Traversals |
//! | `GET`  | `/passage?reference=` | Passage leaves plus ancestor/sibling/children metadata |
//! | `GET`  | `/tree?urn=&up_to=` | Nested subtree dump |
//! | `GET`  | `/text-alignments`, `/text-alignment-chunks` | Alignments |
//! | `GET`  | `/text-annotations`, `/image-annotations`, `/audio-annotations` | Annotation layers |
//! | `GET`  | `/named-entities`, `/tokens` | Entities and tokens |
//! | `GET`  | `/wa/{urn}/{kind}/...` | Web Annotation collections, pages, annotations |
//!
//! List endpoints take `limit` and `offset`; `limit` defaults to and is
//! capped by `[query].max_limit`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "text part urn:cts:... was not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so that browser readers
//! can query the API directly.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::alignments::{self, AlignmentFilter, ChunkFilter};
use crate::annotations::{self, TokenFilter, UrnFilter};
use crate::config::Config;
use crate::db;
use crate::error::LibraryError;
use crate::library::{self, Relation};
use crate::migrate;
use crate::models::{
    Annotation, AnnotationLayer, NamedEntity, TextAlignment, TextAlignmentChunk, Token,
    TextPartResponse,
};
use crate::passage::{self, PassageResponse};
use crate::store::sqlite::SqliteStore;
use crate::store::TextPartFilter;
use crate::tree::{self, TreeNode};
use crate::web_annotation::{
    self, generator::WebAnnotation, AnnotationCollection, AnnotationPage, AnnotationRequest,
};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }

    fn limit(&self, page: &Pagination) -> i64 {
        self.config.query.effective_limit(page.limit)
    }

    /// Base for absolute URLs: `public_url`, else the request's `Host`,
    /// else the bind address.
    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.config.server.public_url {
            return url.trim_end_matches('/').to_string();
        }
        match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => format!("http://{}", host),
            None => format!("http://{}", self.config.server.bind),
        }
    }
}

/// Starts the HTTP server.
///
/// Connects to the configured database, applies the schema (so a fresh
/// database serves empty results rather than errors), and serves until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let state = AppState::new(config.clone(), SqliteStore::new(pool));
    let app = router(state)?;

    println!("Atlas server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with CORS, request tracing, and the optional
/// `Cache-Control` header.
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_age = state.config.server.cache_max_age_secs;

    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/versions", get(handle_list_versions))
        .route("/versions/{urn}", get(handle_get_version))
        .route("/text-parts", get(handle_list_text_parts))
        .route("/text-parts/{urn}", get(handle_get_text_part))
        .route("/text-parts/{urn}/children", get(handle_children))
        .route("/text-parts/{urn}/ancestors", get(handle_ancestors))
        .route("/text-parts/{urn}/descendants", get(handle_descendants))
        .route("/text-parts/{urn}/siblings", get(handle_siblings))
        .route("/passage", get(handle_passage))
        .route("/tree", get(handle_tree))
        .route("/text-alignments", get(handle_text_alignments))
        .route("/text-alignment-chunks", get(handle_text_alignment_chunks))
        .route("/text-annotations", get(handle_text_annotations))
        .route("/image-annotations", get(handle_image_annotations))
        .route("/audio-annotations", get(handle_audio_annotations))
        .route("/named-entities", get(handle_named_entities))
        .route("/tokens", get(handle_tokens))
        .route("/wa/{urn}/{kind}/collection/{format}", get(handle_wa_collection))
        .route(
            "/wa/{urn}/{kind}/collection/{format}/{page}",
            get(handle_wa_page),
        )
        .route(
            "/wa/{urn}/{kind}/annotation/{idx}/{format}",
            get(handle_wa_annotation),
        )
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(())
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::debug!(
                            status = %response.status(),
                            latency_ms = latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(state);

    if max_age > 0 {
        let value = HeaderValue::from_str(&format!("public, max-age={}", max_age))?;
        // Only successful responses are cacheable.
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            move |response: &Response| response.status().is_success().then(|| value.clone()),
        ));
    }

    Ok(app)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        if err.is_not_found() {
            not_found(err.to_string())
        } else if err.is_caller_error() {
            bad_request(err.to_string())
        } else {
            tracing::error!(error = %err, "request failed");
            internal(err.to_string())
        }
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Pagination {
    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Versions ============

async fn handle_list_versions(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Vec<TextPartResponse>> {
    let versions =
        library::list_versions(state.store.as_ref(), state.limit(&page), page.offset()).await?;
    Ok(Json(versions))
}

async fn handle_get_version(
    State(state): State<AppState>,
    Path(urn): Path<String>,
) -> ApiResult<TextPartResponse> {
    Ok(Json(library::get_version(state.store.as_ref(), &urn).await?))
}

// ============ Text parts ============

#[derive(Debug, Default, Deserialize)]
struct ReferenceQuery {
    reference: Option<String>,
}

async fn handle_list_text_parts(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<TextPartFilter>,
    Query(reference): Query<ReferenceQuery>,
) -> ApiResult<Vec<TextPartResponse>> {
    let parts = library::filter_text_parts(
        state.store.as_ref(),
        &filter,
        reference.reference.as_deref(),
        state.limit(&page),
        page.offset(),
    )
    .await?;
    Ok(Json(parts))
}

async fn handle_get_text_part(
    State(state): State<AppState>,
    Path(urn): Path<String>,
) -> ApiResult<TextPartResponse> {
    let tp = library::require_text_part(state.store.as_ref(), &urn).await?;
    Ok(Json(TextPartResponse::from(&tp)))
}

async fn related(
    state: AppState,
    urn: String,
    relation: Relation,
    page: Pagination,
) -> ApiResult<Vec<TextPartResponse>> {
    let parts = library::related(
        state.store.as_ref(),
        &urn,
        relation,
        state.limit(&page),
        page.offset(),
    )
    .await?;
    Ok(Json(parts))
}

async fn handle_children(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Vec<TextPartResponse>> {
    related(state, urn, Relation::Children, page).await
}

async fn handle_ancestors(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Vec<TextPartResponse>> {
    related(state, urn, Relation::Ancestors, page).await
}

async fn handle_descendants(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Vec<TextPartResponse>> {
    related(state, urn, Relation::Descendants, page).await
}

async fn handle_siblings(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Vec<TextPartResponse>> {
    related(state, urn, Relation::Siblings, page).await
}

// ============ GET /passage, GET /tree ============

async fn handle_passage(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> ApiResult<PassageResponse> {
    let reference = query
        .reference
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| bad_request("reference must not be empty"))?;
    Ok(Json(
        passage::get_passage(state.store.as_ref(), &reference).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct TreeQuery {
    urn: Option<String>,
    up_to: Option<String>,
}

async fn handle_tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Vec<TreeNode>> {
    let urn = query
        .urn
        .ok_or_else(|| bad_request("urn must not be empty"))?;
    let tree = tree::load_tree(state.store.as_ref(), &urn, query.up_to.as_deref()).await?;
    Ok(Json(tree))
}

// ============ Alignments ============

async fn handle_text_alignments(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<AlignmentFilter>,
) -> ApiResult<Vec<TextAlignment>> {
    let found = alignments::list_alignments(
        state.store.pool(),
        &filter,
        state.limit(&page),
        page.offset(),
    )
    .await?;
    Ok(Json(found))
}

async fn handle_text_alignment_chunks(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<ChunkFilter>,
) -> ApiResult<Vec<TextAlignmentChunk>> {
    let found = alignments::list_chunks(
        state.store.pool(),
        state.store.as_ref(),
        &filter,
        state.limit(&page),
        page.offset(),
    )
    .await?;
    Ok(Json(found))
}

// ============ Annotations, entities, tokens ============

async fn annotation_layer(
    state: AppState,
    layer: AnnotationLayer,
    page: Pagination,
    filter: UrnFilter,
) -> ApiResult<Vec<Annotation>> {
    let found = annotations::list_annotations(
        state.store.pool(),
        layer,
        &filter,
        state.limit(&page),
        page.offset(),
    )
    .await?;
    Ok(Json(found))
}

async fn handle_text_annotations(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<UrnFilter>,
) -> ApiResult<Vec<Annotation>> {
    annotation_layer(state, AnnotationLayer::Text, page, filter).await
}

async fn handle_image_annotations(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<UrnFilter>,
) -> ApiResult<Vec<Annotation>> {
    annotation_layer(state, AnnotationLayer::Image, page, filter).await
}

async fn handle_audio_annotations(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<UrnFilter>,
) -> ApiResult<Vec<Annotation>> {
    annotation_layer(state, AnnotationLayer::Audio, page, filter).await
}

async fn handle_named_entities(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<UrnFilter>,
) -> ApiResult<Vec<NamedEntity>> {
    let found = annotations::list_named_entities(
        state.store.pool(),
        &filter,
        state.limit(&page),
        page.offset(),
    )
    .await?;
    Ok(Json(found))
}

async fn handle_tokens(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
    Query(filter): Query<TokenFilter>,
) -> ApiResult<Vec<Token>> {
    let found =
        annotations::list_tokens(state.store.pool(), &filter, state.limit(&page), page.offset())
            .await?;
    Ok(Json(found))
}

// ============ Web Annotation ============

fn page_size(state: &AppState) -> i64 {
    state.config.web_annotation.page_size as i64
}

async fn handle_wa_collection(
    State(state): State<AppState>,
    Path((urn, kind, format)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<AnnotationCollection> {
    let base_url = state.base_url(&headers);
    let request = AnnotationRequest {
        base_url: &base_url,
        urn: &urn,
        kind: &kind,
        format: &format,
    };
    let doc = web_annotation::collection(
        state.store.pool(),
        state.store.as_ref(),
        &request,
        page_size(&state),
    )
    .await?;
    Ok(Json(doc))
}

async fn handle_wa_page(
    State(state): State<AppState>,
    Path((urn, kind, format, page)): Path<(String, String, String, i64)>,
    headers: HeaderMap,
) -> ApiResult<AnnotationPage> {
    let base_url = state.base_url(&headers);
    let request = AnnotationRequest {
        base_url: &base_url,
        urn: &urn,
        kind: &kind,
        format: &format,
    };
    let doc = web_annotation::page(
        state.store.pool(),
        state.store.as_ref(),
        &request,
        page,
        page_size(&state),
    )
    .await?;
    Ok(Json(doc))
}

async fn handle_wa_annotation(
    State(state): State<AppState>,
    Path((urn, kind, idx, format)): Path<(String, String, i64, String)>,
    headers: HeaderMap,
) -> ApiResult<WebAnnotation> {
    let base_url = state.base_url(&headers);
    let request = AnnotationRequest {
        base_url: &base_url,
        urn: &urn,
        kind: &kind,
        format: &format,
    };
    let doc =
        web_annotation::annotation(state.store.pool(), state.store.as_ref(), &request, idx).await?;
    Ok(Json(doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let e = AppError::from(LibraryError::TextPartNotFound("urn:x".into()));
        assert_eq!(e.status, StatusCode::NOT_FOUND);
        assert_eq!(e.code, "not_found");

        let e = AppError::from(LibraryError::invalid_reference("urn:x:1-", "empty end"));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        let e = AppError::from(LibraryError::Database(sqlx::Error::RowNotFound));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code, "internal");
    }

    #[tokio::test]
    async fn test_base_url_precedence() {
        let config: Config = toml::from_str(
            "[db]\npath = \"atlas.sqlite\"\n[server]\nbind = \"127.0.0.1:9000\"\n",
        )
        .unwrap();
        let state = |config: Config| AppState {
            config: Arc::new(config),
            store: Arc::new(SqliteStore::new(
                sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap(),
            )),
        };

        let mut headers = HeaderMap::new();
        assert_eq!(state(config.clone()).base_url(&headers), "http://127.0.0.1:9000");

        headers.insert(header::HOST, HeaderValue::from_static("atlas.local:8080"));
        assert_eq!(state(config.clone()).base_url(&headers), "http://atlas.local:8080");

        let mut public = config;
        public.server.public_url = Some("https://atlas.example.org/".into());
        assert_eq!(state(public).base_url(&headers), "https://atlas.example.org");
    }
}
