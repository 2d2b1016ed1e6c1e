use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::auth::Identity;
use crate::catalog::Outcome;
use crate::config::Config;
use crate::error::SyncError;
use crate::models::{LikedMovie, MediaType, MovieDetails, MovieSummary};
use crate::session::Session;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

type Shared = Arc<Session>;

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match &self {
            SyncError::Permission(_) => StatusCode::FORBIDDEN,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::GenresNotLoaded => StatusCode::CONFLICT,
            SyncError::NotSignedIn | SyncError::Auth(_) => StatusCode::UNAUTHORIZED,
            SyncError::Network(_) => StatusCode::GATEWAY_TIMEOUT,
            SyncError::Upstream { .. } | SyncError::Decode(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
struct CatalogRequest {
    #[serde(rename = "type", default)]
    media: MediaType,
}

#[derive(Deserialize)]
struct GenreRequest {
    #[serde(default)]
    genre: Option<Value>,
    #[serde(rename = "type", default)]
    media: MediaType,
}

#[derive(Deserialize)]
struct SearchInput {
    #[serde(default)]
    term: String,
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

pub async fn run_server(config: Config) -> Result<()> {
    let session = Arc::new(Session::from_config(&config)?);
    if let Err(e) = session.bootstrap(MediaType::All).await {
        warn!("Initial catalog load failed, continuing: {}", e);
    }

    let app = build_router(session);
    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(session: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(snapshot))
        .route("/genres/load", post(load_genres))
        .route("/catalog", post(load_catalog))
        .route("/catalog/genre", post(load_by_genre))
        .route("/search/input", post(search_input))
        .route("/search/close", post(search_close))
        .route("/movies/:id", get(movie_details))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/identity", get(current_identity))
        .route("/liked", post(add_liked))
        .route("/liked/:id", get(is_liked).delete(remove_liked))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

async fn health() -> &'static str {
    "OK"
}

async fn snapshot(State(session): State<Shared>) -> Json<AppState> {
    Json(session.state.snapshot())
}

async fn load_genres(State(session): State<Shared>) -> Result<Json<Value>, SyncError> {
    let genres = session.catalog.load_genres().await?;
    Ok(Json(json!({ "genres": genres })))
}

async fn load_catalog(
    State(session): State<Shared>,
    Json(req): Json<CatalogRequest>,
) -> Result<Json<Value>, SyncError> {
    let outcome = session.catalog.load_catalog(req.media).await?;
    Ok(Json(outcome_body(outcome)))
}

async fn load_by_genre(
    State(session): State<Shared>,
    Json(req): Json<GenreRequest>,
) -> Result<Json<Value>, SyncError> {
    let genre = req.genre.as_ref().and_then(genre_filter);
    let outcome = session.catalog.load_by_genre(genre, req.media).await?;
    Ok(Json(outcome_body(outcome)))
}

async fn search_input(
    State(session): State<Shared>,
    Json(input): Json<SearchInput>,
) -> StatusCode {
    session.search.keystroke(input.term);
    StatusCode::ACCEPTED
}

async fn search_close(State(session): State<Shared>) -> StatusCode {
    session.search.close();
    StatusCode::NO_CONTENT
}

async fn movie_details(
    State(session): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<MovieDetails>, SyncError> {
    Ok(Json(session.catalog.movie_details(id).await?))
}

async fn sign_in(
    State(session): State<Shared>,
    Json(creds): Json<Credentials>,
) -> Result<Json<Identity>, SyncError> {
    Ok(Json(session.sign_in(&creds.email, &creds.password).await?))
}

async fn sign_up(
    State(session): State<Shared>,
    Json(creds): Json<Credentials>,
) -> Result<Json<Identity>, SyncError> {
    Ok(Json(session.sign_up(&creds.email, &creds.password).await?))
}

async fn sign_out(State(session): State<Shared>) -> Result<StatusCode, SyncError> {
    session.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_identity(State(session): State<Shared>) -> Json<Option<Identity>> {
    Json(session.identity.current())
}

async fn add_liked(
    State(session): State<Shared>,
    Json(movie): Json<MovieSummary>,
) -> Result<Json<Vec<LikedMovie>>, SyncError> {
    Ok(Json(session.add_liked(&movie).await?))
}

async fn remove_liked(
    State(session): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<LikedMovie>>, SyncError> {
    Ok(Json(session.remove_liked(id).await?))
}

async fn is_liked(State(session): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    Json(json!({ "liked": session.liked.is_liked(id) }))
}

fn outcome_body(outcome: Outcome) -> Value {
    json!({ "applied": outcome == Outcome::Applied })
}

/// The "All Genres" option sends an empty value; any falsy value means no filter.
fn genre_filter(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (id != 0).then_some(id)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
