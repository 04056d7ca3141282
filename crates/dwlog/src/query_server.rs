use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use dwlog_core::DwLogError;
use dwlog_core::query::{DocumentMode, PAGE_SIZE, PageRequest};
use dwlog_store::Store;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub page: Option<String>,
    pub search: Option<String>,
    pub level: Option<String>,
    pub channel: Option<String>,
    pub decode: Option<bool>,
}

impl IndexQuery {
    /// Unparseable or sub-1 pages read as page 1.
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX)) as u32
    }

    pub fn to_request(&self) -> PageRequest {
        PageRequest {
            page: self.page(),
            limit: PAGE_SIZE,
            search: self.search.clone(),
            level: self.level.clone(),
            channel: self.channel.clone(),
            documents: if self.decode.unwrap_or(false) {
                DocumentMode::Decoded
            } else {
                DocumentMode::Raw
            },
        }
    }
}

pub async fn run_query_http_server(store: Store, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind HTTP query listener")?;
    tracing::info!(%addr, "log browser listening");
    axum::serve(listener, router(store))
        .await
        .context("serve HTTP query API")
}

pub fn router(store: Store) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/dw-logs", get(index))
        .route("/dw-logs/levels", get(levels))
        .route("/dw-logs/channels", get(channels))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(store)
}

async fn index(State(store): State<Store>, Query(query): Query<IndexQuery>) -> Response {
    match store.index_view(&query.to_request()).await {
        Ok(view) => Json(view).into_response(),
        Err(err) => error_response(err),
    }
}

async fn levels(State(store): State<Store>) -> Response {
    match store.distinct_levels().await {
        Ok(levels) => Json(levels).into_response(),
        Err(err) => error_response(err),
    }
}

async fn channels(State(store): State<Store>) -> Response {
    match store.distinct_channels().await {
        Ok(channels) => Json(channels).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: DwLogError) -> Response {
    let status = match err {
        DwLogError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(error = %err, "log query failed");
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
