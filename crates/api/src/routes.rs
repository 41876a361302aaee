use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use dolar_core::domain::news::NewsSnapshot;
use dolar_core::domain::quote::{QuotationSnapshot, QuoteLookup};
use dolar_core::error::QueryError;
use dolar_core::service::DolarService;
use dolar_core::time::art::format_art;

use crate::auth;

const API_VERSION: &str = "1.0.0";
const API_DESCRIPTION: &str = "Argentine dollar quotations API";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DolarService>,
    pub api_key: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/dolar", get(get_quotations))
        .route("/dolar/fresh", get(get_fresh_quotations))
        .route("/dolar/:tipo", get(get_quotation_by_type))
        .route("/noticias", get(get_news))
        .route("/health", get(health))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let api = Router::new().route("/test", get(liveness)).merge(protected);

    Router::new().nest("/api", api).with_state(state)
}

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

/// Every rejection the API produces: HTTP 422 with `{success: false, message, error}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    success: bool,
    message: String,
    error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::UnknownQuoteType(_) => Self::new("Invalid quote type", err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Liveness {
    success: bool,
    message: &'static str,
    timestamp: String,
}

async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        success: true,
        message: "API up and running",
        timestamp: format_art(Utc::now()),
    })
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    description: &'static str,
}

async fn health() -> Json<Envelope<Health>> {
    ok(Health {
        status: "healthy",
        timestamp: format_art(Utc::now()),
        version: API_VERSION,
        description: API_DESCRIPTION,
    })
}

async fn get_quotations(State(state): State<AppState>) -> Json<Envelope<QuotationSnapshot>> {
    ok(state.service.get_quotations().await)
}

async fn get_fresh_quotations(
    State(state): State<AppState>,
) -> Json<Envelope<QuotationSnapshot>> {
    ok(state.service.get_fresh_quotations().await)
}

async fn get_quotation_by_type(
    State(state): State<AppState>,
    Path(tipo): Path<String>,
) -> Result<Json<Envelope<QuoteLookup>>, ApiError> {
    let lookup = state
        .service
        .get_quotations_by_type(&tipo)
        .await
        .inspect_err(|e| tracing::warn!(quote_type = %tipo, error = %e, "rejected quote lookup"))?;
    Ok(ok(lookup))
}

async fn get_news(State(state): State<AppState>) -> Json<Envelope<NewsSnapshot>> {
    ok(state.service.get_news().await)
}
