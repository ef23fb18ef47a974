use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, require_param};
use crate::services::{DEFAULT_SESSION, Invoice};
use crate::state::AppState;

/// Builds the HTTP surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", get(chat))
        .route("/api/rag/ask", get(rag_ask))
        .route("/api/v1/manual/explain", get(explain))
        .route("/api/v1/facturas/extraer", get(extract_invoice))
        .route("/api/v1/ping", get(ping))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Every parameter is optional here, so a missing one gets the same JSON
// error as a blank one instead of the extractor's plain-text rejection.

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    message: Option<String>,
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RagQuery {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    factura: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<String, ApiError> {
    let message = require_param(query.message, "message")?;
    let session = query
        .session
        .as_deref()
        .map(str::trim)
        .filter(|session| !session.is_empty())
        .unwrap_or(DEFAULT_SESSION);
    state.assistant.chat(session, &message).await
}

async fn rag_ask(
    State(state): State<AppState>,
    Query(query): Query<RagQuery>,
) -> Result<String, ApiError> {
    let query = require_param(query.query, "query")?;
    state.rag.ask(&query).await
}

async fn explain(
    State(state): State<AppState>,
    Query(query): Query<ExplainQuery>,
) -> Result<String, ApiError> {
    let topic = require_param(query.topic, "topic")?;
    state.explain.explain(&topic).await
}

async fn extract_invoice(
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Invoice>, ApiError> {
    let raw = require_param(query.factura, "factura")?;
    let invoice = state.invoice.extract(&raw).await?;
    Ok(Json(invoice))
}

async fn ping() -> &'static str {
    "pong"
}
