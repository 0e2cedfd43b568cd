//! REST endpoints for order intake.
//!
//! One route per input mode. Every route builds an [`Order`], hands it to the
//! gateway and renders the per-item results as JSON.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::error::DeliveryError;
use crate::gateway::OrderGateway;
use crate::order::{
    AttachedFile, DeliveryOutcome, DeliveryResult, ORDER_LABEL, Order, OrderPayload, OrderRow,
};

/// Upper bound for a multipart file order.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OrderGateway>,
}

/// Build the Axum router with the intake routes.
pub fn intake_routes(gateway: Arc<OrderGateway>) -> Router {
    let state = AppState { gateway };

    Router::new()
        .route("/health", get(health))
        .route("/api/orders/table", post(submit_table))
        .route("/api/orders/text", post(submit_text))
        .route(
            "/api/orders/files",
            post(submit_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "order-portal"
    }))
}

// ── Request bodies ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TableOrderRequest {
    #[serde(default)]
    retailer_name: String,
    #[serde(default)]
    rows: Vec<OrderRow>,
}

#[derive(Debug, Deserialize)]
struct TextOrderRequest {
    #[serde(default)]
    retailer_name: String,
    #[serde(default)]
    text: String,
}

// ── Response bodies ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SubmissionResponse {
    retailer_name: String,
    mode: &'static str,
    submitted_at: DateTime<Utc>,
    delivered: usize,
    failed: usize,
    results: Vec<ResultView>,
}

#[derive(Debug, Serialize)]
struct ResultView {
    target_label: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<serde_json::Value>,
}

impl From<DeliveryResult> for ResultView {
    fn from(result: DeliveryResult) -> Self {
        match result.outcome {
            DeliveryOutcome::Success(response) => Self {
                target_label: result.target_label,
                status: "success",
                kind: None,
                reason: None,
                response: Some(response),
            },
            DeliveryOutcome::Failure(error) => Self {
                target_label: result.target_label,
                status: "failure",
                kind: Some(error.kind()),
                reason: Some(error.to_string()),
                response: None,
            },
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn submit_table(
    State(state): State<AppState>,
    body: Result<Json<TableOrderRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => {
            let order = Order::new(req.retailer_name, OrderPayload::Tabular(req.rows));
            submit(&state, order).await
        }
        Err(rejection) => malformed("table", rejection),
    }
}

async fn submit_text(
    State(state): State<AppState>,
    body: Result<Json<TextOrderRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => {
            let order = Order::new(req.retailer_name, OrderPayload::Text(req.text));
            submit(&state, order).await
        }
        Err(rejection) => malformed("text", rejection),
    }
}

/// A body that does not deserialize is reported like any other rejected
/// order: one validation result, 400.
fn malformed(mode: &'static str, rejection: JsonRejection) -> Response {
    let error = DeliveryError::Validation(rejection.body_text());
    warn!(mode, error = %error, "Order rejected");
    respond(
        StatusCode::BAD_REQUEST,
        SubmissionResponse {
            retailer_name: String::new(),
            mode,
            submitted_at: Utc::now(),
            delivered: 0,
            failed: 1,
            results: vec![ResultView::from(DeliveryResult::failure(ORDER_LABEL, error))],
        },
    )
}

/// Multipart form: a `retailer_name` text field plus any number of file
/// fields. Fields without a file name other than `retailer_name` are ignored.
async fn submit_files(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut retailer_name = String::new();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return e.into_response(),
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(String::from) {
            // Browsers send an unnamed part when the picker is left empty.
            Some(file_name) if !file_name.is_empty() => match field.bytes().await {
                Ok(bytes) => files.push(AttachedFile::new(file_name, bytes.to_vec())),
                Err(e) => return e.into_response(),
            },
            Some(_) => {}
            None if field_name == "retailer_name" => match field.text().await {
                Ok(text) => retailer_name = text,
                Err(e) => return e.into_response(),
            },
            None => debug!(field = %field_name, "Ignoring unknown form field"),
        }
    }

    let order = Order::new(retailer_name, OrderPayload::Files(files));
    submit(&state, order).await
}

async fn submit(state: &AppState, order: Order) -> Response {
    let retailer_name = order.retailer().to_string();
    let mode = order.payload.mode();
    let submitted_at = order.submitted_at;

    let results = state.gateway.submit(order).await;

    let rejected = results
        .iter()
        .any(|r| r.error().is_some_and(|e| e.is_validation()));
    let delivered = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - delivered;

    let status = if rejected {
        StatusCode::BAD_REQUEST
    } else if failed == 0 {
        StatusCode::OK
    } else if delivered == 0 {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::MULTI_STATUS
    };

    info!(
        retailer = %retailer_name,
        mode,
        delivered,
        failed,
        status = status.as_u16(),
        "Order submission handled"
    );

    let body = SubmissionResponse {
        retailer_name,
        mode,
        submitted_at,
        delivered,
        failed,
        results: results.into_iter().map(ResultView::from).collect(),
    };
    respond(status, body)
}

fn respond(status: StatusCode, body: SubmissionResponse) -> Response {
    (status, Json(body)).into_response()
}
