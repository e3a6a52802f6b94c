use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use incubator_common::{all_profiles, DashboardView, RangeField};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::host::HostEvent;

#[derive(Clone)]
pub struct OperatorState {
    pub events: mpsc::Sender<HostEvent>,
    pub view: watch::Receiver<DashboardView>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    profile_id: u8,
}

#[derive(Debug, Deserialize)]
struct RangeInputRequest {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    #[serde(default)]
    confirm: bool,
}

pub fn router(state: OperatorState) -> Router {
    Router::new()
        .route("/api/view", get(handle_get_view))
        .route("/api/profiles", get(handle_get_profiles))
        .route("/api/select", post(handle_select))
        .route("/api/range/{field}/focus", post(handle_range_focus))
        .route("/api/range/{field}/input", post(handle_range_input))
        .route("/api/range/{field}/blur", post(handle_range_blur))
        .route("/api/reset", post(handle_reset))
        .with_state(state)
}

async fn handle_get_view(State(state): State<OperatorState>) -> Json<DashboardView> {
    let view = state.view.borrow().clone();
    Json(view)
}

async fn handle_get_profiles() -> impl IntoResponse {
    Json(all_profiles())
}

async fn handle_select(
    State(state): State<OperatorState>,
    Json(request): Json<SelectRequest>,
) -> axum::response::Response {
    queue(
        &state,
        HostEvent::Select {
            profile_id: request.profile_id,
        },
    )
    .await
}

async fn handle_range_focus(
    State(state): State<OperatorState>,
    Path(field): Path<String>,
) -> axum::response::Response {
    let Some(field) = RangeField::parse(&field) else {
        return unknown_field(&field);
    };
    queue(&state, HostEvent::Focus(field)).await
}

async fn handle_range_input(
    State(state): State<OperatorState>,
    Path(field): Path<String>,
    Json(request): Json<RangeInputRequest>,
) -> axum::response::Response {
    let Some(field) = RangeField::parse(&field) else {
        return unknown_field(&field);
    };
    queue(
        &state,
        HostEvent::Input {
            field,
            value: request.value,
        },
    )
    .await
}

async fn handle_range_blur(
    State(state): State<OperatorState>,
    Path(field): Path<String>,
) -> axum::response::Response {
    let Some(field) = RangeField::parse(&field) else {
        return unknown_field(&field);
    };
    queue(&state, HostEvent::Blur(field)).await
}

async fn handle_reset(
    State(state): State<OperatorState>,
    Json(request): Json<ResetRequest>,
) -> axum::response::Response {
    queue(
        &state,
        HostEvent::Reset {
            confirmed: request.confirm,
        },
    )
    .await
}

async fn queue(state: &OperatorState, event: HostEvent) -> axum::response::Response {
    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Reconciliation loop is not running",
        ),
    }
}

fn unknown_field(field: &str) -> axum::response::Response {
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Unknown range field '{field}'. Use 'tmin' or 'tmax'"),
    )
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
