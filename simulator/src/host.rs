use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{any, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::{
    net::TcpListener,
    sync::{broadcast, Mutex},
};
use tracing::{debug, info, warn};

use crate::device::{ProfileUpdate, SimulatedDevice};

const BROADCAST_DEPTH: usize = 32;

#[derive(Clone)]
struct AppState {
    device: Arc<Mutex<SimulatedDevice>>,
    broadcasts: broadcast::Sender<String>,
}

#[derive(Debug, Serialize)]
struct OkBody {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<String>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ws_port = env_u16("SIM_WS_PORT", 8081);
    let http_port = env_u16("SIM_HTTP_PORT", 8080);
    let broadcast_ms = std::env::var("SIM_BROADCAST_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1_000)
        .clamp(50, 60_000);
    let wifi_ssid = std::env::var("SIM_WIFI_SSID").unwrap_or_else(|_| "simulated-lan".to_string());

    let (broadcasts, _) = broadcast::channel(BROADCAST_DEPTH);
    let app_state = AppState {
        device: Arc::new(Mutex::new(SimulatedDevice::new(wifi_ssid, "Incubator-AP"))),
        broadcasts,
    };

    spawn_broadcast_loop(app_state.clone(), Duration::from_millis(broadcast_ms));

    let ws_app = Router::new()
        .route("/", any(handle_ws_upgrade))
        .with_state(app_state.clone());
    let http_app = Router::new()
        .route("/api/profile", post(handle_post_profile))
        .route("/api/reset", post(handle_post_reset))
        .with_state(app_state);

    let ws_addr = SocketAddr::from(([0, 0, 0, 0], ws_port));
    let http_addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let ws_listener = TcpListener::bind(ws_addr)
        .await
        .with_context(|| format!("failed to bind simulator websocket at {ws_addr}"))?;
    let http_listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind simulator http server at {http_addr}"))?;

    info!("simulator telemetry on ws://{ws_addr}/ every {broadcast_ms} ms");
    info!("simulator api on http://{http_addr}");

    tokio::try_join!(
        async { axum::serve(ws_listener, ws_app).await },
        async { axum::serve(http_listener, http_app).await },
    )?;
    Ok(())
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn spawn_broadcast_loop(app_state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;

            let (info, status) = {
                let mut device = app_state.device.lock().await;
                let info = device.info_if_changed();
                let status = device.step(Utc::now().timestamp());
                (info, status.to_string())
            };

            // No receivers just means no dashboard is connected yet.
            if let Some(info) = info {
                let _ = app_state.broadcasts.send(info);
            }
            let _ = app_state.broadcasts.send(status);
        }
    });
}

async fn handle_ws_upgrade(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| serve_client(state, socket))
}

async fn serve_client(state: AppState, socket: WebSocket) {
    let mut updates = state.broadcasts.subscribe();
    let info = {
        let mut device = state.device.lock().await;
        device.client_connected();
        device.info().to_string()
    };
    info!("dashboard client connected");

    let (mut sink, mut stream) = socket.split();

    if sink.send(Message::Text(info.into())).await.is_ok() {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "client lagging behind broadcasts");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!("client socket error: {err}");
                        break;
                    }
                },
            }
        }
    }

    state.device.lock().await.client_disconnected();
    info!("dashboard client disconnected");
}

async fn handle_post_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> impl IntoResponse {
    let mut device = state.device.lock().await;
    match device.apply_profile(&update) {
        Ok(()) => {
            info!(profile_id = update.profile_id, "profile applied");
            ok_response()
        }
        Err(err) => {
            warn!(profile_id = update.profile_id, "profile rejected: {err}");
            (
                StatusCode::BAD_REQUEST,
                Json(OkBody {
                    ok: false,
                    err: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn handle_post_reset(State(state): State<AppState>) -> impl IntoResponse {
    let mut device = state.device.lock().await;
    device.reset();
    info!(profile_id = device.profile_id(), "device state reset to default profile");
    ok_response()
}

fn ok_response() -> axum::response::Response {
    (StatusCode::OK, Json(OkBody { ok: true, err: None })).into_response()
}
