use std::time::Duration;

use futures_util::StreamExt;
use incubator_common::{ConnectionManager, LinkEvent, LinkState};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Keeps the device socket alive, reconnecting after a fixed delay, and
/// forwards every state change and text message to the reconciliation loop.
pub fn spawn_link(
    url: String,
    reconnect_delay: Duration,
    events: mpsc::Sender<LinkEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut manager = ConnectionManager::new(reconnect_delay);

        loop {
            if !report(&events, manager.begin_attempt()).await {
                return;
            }

            let delay = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((mut stream, _)) => {
                    info!(%url, attempt = manager.attempts(), "device link open");
                    if !report(&events, manager.on_open()).await {
                        return;
                    }

                    let mut failed = false;
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(Message::Text(text)) => {
                                let event = LinkEvent::Message(text.as_str().to_owned());
                                if events.send(event).await.is_err() {
                                    return;
                                }
                            }
                            Ok(Message::Close(frame)) => {
                                debug!(?frame, "device closed the link");
                                break;
                            }
                            Ok(_) => {}
                            Err(err) => {
                                warn!("device link read error: {err}");
                                failed = true;
                                break;
                            }
                        }
                    }

                    if failed {
                        manager.on_error()
                    } else {
                        info!(%url, "device link closed");
                        manager.on_closed()
                    }
                }
                Err(err) => {
                    warn!(%url, "device link connect failed: {err}");
                    manager.on_error()
                }
            };

            if !report(&events, manager.state()).await {
                return;
            }
            debug!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");
            tokio::time::sleep(delay).await;
        }
    })
}

async fn report(events: &mpsc::Sender<LinkEvent>, state: LinkState) -> bool {
    events.send(LinkEvent::State(state)).await.is_ok()
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::ws::{self, WebSocketUpgrade},
        response::IntoResponse,
        routing::any,
        Router,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    const STATUS: &str = r#"{"type":"status","temp_f":99.4}"#;

    /// Sends one telemetry frame to each client, then closes.
    async fn send_once_then_close(upgrade: WebSocketUpgrade) -> impl IntoResponse {
        upgrade.on_upgrade(|mut socket| async move {
            let _ = socket.send(ws::Message::Text(STATUS.into())).await;
            let _ = socket.send(ws::Message::Close(None)).await;
        })
    }

    #[tokio::test]
    async fn device_close_reports_closed_then_reconnects() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let device = Router::new().route("/", any(send_once_then_close));
        tokio::spawn(async move { axum::serve(listener, device).await });

        let (tx, mut rx) = mpsc::channel(16);
        let task = spawn_link(format!("ws://{addr}/"), Duration::from_millis(50), tx);

        let mut events = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while events.len() < 5 {
                events.push(rx.recv().await.unwrap());
            }
        })
        .await
        .unwrap();
        task.abort();

        assert_eq!(
            events,
            vec![
                LinkEvent::State(LinkState::Connecting),
                LinkEvent::State(LinkState::Open),
                LinkEvent::Message(STATUS.to_string()),
                LinkEvent::State(LinkState::Closed),
                LinkEvent::State(LinkState::Connecting),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_device_cycles_through_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::channel(16);
        let task = spawn_link(format!("ws://{addr}/"), Duration::from_millis(50), tx);

        let mut states = Vec::new();
        while states.len() < 4 {
            if let Some(LinkEvent::State(state)) = rx.recv().await {
                states.push(state);
            }
        }
        task.abort();

        assert_eq!(
            states,
            vec![
                LinkState::Connecting,
                LinkState::Error,
                LinkState::Connecting,
                LinkState::Error,
            ]
        );
    }
}
