use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use incubator_common::{
    render, DashboardAction, DashboardConfig, DashboardView, FrameScheduler, LinkEvent,
    LinkState, MessageOutcome, RangeField, SaveOrigin, SaveOutcome, Session, ViewSink,
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tracing::{debug, error, info, warn};

use crate::{
    device_api::DeviceApi,
    frames::{Frame, TokioFrameScheduler},
    link,
    operator::{self, OperatorState},
};

const EVENT_QUEUE_DEPTH: usize = 64;

/// Operator input and the settlement of work the loop handed off.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Select { profile_id: u8 },
    Focus(RangeField),
    Input { field: RangeField, value: String },
    Blur(RangeField),
    Reset { confirmed: bool },
    SaveSettled { origin: SaveOrigin, outcome: SaveOutcome },
    ToastExpired,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = config_path();
    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|err| {
        warn!("failed to load dashboard config from {}: {err:#}", config_path.display());
        DashboardConfig::default()
    });
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.sanitize();

    let api = DeviceApi::new(config.device.http_base(), config.request_timeout())?;

    let (link_tx, link_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

    let frames = TokioFrameScheduler::new(config.frame_interval(), frame_tx);
    let session = Session::new(&config, frames);
    let (view_tx, view_rx) = watch::channel(render(&session, now()));

    let reconciler = Reconciler::new(
        session,
        api,
        WatchSink(view_tx),
        event_tx.clone(),
        config.toast_duration(),
    );
    tokio::spawn(reconciler.run(link_rx, frame_rx, event_rx));

    info!(url = %config.device.ws_url(), "connecting to device");
    link::spawn_link(config.device.ws_url(), config.reconnect_delay(), link_tx);

    let app = operator::router(OperatorState {
        events: event_tx,
        view: view_rx,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.operator_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard server at {addr}"))?;

    info!("dashboard listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn config_path() -> PathBuf {
    std::env::var("DASHBOARD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.dashboard"))
        .join("config.json")
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Publishes every rendered view to the operator surface.
pub struct WatchSink(watch::Sender<DashboardView>);

impl ViewSink for WatchSink {
    fn render(&mut self, view: &DashboardView) {
        self.0.send_replace(view.clone());
    }
}

/// Owns the session and applies one event at a time to it.
struct Reconciler<S: FrameScheduler, V: ViewSink> {
    session: Session<S>,
    api: DeviceApi,
    sink: V,
    events: mpsc::Sender<HostEvent>,
    toast_duration: Duration,
}

impl<S, V> Reconciler<S, V>
where
    S: FrameScheduler + Send + 'static,
    V: ViewSink + Send + 'static,
{
    fn new(
        session: Session<S>,
        api: DeviceApi,
        sink: V,
        events: mpsc::Sender<HostEvent>,
        toast_duration: Duration,
    ) -> Self {
        Self {
            session,
            api,
            sink,
            events,
            toast_duration,
        }
    }

    async fn run(
        mut self,
        mut link_rx: mpsc::Receiver<LinkEvent>,
        mut frame_rx: mpsc::UnboundedReceiver<Frame>,
        mut event_rx: mpsc::Receiver<HostEvent>,
    ) {
        self.session.start();
        self.render();

        loop {
            let changed = tokio::select! {
                Some(event) = link_rx.recv() => self.on_link_event(event),
                Some(frame) = frame_rx.recv() => self.session.on_frame(frame.id, frame.at),
                Some(event) = event_rx.recv() => self.on_host_event(event),
                else => break,
            };
            if changed {
                self.render();
            }
        }
        info!("reconciliation loop stopped");
    }

    fn render(&mut self) {
        let view = render(&self.session, now());
        debug!(
            link = view.link,
            remaining = %view.timer_remaining,
            accepted = self.session.accepted_messages(),
            dropped = self.session.dropped_messages(),
            "rendered dashboard view"
        );
        self.sink.render(&view);
    }

    fn on_link_event(&mut self, event: LinkEvent) -> bool {
        if let LinkEvent::State(state) = &event {
            match state {
                LinkState::Open => info!("device link connected"),
                LinkState::Closed | LinkState::Error => {
                    warn!(state = state.as_str(), "device link down")
                }
                LinkState::Connecting => debug!("device link connecting"),
            }
        }

        match self.session.on_link_event(event) {
            Ok(MessageOutcome::Accepted) => true,
            // State changes also land here.
            Ok(MessageOutcome::Ignored) => true,
            Err(err) => {
                error!("dropping malformed device message: {err}");
                false
            }
        }
    }

    fn on_host_event(&mut self, event: HostEvent) -> bool {
        match event {
            HostEvent::Select { profile_id } => {
                let actions = self.session.select_profile(profile_id);
                if actions.is_empty() {
                    warn!(profile_id, "ignoring selection of unknown profile");
                }
                self.dispatch(actions);
            }
            HostEvent::Focus(field) => {
                if !self.session.focus_range(field) {
                    debug!(field = field.as_str(), "range input hidden; focus ignored");
                    return false;
                }
            }
            HostEvent::Input { field, value } => {
                if !self.session.input_range(field, &value) {
                    return false;
                }
            }
            HostEvent::Blur(field) => {
                let actions = self.session.blur_range(field);
                self.dispatch(actions);
            }
            HostEvent::Reset { confirmed } => {
                let actions = self.session.request_reset(confirmed);
                if actions.is_empty() {
                    info!("device reset not confirmed");
                }
                self.dispatch(actions);
                return false;
            }
            HostEvent::SaveSettled { origin, outcome } => {
                self.session.on_save_settled(origin, outcome, now());
                if outcome == SaveOutcome::Saved {
                    self.schedule_toast_expiry();
                }
            }
            HostEvent::ToastExpired => {}
        }
        true
    }

    fn dispatch(&self, actions: Vec<DashboardAction>) {
        for action in actions {
            let api = self.api.clone();
            let events = self.events.clone();
            match action {
                DashboardAction::SaveProfile { origin, request } => {
                    tokio::spawn(async move {
                        let outcome = match api.save_profile(&request).await {
                            Ok(()) => {
                                info!(profile_id = request.profile_id, "profile saved");
                                SaveOutcome::Saved
                            }
                            Err(err) => {
                                warn!(profile_id = request.profile_id, "profile save failed: {err:#}");
                                SaveOutcome::Failed
                            }
                        };
                        let _ = events.send(HostEvent::SaveSettled { origin, outcome }).await;
                    });
                }
                DashboardAction::RebootDevice => {
                    tokio::spawn(async move {
                        match api.reset().await {
                            Ok(()) => info!("device reset requested"),
                            Err(err) => warn!("device reset failed: {err:#}"),
                        }
                    });
                }
            }
        }
    }

    fn schedule_toast_expiry(&self) {
        let events = self.events.clone();
        let delay = self.toast_duration;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(HostEvent::ToastExpired).await;
        });
    }
}
