use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Connecting,
    Open,
    Closed,
    Error,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "CONNECTED",
            Self::Closed => "DISCONNECTED",
            Self::Error => "ERROR",
        }
    }

    /// Device messages only count while the socket is open.
    pub fn accepts_messages(self) -> bool {
        self == Self::Open
    }
}

/// What the transport reports to the reconciliation loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    State(LinkState),
    Message(String),
}

/// Reconnect policy for the device link. The device is a single board on the
/// local network, so the delay is fixed rather than exponential.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: LinkState,
    reconnect_delay: Duration,
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: LinkState::Closed,
            reconnect_delay,
            attempts: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn begin_attempt(&mut self) -> LinkState {
        self.attempts = self.attempts.saturating_add(1);
        self.state = LinkState::Connecting;
        self.state
    }

    pub fn on_open(&mut self) -> LinkState {
        self.state = LinkState::Open;
        self.state
    }

    /// Returns the delay before the next attempt.
    pub fn on_closed(&mut self) -> Duration {
        self.state = LinkState::Closed;
        self.reconnect_delay
    }

    /// Returns the delay before the next attempt.
    pub fn on_error(&mut self) -> Duration {
        self.state = LinkState::Error;
        self.reconnect_delay
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_close_schedules_fixed_delay() {
        let mut link = ConnectionManager::default();
        assert_eq!(link.begin_attempt(), LinkState::Connecting);
        assert_eq!(link.on_open(), LinkState::Open);
        assert!(link.state().accepts_messages());

        assert_eq!(link.on_closed(), Duration::from_millis(2_000));
        assert_eq!(link.state(), LinkState::Closed);
        assert!(!link.state().accepts_messages());
    }

    #[test]
    fn errors_use_same_delay_every_time() {
        let mut link = ConnectionManager::new(Duration::from_millis(750));
        for _ in 0..5 {
            link.begin_attempt();
            assert_eq!(link.on_error(), Duration::from_millis(750));
            assert_eq!(link.state(), LinkState::Error);
        }
        assert_eq!(link.attempts(), 5);
    }

    #[test]
    fn only_open_link_accepts_messages() {
        let mut link = ConnectionManager::default();
        assert!(!link.state().accepts_messages());
        link.begin_attempt();
        assert!(!link.state().accepts_messages());
        link.on_open();
        link.on_error();
        assert!(!link.state().accepts_messages());
    }
}
