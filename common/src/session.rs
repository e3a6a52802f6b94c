use std::time::{Duration, Instant};

use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    classify::{classify_snapshot, Classification},
    config::DashboardConfig,
    connection::{LinkEvent, LinkState},
    edit_lock::{BlurOutcome, EditLocks, RangeField},
    merge::{MergeError, MessageMerger},
    profiles::{is_custom, profile_by_id, CUSTOM_PROFILE_ID},
    selection::SelectionLock,
    snapshot::Snapshot,
    staleness::{FrameId, FrameScheduler, StalenessTimer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOrigin {
    /// The profile the operator picked.
    Selection { profile_id: u8 },
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed,
}

/// Body of `POST /api/profile`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRequest {
    pub profile_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmax: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardAction {
    SaveProfile {
        origin: SaveOrigin,
        request: ProfileRequest,
    },
    RebootDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Accepted,
    /// The link was not open; the message never reached the merger.
    Ignored,
}

/// Everything the dashboard knows, owned in one place and touched by one
/// event at a time.
#[derive(Debug)]
pub struct Session<S: FrameScheduler> {
    merger: MessageMerger,
    snapshot: Option<Snapshot>,
    classification: Option<Classification>,
    edits: EditLocks,
    selection: SelectionLock,
    timer: StalenessTimer,
    frames: S,
    link: LinkState,
    custom_visible: bool,
    fallback_band: (f64, f64),
    toast_duration: Duration,
    toast_until: Option<Instant>,
    timezone: Tz,
    accepted_messages: u64,
    dropped_messages: u64,
}

impl<S: FrameScheduler> Session<S> {
    pub fn new(config: &DashboardConfig, frames: S) -> Self {
        Self {
            merger: MessageMerger::new(),
            snapshot: None,
            classification: None,
            edits: EditLocks::new(),
            selection: SelectionLock::new(),
            timer: StalenessTimer::new(config.staleness_ceiling_secs),
            frames,
            link: LinkState::Connecting,
            custom_visible: false,
            fallback_band: (config.custom_fallback_min_f, config.custom_fallback_max_f),
            toast_duration: config.toast_duration(),
            toast_until: None,
            timezone: config.tz(),
            accepted_messages: 0,
            dropped_messages: 0,
        }
    }

    /// Starts the staleness countdown before any data has arrived.
    pub fn start(&mut self) {
        self.timer.reset(&mut self.frames);
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    pub fn edits(&self) -> &EditLocks {
        &self.edits
    }

    pub fn selection(&self) -> &SelectionLock {
        &self.selection
    }

    pub fn timer(&self) -> &StalenessTimer {
        &self.timer
    }

    pub fn frames(&self) -> &S {
        &self.frames
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn custom_visible(&self) -> bool {
        self.custom_visible
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn accepted_messages(&self) -> u64 {
        self.accepted_messages
    }

    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages
    }

    pub fn toast_visible(&self, now: Instant) -> bool {
        self.toast_until.map(|until| now < until).unwrap_or(false)
    }

    pub fn on_link_event(&mut self, event: LinkEvent) -> Result<MessageOutcome, MergeError> {
        match event {
            LinkEvent::State(state) => {
                self.link = state;
                Ok(MessageOutcome::Ignored)
            }
            LinkEvent::Message(text) => self.on_message(&text),
        }
    }

    /// Merges one inbound message. A rejected message leaves the current
    /// snapshot and every lock exactly as they were.
    pub fn on_message(&mut self, text: &str) -> Result<MessageOutcome, MergeError> {
        if !self.link.accepts_messages() {
            return Ok(MessageOutcome::Ignored);
        }
        let snapshot = match self.merger.merge_text(text) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.dropped_messages = self.dropped_messages.saturating_add(1);
                return Err(err);
            }
        };
        self.accept(snapshot);
        Ok(MessageOutcome::Accepted)
    }

    fn accept(&mut self, snapshot: Snapshot) {
        self.classification = Some(classify_snapshot(&snapshot));
        self.edits.apply_snapshot(snapshot.tmin, snapshot.tmax);
        self.selection.apply_snapshot(snapshot.profile_id);
        self.show_custom(self.selection.displayed().is_some_and(is_custom));
        self.snapshot = Some(snapshot);
        self.accepted_messages = self.accepted_messages.saturating_add(1);
        self.timer.reset(&mut self.frames);
    }

    /// Hiding the range pair also ends any edit on it.
    fn show_custom(&mut self, visible: bool) {
        self.custom_visible = visible;
        if !visible {
            self.edits.release_all();
        }
    }

    pub fn on_frame(&mut self, id: FrameId, at: Instant) -> bool {
        self.timer.on_frame(id, at, &mut self.frames)
    }

    /// Operator picked a profile. Unknown ids are ignored.
    pub fn select_profile(&mut self, profile_id: u8) -> Vec<DashboardAction> {
        if profile_by_id(profile_id).is_none() {
            return Vec::new();
        }

        self.selection.select(profile_id);
        self.show_custom(is_custom(profile_id));

        let mut request = ProfileRequest {
            profile_id,
            tmin: None,
            tmax: None,
        };
        if self.custom_visible {
            let (tmin, tmax) = self
                .edits
                .typed_band()
                .or_else(|| self.edits.target().complete())
                .unwrap_or(self.fallback_band);
            request.tmin = Some(tmin);
            request.tmax = Some(tmax);
        }

        vec![DashboardAction::SaveProfile {
            origin: SaveOrigin::Selection { profile_id },
            request,
        }]
    }

    pub fn focus_range(&mut self, field: RangeField) -> bool {
        if !self.custom_visible {
            return false;
        }
        self.edits.focus(field);
        true
    }

    pub fn input_range(&mut self, field: RangeField, text: &str) -> bool {
        self.custom_visible && self.edits.input(field, text)
    }

    pub fn blur_range(&mut self, field: RangeField) -> Vec<DashboardAction> {
        if !self.custom_visible {
            return Vec::new();
        }
        match self.edits.blur(field) {
            BlurOutcome::Persist { tmin, tmax } => vec![DashboardAction::SaveProfile {
                origin: SaveOrigin::Range,
                request: ProfileRequest {
                    profile_id: CUSTOM_PROFILE_ID,
                    tmin: Some(tmin),
                    tmax: Some(tmax),
                },
            }],
            BlurOutcome::Captured | BlurOutcome::Rejected | BlurOutcome::Inert => Vec::new(),
        }
    }

    pub fn request_reset(&mut self, confirmed: bool) -> Vec<DashboardAction> {
        if confirmed {
            vec![DashboardAction::RebootDevice]
        } else {
            Vec::new()
        }
    }

    pub fn on_save_settled(&mut self, origin: SaveOrigin, outcome: SaveOutcome, now: Instant) {
        match (outcome, origin) {
            (SaveOutcome::Saved, _) => {
                self.toast_until = Some(now + self.toast_duration);
            }
            (SaveOutcome::Failed, SaveOrigin::Selection { profile_id }) => {
                // A newer pick supersedes this one.
                if !self.selection.is_pending() || self.selection.displayed() != Some(profile_id) {
                    return;
                }
                let device_profile = self.snapshot.as_ref().and_then(|s| s.profile_id);
                self.selection.retract(device_profile);
                self.show_custom(self.selection.displayed().is_some_and(is_custom));
            }
            (SaveOutcome::Failed, SaveOrigin::Range) => {
                self.edits.revert_to_snapshot();
            }
        }
    }
}
