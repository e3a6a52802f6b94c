use std::time::Instant;

use serde::Serialize;

use crate::{
    classify::{DewPointState, Severity},
    edit_lock::RangeField,
    format::{fmt_value, fmt_when, fmt_wifi, or_placeholder, PLACEHOLDER},
    profiles::profile_by_id,
    session::Session,
    snapshot::Snapshot,
    staleness::FrameScheduler,
};

const NO_PEAKS: &str = "No data";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakRow {
    pub text: String,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeInputView {
    pub text: String,
    pub editing: bool,
}

/// Everything a sink needs to draw one dashboard frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub link: &'static str,
    pub device_socket: bool,
    pub wifi: String,
    pub mode: String,
    pub ap_ssid: String,
    pub ip_ap: String,
    pub ip_sta: String,
    pub mac: String,

    pub temp_f: String,
    pub temp_f_severity: Severity,
    pub temp_c: String,
    pub temp_c_severity: Severity,
    pub rh: String,
    pub humidity_severity: Severity,
    pub ah: String,
    pub dew_f: String,
    pub dew_point: DewPointState,
    pub heat_f: String,
    pub lamp: String,

    pub profile_id: Option<u8>,
    pub profile_name: String,
    pub selection_pending: bool,
    pub range_min: String,
    pub range_max: String,
    pub custom_visible: bool,
    pub tmin_input: RangeInputView,
    pub tmax_input: RangeInputView,

    pub peaks: Vec<PeakRow>,
    pub peak_record: String,

    pub timer_remaining: String,
    pub timer_progress: f64,
    pub toast_visible: bool,
}

/// Receives each freshly rendered view.
pub trait ViewSink {
    fn render(&mut self, view: &DashboardView);
}

pub fn render<S: FrameScheduler>(session: &Session<S>, now: Instant) -> DashboardView {
    let empty = Snapshot::default();
    let snapshot = session.snapshot().unwrap_or(&empty);
    let tz = session.timezone();
    let classification = session.classification();
    let edits = session.edits();
    let selection = session.selection();
    let timer = session.timer();

    let profile_id = selection.displayed();
    let profile_name = profile_id
        .and_then(profile_by_id)
        .map(|profile| profile.name.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let input = |field: RangeField| RangeInputView {
        text: edits.text(field).to_string(),
        editing: edits.is_editing(field),
    };

    DashboardView {
        link: session.link().as_str(),
        device_socket: snapshot.ws.as_deref() == Some("CONNECTED"),
        wifi: fmt_wifi(snapshot.wifi_ssid.as_deref(), snapshot.wifi_connected),
        mode: or_placeholder(snapshot.mode.as_deref()),
        ap_ssid: or_placeholder(snapshot.ap_ssid.as_deref()),
        ip_ap: or_placeholder(snapshot.ip_ap.as_deref()),
        ip_sta: or_placeholder(snapshot.ip_sta.as_deref()),
        mac: or_placeholder(snapshot.mac.as_deref()),

        temp_f: fmt_value(snapshot.temp_f, 2),
        temp_f_severity: classification.map_or(Severity::Unknown, |c| c.temp_f),
        temp_c: fmt_value(snapshot.temp_c, 2),
        temp_c_severity: classification.map_or(Severity::Unknown, |c| c.temp_c),
        rh: fmt_value(snapshot.rh, 1),
        humidity_severity: classification.map_or(Severity::Unknown, |c| c.humidity),
        ah: fmt_value(snapshot.ah, 2),
        dew_f: fmt_value(snapshot.dew_f, 2),
        dew_point: classification.map_or(DewPointState::Unknown, |c| c.dew_point),
        heat_f: fmt_value(snapshot.heat_f, 2),
        lamp: if snapshot.lamp == Some(true) { "ON" } else { "OFF" }.to_string(),

        profile_id,
        profile_name,
        selection_pending: selection.is_pending(),
        range_min: fmt_value(snapshot.tmin, 1),
        range_max: fmt_value(snapshot.tmax, 1),
        custom_visible: session.custom_visible(),
        tmin_input: input(RangeField::Tmin),
        tmax_input: input(RangeField::Tmax),

        peaks: peak_rows(snapshot, tz),
        peak_record: snapshot
            .record_peak()
            .map(|peak| format!("{}°F", fmt_value(peak.temp_f, 1)))
            .unwrap_or_else(|| PLACEHOLDER.to_string()),

        timer_remaining: fmt_value(Some(timer.remaining()), 1),
        timer_progress: timer.progress(),
        toast_visible: session.toast_visible(now),
    }
}

fn peak_rows(snapshot: &Snapshot, tz: chrono_tz::Tz) -> Vec<PeakRow> {
    let peaks = snapshot.peaks();
    if peaks.is_empty() {
        return vec![PeakRow {
            text: PLACEHOLDER.to_string(),
            when: NO_PEAKS.to_string(),
        }];
    }

    peaks
        .iter()
        .map(|peak| {
            let label = or_placeholder(peak.label.as_deref());
            let temp = match peak.temp_f.filter(|t| !t.is_nan()) {
                Some(_) => format!("{}°F", fmt_value(peak.temp_f, 1)),
                None => PLACEHOLDER.to_string(),
            };
            PeakRow {
                text: format!("{label}: {temp}"),
                when: fmt_when(peak.timestamp, tz),
            }
        })
        .collect()
}
