use serde::Deserialize;
use serde_json::{Map, Value};

use crate::merge::MergeError;

pub const INFO_DISCRIMINANT: &str = "info";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TempPeak {
    pub label: Option<String>,
    pub temp_f: Option<f64>,
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: Option<i64>,
}

/// Canonical merged device state. Fields the dashboard does not interpret are
/// kept in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    pub temp_f: Option<f64>,
    pub temp_c: Option<f64>,
    pub rh: Option<f64>,
    pub ah: Option<f64>,
    pub dew_f: Option<f64>,
    pub heat_f: Option<f64>,

    pub temp_alarm: Option<bool>,
    pub humidity_alarm: Option<bool>,

    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
    pub hmin: Option<f64>,
    pub hmax: Option<f64>,

    pub profile_id: Option<u8>,
    pub lamp: Option<bool>,

    pub wifi_connected: Option<bool>,
    pub wifi_ssid: Option<String>,
    pub ap_ssid: Option<String>,
    pub ws: Option<String>,
    pub mode: Option<String>,
    pub ip_ap: Option<String>,
    pub ip_sta: Option<String>,
    pub mac: Option<String>,

    pub temp_peaks: Option<Vec<TempPeak>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }

    pub fn peaks(&self) -> &[TempPeak] {
        self.temp_peaks.as_deref().unwrap_or(&[])
    }

    /// Highest peak across all windows; the first one wins on ties.
    pub fn record_peak(&self) -> Option<&TempPeak> {
        let mut best: Option<&TempPeak> = None;
        for peak in self.peaks() {
            let Some(temp) = peak.temp_f.filter(|t| !t.is_nan()) else {
                continue;
            };
            if best
                .and_then(|b| b.temp_f)
                .map(|current| temp > current)
                .unwrap_or(true)
            {
                best = Some(peak);
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Telemetry,
    Info,
}

/// One inbound update carrying only its own subset of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialMessage {
    kind: MessageKind,
    fields: Map<String, Value>,
}

impl PartialMessage {
    pub fn parse(text: &str) -> Result<Self, MergeError> {
        let value: Value = serde_json::from_str(text).map_err(MergeError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, MergeError> {
        let Value::Object(fields) = value else {
            return Err(MergeError::NotAnObject);
        };
        let kind = match fields.get("type").and_then(Value::as_str) {
            Some(INFO_DISCRIMINANT) => MessageKind::Info,
            _ => MessageKind::Telemetry,
        };
        Ok(Self { kind, fields })
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
