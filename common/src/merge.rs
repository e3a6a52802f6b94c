use serde_json::{Map, Value};
use thiserror::Error;

use crate::snapshot::{MessageKind, PartialMessage, Snapshot};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message carries a field of the wrong type: {0}")]
    InvalidField(#[source] serde_json::Error),
}

/// Reconciles the telemetry and info message shapes into one snapshot.
///
/// The last message of each kind is kept in its own slot. The merged fields
/// always hold the union of both slots with the newest write of every field on
/// top, so no field disappears until it is superseded.
#[derive(Debug, Clone, Default)]
pub struct MessageMerger {
    last_info: Option<Map<String, Value>>,
    last_telemetry: Option<Map<String, Value>>,
    merged: Map<String, Value>,
}

impl MessageMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_text(&mut self, text: &str) -> Result<Snapshot, MergeError> {
        self.merge(PartialMessage::parse(text)?)
    }

    /// Nothing is stored unless the merged fields convert into a snapshot.
    pub fn merge(&mut self, message: PartialMessage) -> Result<Snapshot, MergeError> {
        let kind = message.kind();
        let incoming = message.into_fields();

        let mut merged = self.merged.clone();
        overlay(&mut merged, &incoming);

        let snapshot = Snapshot::from_fields(&merged).map_err(MergeError::InvalidField)?;

        match kind {
            MessageKind::Info => self.last_info = Some(incoming),
            MessageKind::Telemetry => self.last_telemetry = Some(incoming),
        }
        self.merged = merged;
        Ok(snapshot)
    }

    pub fn last_info(&self) -> Option<&Map<String, Value>> {
        self.last_info.as_ref()
    }

    pub fn last_telemetry(&self) -> Option<&Map<String, Value>> {
        self.last_telemetry.as_ref()
    }

    pub fn merged_fields(&self) -> &Map<String, Value> {
        &self.merged
    }
}

fn overlay(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn telemetry(temp_f: f64) -> String {
        json!({
            "type": "status",
            "temp_f": temp_f,
            "rh": 50.0,
            "tmin": 98.0,
            "tmax": 100.5,
            "profile_id": 0,
            "lamp": true,
        })
        .to_string()
    }

    fn info(ssid: &str) -> String {
        json!({
            "type": "info",
            "wifi_connected": true,
            "wifi_ssid": ssid,
            "ws": "CONNECTED",
            "mode": "STA",
        })
        .to_string()
    }

    #[test]
    fn telemetry_then_info_is_union() {
        let mut merger = MessageMerger::new();
        merger.merge_text(&telemetry(99.2)).unwrap();
        let snapshot = merger.merge_text(&info("barn")).unwrap();

        assert_eq!(snapshot.temp_f, Some(99.2));
        assert_eq!(snapshot.rh, Some(50.0));
        assert_eq!(snapshot.profile_id, Some(0));
        assert_eq!(snapshot.wifi_ssid.as_deref(), Some("barn"));
        assert_eq!(snapshot.mode.as_deref(), Some("STA"));
    }

    #[test]
    fn info_then_telemetry_is_union() {
        let mut merger = MessageMerger::new();
        merger.merge_text(&info("barn")).unwrap();
        let snapshot = merger.merge_text(&telemetry(99.4)).unwrap();

        assert_eq!(snapshot.temp_f, Some(99.4));
        assert_eq!(snapshot.wifi_ssid.as_deref(), Some("barn"));
        assert_eq!(snapshot.extra.get("type"), Some(&json!("status")));
    }

    #[test]
    fn later_message_wins_on_overlap() {
        let mut merger = MessageMerger::new();
        merger
            .merge_text(r#"{"type":"status","mode":"AP","temp_f":99.0}"#)
            .unwrap();
        let snapshot = merger.merge_text(r#"{"type":"info","mode":"STA"}"#).unwrap();
        assert_eq!(snapshot.mode.as_deref(), Some("STA"));

        let snapshot = merger
            .merge_text(r#"{"type":"status","mode":"AP+STA","temp_f":99.5}"#)
            .unwrap();
        assert_eq!(snapshot.mode.as_deref(), Some("AP+STA"));
        assert_eq!(snapshot.temp_f, Some(99.5));
    }

    #[test]
    fn older_info_does_not_override_newer_telemetry() {
        let mut merger = MessageMerger::new();
        merger.merge_text(r#"{"type":"info","mode":"STA"}"#).unwrap();
        merger
            .merge_text(r#"{"type":"status","mode":"AP","temp_f":99.0}"#)
            .unwrap();
        let snapshot = merger
            .merge_text(r#"{"type":"status","temp_f":99.2}"#)
            .unwrap();

        assert_eq!(snapshot.mode.as_deref(), Some("AP"));
    }

    #[test]
    fn newer_telemetry_replaces_older_telemetry() {
        let mut merger = MessageMerger::new();
        merger.merge_text(&telemetry(99.0)).unwrap();
        merger.merge_text(&info("barn")).unwrap();
        let snapshot = merger.merge_text(&telemetry(100.0)).unwrap();

        assert_eq!(snapshot.temp_f, Some(100.0));
        assert_eq!(snapshot.wifi_ssid.as_deref(), Some("barn"));
    }

    #[test]
    fn fields_persist_until_superseded() {
        let mut merger = MessageMerger::new();
        merger
            .merge_text(r#"{"type":"status","temp_f":99.0,"heat_f":101.0}"#)
            .unwrap();
        let snapshot = merger
            .merge_text(r#"{"type":"status","temp_f":99.3}"#)
            .unwrap();

        assert_eq!(snapshot.temp_f, Some(99.3));
        assert_eq!(snapshot.heat_f, Some(101.0));
    }

    #[test]
    fn merging_same_message_twice_is_idempotent() {
        let mut merger = MessageMerger::new();
        merger.merge_text(&info("barn")).unwrap();
        let once = merger.merge_text(&telemetry(99.7)).unwrap();
        let twice = merger.merge_text(&telemetry(99.7)).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn malformed_message_leaves_state_untouched() {
        let mut merger = MessageMerger::new();
        merger.merge_text(&telemetry(99.1)).unwrap();
        let before = merger.merged_fields().clone();

        assert!(merger.merge_text("{\"temp_f\": 99").is_err());
        assert!(matches!(
            merger.merge_text(r#"{"type":"status","temp_f":"hot"}"#),
            Err(MergeError::InvalidField(_))
        ));

        assert_eq!(merger.merged_fields(), &before);
        assert_eq!(
            merger.last_telemetry().and_then(|m| m.get("temp_f")),
            Some(&json!(99.1))
        );
    }

    #[test]
    fn slots_hold_last_message_of_each_kind() {
        let mut merger = MessageMerger::new();
        merger.merge_text(&info("one")).unwrap();
        merger.merge_text(&info("two")).unwrap();

        assert!(merger.last_telemetry().is_none());
        assert_eq!(
            merger.last_info().and_then(|m| m.get("wifi_ssid")),
            Some(&json!("two"))
        );
    }
}
