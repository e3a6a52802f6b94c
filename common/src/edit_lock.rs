use serde::{Deserialize, Serialize};

use crate::format::{fmt_value, parse_range_input};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeField {
    Tmin,
    Tmax,
}

impl RangeField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tmin => "tmin",
            Self::Tmax => "tmax",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tmin" => Some(Self::Tmin),
            "tmax" => Some(Self::Tmax),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditState {
    #[default]
    Idle,
    Editing,
}

/// Band values shared by both inputs: refreshed from every snapshot and
/// overwritten by whatever the operator commits on blur.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeTarget {
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
}

impl RangeTarget {
    pub fn get(&self, field: RangeField) -> Option<f64> {
        match field {
            RangeField::Tmin => self.tmin,
            RangeField::Tmax => self.tmax,
        }
    }

    fn set(&mut self, field: RangeField, value: Option<f64>) {
        match field {
            RangeField::Tmin => self.tmin = value,
            RangeField::Tmax => self.tmax = value,
        }
    }

    pub fn complete(&self) -> Option<(f64, f64)> {
        Some((self.tmin?, self.tmax?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlurOutcome {
    /// Both band values are known; persist them together.
    Persist { tmin: f64, tmax: f64 },
    /// Value captured but the other side of the band is still unknown.
    Captured,
    /// Typed text was not a number; the input shows the snapshot value again.
    Rejected,
    /// The field was not being edited.
    Inert,
}

#[derive(Debug, Clone, Default)]
struct FieldEdit {
    state: EditState,
    text: String,
}

#[derive(Debug, Clone, Default)]
pub struct EditLocks {
    tmin: FieldEdit,
    tmax: FieldEdit,
    target: RangeTarget,
    snapshot: RangeTarget,
}

impl EditLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn field(&self, field: RangeField) -> &FieldEdit {
        match field {
            RangeField::Tmin => &self.tmin,
            RangeField::Tmax => &self.tmax,
        }
    }

    fn field_mut(&mut self, field: RangeField) -> &mut FieldEdit {
        match field {
            RangeField::Tmin => &mut self.tmin,
            RangeField::Tmax => &mut self.tmax,
        }
    }

    pub fn state(&self, field: RangeField) -> EditState {
        self.field(field).state
    }

    pub fn is_editing(&self, field: RangeField) -> bool {
        self.state(field) == EditState::Editing
    }

    pub fn text(&self, field: RangeField) -> &str {
        &self.field(field).text
    }

    pub fn target(&self) -> RangeTarget {
        self.target
    }

    pub fn focus(&mut self, field: RangeField) {
        self.field_mut(field).state = EditState::Editing;
    }

    /// Typing only lands while the field holds focus.
    pub fn input(&mut self, field: RangeField, text: &str) -> bool {
        let edit = self.field_mut(field);
        if edit.state != EditState::Editing {
            return false;
        }
        edit.text = text.to_string();
        true
    }

    pub fn blur(&mut self, field: RangeField) -> BlurOutcome {
        if !self.is_editing(field) {
            return BlurOutcome::Inert;
        }
        self.field_mut(field).state = EditState::Idle;

        let Some(value) = parse_range_input(self.text(field)) else {
            let restored = fmt_value(self.snapshot.get(field), 1);
            self.field_mut(field).text = restored;
            return BlurOutcome::Rejected;
        };

        self.target.set(field, Some(value));
        match self.target.complete() {
            Some((tmin, tmax)) => BlurOutcome::Persist { tmin, tmax },
            None => BlurOutcome::Captured,
        }
    }

    /// Refreshes the shared target and every idle input from a new snapshot.
    pub fn apply_snapshot(&mut self, tmin: Option<f64>, tmax: Option<f64>) {
        self.snapshot = RangeTarget { tmin, tmax };
        self.target = self.snapshot;
        for field in [RangeField::Tmin, RangeField::Tmax] {
            let formatted = fmt_value(self.snapshot.get(field), 1);
            let edit = self.field_mut(field);
            if edit.state == EditState::Idle {
                edit.text = formatted;
            }
        }
    }

    /// Drops a committed band that the device refused, restoring the last
    /// snapshot band into the target and any idle input.
    pub fn revert_to_snapshot(&mut self) {
        let snapshot = self.snapshot;
        self.apply_snapshot(snapshot.tmin, snapshot.tmax);
    }

    /// Ends any edit in progress once the range pair is hidden.
    pub fn release_all(&mut self) {
        self.tmin.state = EditState::Idle;
        self.tmax.state = EditState::Idle;
        self.revert_to_snapshot();
    }

    /// Both inputs hold numbers.
    pub fn typed_band(&self) -> Option<(f64, f64)> {
        let tmin = parse_range_input(self.text(RangeField::Tmin))?;
        let tmax = parse_range_input(self.text(RangeField::Tmax))?;
        Some((tmin, tmax))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_inputs_follow_snapshots() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        assert_eq!(locks.text(RangeField::Tmin), "98.0");
        assert_eq!(locks.text(RangeField::Tmax), "100.5");

        locks.apply_snapshot(Some(97.24), None);
        assert_eq!(locks.text(RangeField::Tmin), "97.2");
        assert_eq!(locks.text(RangeField::Tmax), "—");
    }

    #[test]
    fn editing_input_is_not_overwritten() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        locks.focus(RangeField::Tmin);
        assert!(locks.input(RangeField::Tmin, "97.5"));

        for tmin in [98.1, 98.2, 96.0] {
            locks.apply_snapshot(Some(tmin), Some(100.0));
            assert_eq!(locks.text(RangeField::Tmin), "97.5");
        }
        assert_eq!(locks.text(RangeField::Tmax), "100.0");
    }

    #[test]
    fn input_without_focus_is_ignored() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        assert!(!locks.input(RangeField::Tmax, "101"));
        assert_eq!(locks.text(RangeField::Tmax), "100.5");
    }

    #[test]
    fn blur_persists_both_values_once() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        locks.focus(RangeField::Tmax);
        locks.input(RangeField::Tmax, "101.0");

        assert_eq!(
            locks.blur(RangeField::Tmax),
            BlurOutcome::Persist {
                tmin: 98.0,
                tmax: 101.0
            }
        );
        assert_eq!(locks.state(RangeField::Tmax), EditState::Idle);
        assert_eq!(locks.blur(RangeField::Tmax), BlurOutcome::Inert);
    }

    #[test]
    fn persisted_pair_uses_other_fields_last_capture() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));

        locks.focus(RangeField::Tmin);
        locks.input(RangeField::Tmin, "97.0");
        locks.focus(RangeField::Tmax);
        locks.input(RangeField::Tmax, "99.0");

        assert_eq!(
            locks.blur(RangeField::Tmin),
            BlurOutcome::Persist {
                tmin: 97.0,
                tmax: 100.5
            }
        );
        assert_eq!(
            locks.blur(RangeField::Tmax),
            BlurOutcome::Persist {
                tmin: 97.0,
                tmax: 99.0
            }
        );
    }

    #[test]
    fn invalid_text_reverts_without_persist() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        locks.focus(RangeField::Tmin);
        locks.input(RangeField::Tmin, "warm");

        assert_eq!(locks.blur(RangeField::Tmin), BlurOutcome::Rejected);
        assert_eq!(locks.text(RangeField::Tmin), "98.0");
        assert_eq!(locks.target().tmin, Some(98.0));
    }

    #[test]
    fn blur_without_other_value_only_captures() {
        let mut locks = EditLocks::new();
        locks.focus(RangeField::Tmin);
        locks.input(RangeField::Tmin, "97.0");

        assert_eq!(locks.blur(RangeField::Tmin), BlurOutcome::Captured);
        assert_eq!(locks.target().tmin, Some(97.0));
        assert_eq!(locks.target().tmax, None);
    }

    #[test]
    fn revert_restores_snapshot_band() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        locks.focus(RangeField::Tmin);
        locks.input(RangeField::Tmin, "90");
        locks.blur(RangeField::Tmin);
        assert_eq!(locks.target().tmin, Some(90.0));

        locks.revert_to_snapshot();
        assert_eq!(locks.target().tmin, Some(98.0));
        assert_eq!(locks.text(RangeField::Tmin), "98.0");
    }

    #[test]
    fn release_all_drops_locks_and_typed_text() {
        let mut locks = EditLocks::new();
        locks.apply_snapshot(Some(98.0), Some(100.5));
        locks.focus(RangeField::Tmin);
        locks.input(RangeField::Tmin, "97.0");
        locks.focus(RangeField::Tmax);

        locks.release_all();
        assert_eq!(locks.state(RangeField::Tmin), EditState::Idle);
        assert_eq!(locks.state(RangeField::Tmax), EditState::Idle);
        assert_eq!(locks.text(RangeField::Tmin), "98.0");
        assert_eq!(locks.blur(RangeField::Tmin), BlurOutcome::Inert);
    }

    #[test]
    fn typed_band_requires_both_numbers() {
        let mut locks = EditLocks::new();
        assert_eq!(locks.typed_band(), None);

        locks.apply_snapshot(Some(98.0), None);
        assert_eq!(locks.typed_band(), None);

        locks.apply_snapshot(Some(98.0), Some(100.5));
        assert_eq!(locks.typed_band(), Some((98.0, 100.5)));
    }

    #[test]
    fn field_names_round_trip() {
        for field in [RangeField::Tmin, RangeField::Tmax] {
            assert_eq!(RangeField::parse(field.as_str()), Some(field));
        }
        assert_eq!(RangeField::parse("hmin"), None);
    }
}
