use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    Synced,
    PendingLocal,
}

/// Keeps a locally chosen profile on the selector until the device reports
/// the same profile back.
#[derive(Debug, Clone, Default)]
pub struct SelectionLock {
    state: SelectionState,
    displayed: Option<u8>,
}

impl SelectionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == SelectionState::PendingLocal
    }

    pub fn displayed(&self) -> Option<u8> {
        self.displayed
    }

    /// Locks before the save request resolves.
    pub fn select(&mut self, profile_id: u8) {
        self.displayed = Some(profile_id);
        self.state = SelectionState::PendingLocal;
    }

    /// Returns true when the displayed value changed.
    pub fn apply_snapshot(&mut self, profile_id: Option<u8>) -> bool {
        let Some(profile_id) = profile_id else {
            return false;
        };
        match self.state {
            SelectionState::PendingLocal => {
                if self.displayed == Some(profile_id) {
                    self.state = SelectionState::Synced;
                }
                false
            }
            SelectionState::Synced => {
                let changed = self.displayed != Some(profile_id);
                self.displayed = Some(profile_id);
                changed
            }
        }
    }

    /// Abandons a local choice whose save failed and shows the device's
    /// profile again.
    pub fn retract(&mut self, snapshot_profile_id: Option<u8>) {
        self.state = SelectionState::Synced;
        if snapshot_profile_id.is_some() {
            self.displayed = snapshot_profile_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synced_selector_follows_snapshots() {
        let mut lock = SelectionLock::new();
        assert!(lock.apply_snapshot(Some(4)));
        assert_eq!(lock.displayed(), Some(4));
        assert!(!lock.apply_snapshot(Some(4)));
        assert!(lock.apply_snapshot(Some(7)));
        assert_eq!(lock.displayed(), Some(7));
    }

    #[test]
    fn pending_selection_ignores_stale_snapshots() {
        let mut lock = SelectionLock::new();
        lock.apply_snapshot(Some(0));
        lock.select(38);
        assert!(lock.is_pending());

        for stale in [0, 0, 12] {
            assert!(!lock.apply_snapshot(Some(stale)));
            assert_eq!(lock.displayed(), Some(38));
            assert!(lock.is_pending());
        }
    }

    #[test]
    fn matching_snapshot_releases_lock() {
        let mut lock = SelectionLock::new();
        lock.apply_snapshot(Some(0));
        lock.select(38);

        lock.apply_snapshot(Some(38));
        assert_eq!(lock.state(), SelectionState::Synced);

        assert!(lock.apply_snapshot(Some(5)));
        assert_eq!(lock.displayed(), Some(5));
    }

    #[test]
    fn missing_profile_id_changes_nothing() {
        let mut lock = SelectionLock::new();
        lock.select(3);
        assert!(!lock.apply_snapshot(None));
        assert!(lock.is_pending());
        assert_eq!(lock.displayed(), Some(3));
    }

    #[test]
    fn retract_restores_device_profile() {
        let mut lock = SelectionLock::new();
        lock.apply_snapshot(Some(2));
        lock.select(9);

        lock.retract(Some(2));
        assert_eq!(lock.state(), SelectionState::Synced);
        assert_eq!(lock.displayed(), Some(2));
    }
}
