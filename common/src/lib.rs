pub mod classify;
pub mod config;
pub mod connection;
pub mod edit_lock;
pub mod format;
pub mod merge;
pub mod profiles;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod staleness;
pub mod view;

pub use classify::{Classification, DewPointState, Severity};
pub use config::{ConfigError, DashboardConfig, DeviceConfig};
pub use connection::{ConnectionManager, LinkEvent, LinkState};
pub use edit_lock::{EditLocks, EditState, RangeField};
pub use merge::{MergeError, MessageMerger};
pub use profiles::{all_profiles, profile_by_id, Profile, CUSTOM_PROFILE_ID, DEFAULT_PROFILE_ID};
pub use selection::{SelectionLock, SelectionState};
pub use session::{
    DashboardAction, MessageOutcome, ProfileRequest, SaveOrigin, SaveOutcome, Session,
};
pub use snapshot::{MessageKind, PartialMessage, Snapshot, TempPeak};
pub use staleness::{FrameId, FrameScheduler, StalenessTimer};
pub use view::{render, DashboardView, ViewSink};
