//! Detached lead inspector: per-record secondary windows that edit a frozen
//! snapshot of a lead, write through to the backend, and sync field changes back
//! to the primary list view, plus the zip → zone → ordinal pipeline both views
//! sort and label by.

pub mod utils;

pub mod actions;
pub mod channel;
pub mod inspector;
pub mod records;
pub mod settings;
pub mod timezone;
pub mod view;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use actions::{ActionInvocation, ActionName, ActionRegistry, Dispatch, LeadActions};
pub use channel::{Delivery, Envelope, PrimaryListener, RecordCache, SyncMessage};
pub use inspector::{
    render, DetachedSurfaceFactory, HeadlessHost, HttpRecordWriter, RecordWriter, SaveError,
    SurfaceHandle, SurfaceHost,
};
pub use records::{CapabilityToken, LeadRecord, RecordSnapshot, RecordSnapshotBuilder};
pub use settings::{InspectorSettings, SettingsStore};
pub use timezone::{SortDirection, TimeZoneOrderingEngine, TimeZoneResolver, ZoneView};
pub use utils::init_logging;
pub use view::{OpenerRef, PrimaryView, PrimaryWindow};
