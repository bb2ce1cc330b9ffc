use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use super::{
    backend::RecordWriter,
    surface::{spawn_surface, DetachedSurface, SurfaceEvent, SurfaceRuntime, SurfaceTiming, SurfaceView},
    template::render_with,
};
use crate::{
    log_debug, log_info,
    records::RecordSnapshot,
    settings::{InspectorSettings, WindowSize},
    view::OpenerRef,
};

const ENABLE_LOGS: bool = true;

pub const SURFACE_LABEL_PREFIX: &str = "lead-details-";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Deterministic surface name for a record. Bytes a window label cannot carry,
/// and `_` itself, are written as `_XX` hex, so distinct ids never share a label.
pub fn surface_label(record_id: &str) -> String {
    let mut label = String::with_capacity(SURFACE_LABEL_PREFIX.len() + record_id.len());
    label.push_str(SURFACE_LABEL_PREFIX);
    for byte in record_id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b':' | b'/') {
            label.push(char::from(byte));
        } else {
            let _ = write!(label, "_{byte:02X}");
        }
    }
    label
}

/// Everything a host needs to bring up one surface.
#[derive(Debug, Clone)]
pub struct SurfaceLaunch {
    pub label: String,
    pub title: String,
    pub document: String,
    pub snapshot: RecordSnapshot,
    pub opener: OpenerRef,
    pub timing: SurfaceTiming,
    pub window: WindowSize,
}

/// Where surfaces live: webview windows on the desktop, tasks in tests.
pub trait SurfaceHost: Send + Sync {
    fn is_open(&self, label: &str) -> bool;
    fn focus(&self, label: &str) -> Result<()>;
    fn create(&self, launch: SurfaceLaunch) -> Result<()>;
    fn close(&self, label: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceHandle {
    pub id: Uuid,
    pub label: String,
    pub record_id: String,
}

/// Opens at most one surface per record and refocuses it on repeat requests.
pub struct DetachedSurfaceFactory<H> {
    host: H,
    opener: OpenerRef,
    timing: SurfaceTiming,
    window: WindowSize,
    handles: Mutex<HashMap<String, SurfaceHandle>>,
}

impl<H: SurfaceHost> DetachedSurfaceFactory<H> {
    pub fn new(host: H, opener: OpenerRef, settings: &InspectorSettings) -> Self {
        Self {
            host,
            opener,
            timing: SurfaceTiming::from_settings(settings),
            window: settings.window.clone(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn open(&self, snapshot: RecordSnapshot) -> Result<SurfaceHandle> {
        let record_id = snapshot.record_id().to_string();
        let label = surface_label(&record_id);
        let mut handles = lock(&self.handles);

        if self.host.is_open(&label) {
            self.host
                .focus(&label)
                .with_context(|| format!("Failed to focus {label}"))?;
            log_debug!("Refocused inspector {label}");
            let handle = handles
                .entry(record_id.clone())
                .or_insert_with(|| SurfaceHandle {
                    id: Uuid::new_v4(),
                    label,
                    record_id,
                });
            return Ok(handle.clone());
        }

        let handle = SurfaceHandle {
            id: Uuid::new_v4(),
            label: label.clone(),
            record_id,
        };
        let launch = SurfaceLaunch {
            label: label.clone(),
            title: format!("Lead Details: {}", snapshot.record().name),
            document: render_with(&snapshot, &self.timing),
            snapshot,
            opener: self.opener.clone(),
            timing: self.timing,
            window: self.window.clone(),
        };
        self.host
            .create(launch)
            .with_context(|| format!("Failed to open {label}"))?;
        log_info!("Opened inspector {label}");
        handles.insert(handle.record_id.clone(), handle.clone());
        Ok(handle)
    }

    /// Close the surface for `record_id`. `false` when none was open.
    pub fn close(&self, record_id: &str) -> Result<bool> {
        let label = surface_label(record_id);
        let mut handles = lock(&self.handles);
        handles.remove(record_id);
        if !self.host.is_open(&label) {
            return Ok(false);
        }
        self.host.close(&label)?;
        log_info!("Closed inspector {label}");
        Ok(true)
    }

    pub fn handle_for(&self, record_id: &str) -> Option<SurfaceHandle> {
        let label = surface_label(record_id);
        if !self.host.is_open(&label) {
            return None;
        }
        lock(&self.handles).get(record_id).cloned()
    }
}

struct HeadlessEntry {
    runtime: SurfaceRuntime,
    document: String,
    focused: usize,
}

/// Runs each surface as a tokio task driven by [`SurfaceEvent`]s instead of a window.
pub struct HeadlessHost<W> {
    writer: Arc<W>,
    surfaces: Mutex<HashMap<String, HeadlessEntry>>,
}

impl<W: RecordWriter> HeadlessHost<W> {
    pub fn new(writer: Arc<W>) -> Self {
        Self {
            writer,
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    pub fn send(&self, label: &str, event: SurfaceEvent) -> bool {
        lock(&self.surfaces)
            .get(label)
            .is_some_and(|entry| entry.runtime.events.send(event).is_ok())
    }

    pub fn view(&self, label: &str) -> Option<SurfaceView> {
        lock(&self.surfaces)
            .get(label)
            .map(|entry| entry.runtime.view.borrow().clone())
    }

    pub fn watch(&self, label: &str) -> Option<watch::Receiver<SurfaceView>> {
        lock(&self.surfaces)
            .get(label)
            .map(|entry| entry.runtime.view.clone())
    }

    pub fn document(&self, label: &str) -> Option<String> {
        lock(&self.surfaces)
            .get(label)
            .map(|entry| entry.document.clone())
    }

    pub fn focus_count(&self, label: &str) -> usize {
        lock(&self.surfaces)
            .get(label)
            .map_or(0, |entry| entry.focused)
    }

    pub fn open_count(&self) -> usize {
        lock(&self.surfaces)
            .values()
            .filter(|entry| entry.runtime.is_running())
            .count()
    }
}

impl<W: RecordWriter> SurfaceHost for HeadlessHost<W> {
    fn is_open(&self, label: &str) -> bool {
        lock(&self.surfaces)
            .get(label)
            .is_some_and(|entry| entry.runtime.is_running())
    }

    fn focus(&self, label: &str) -> Result<()> {
        let mut surfaces = lock(&self.surfaces);
        let entry = surfaces
            .get_mut(label)
            .ok_or_else(|| anyhow!("No surface named {label}"))?;
        entry.focused += 1;
        Ok(())
    }

    fn create(&self, launch: SurfaceLaunch) -> Result<()> {
        tokio::runtime::Handle::try_current().context("Headless surfaces need a tokio runtime")?;
        let surface = DetachedSurface::new(launch.snapshot, launch.opener, launch.timing, Utc::now());
        let runtime = spawn_surface(surface, self.writer.clone());
        let previous = lock(&self.surfaces).insert(
            launch.label,
            HeadlessEntry {
                runtime,
                document: launch.document,
                focused: 0,
            },
        );
        if let Some(previous) = previous {
            previous.runtime.cancel.cancel();
        }
        Ok(())
    }

    fn close(&self, label: &str) -> Result<()> {
        if let Some(entry) = lock(&self.surfaces).get(label) {
            entry.runtime.cancel.cancel();
        }
        Ok(())
    }
}
