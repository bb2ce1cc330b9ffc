use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::{
    autosave::{NotesAutosave, SaveStatus},
    backend::{RecordPatch, RecordWriter, SaveError},
};
use crate::{
    actions::{ActionInvocation, ActionName},
    channel::SyncMessage,
    log_debug, log_info, log_warn,
    records::{dispositions::is_light_color, RecordSnapshot},
    settings::InspectorSettings,
    timezone::{parse_zone, FALLBACK_ZONE},
    view::OpenerRef,
};

const ENABLE_LOGS: bool = true;

pub const HANG_UP_NOTICE: &str = "Hang up requires telephony integration.";

/// Timers a surface runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTiming {
    pub notes_debounce: Duration,
    pub terminal_close_delay: Duration,
    pub clock_refresh: Duration,
}

impl SurfaceTiming {
    pub fn from_settings(settings: &InspectorSettings) -> Self {
        Self {
            notes_debounce: settings.notes_debounce(),
            terminal_close_delay: settings.terminal_close_delay(),
            clock_refresh: settings.clock_refresh(),
        }
    }
}

impl Default for SurfaceTiming {
    fn default() -> Self {
        Self::from_settings(&InspectorSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceButton {
    Call,
    HangUp,
    EditLead,
    SendToSpreadsheet,
    BookAppointment,
    AddReminder,
    AddToCampaign,
    QuickMessage,
    Referral,
    Delete,
}

impl SurfaceButton {
    pub const ALL: [SurfaceButton; 10] = [
        SurfaceButton::Call,
        SurfaceButton::HangUp,
        SurfaceButton::EditLead,
        SurfaceButton::SendToSpreadsheet,
        SurfaceButton::BookAppointment,
        SurfaceButton::AddReminder,
        SurfaceButton::AddToCampaign,
        SurfaceButton::QuickMessage,
        SurfaceButton::Referral,
        SurfaceButton::Delete,
    ];

    pub fn element_id(&self) -> &'static str {
        match self {
            SurfaceButton::Call => "call-btn",
            SurfaceButton::HangUp => "hangup-btn",
            SurfaceButton::EditLead => "edit-lead-action",
            SurfaceButton::SendToSpreadsheet => "send-to-sheet-action",
            SurfaceButton::BookAppointment => "book-appt-action",
            SurfaceButton::AddReminder => "add-to-reminders-action",
            SurfaceButton::AddToCampaign => "add-to-campaign-action",
            SurfaceButton::QuickMessage => "quick-drip-action",
            SurfaceButton::Referral => "referral-partner-action",
            SurfaceButton::Delete => "delete-lead-action",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SurfaceButton::Call => "Call",
            SurfaceButton::HangUp => "Hang Up",
            SurfaceButton::EditLead => "Edit Lead",
            SurfaceButton::SendToSpreadsheet => "Send to Spreadsheet",
            SurfaceButton::BookAppointment => "Book Appointment",
            SurfaceButton::AddReminder => "Add to Reminders",
            SurfaceButton::AddToCampaign => "Add to Drip Campaign",
            SurfaceButton::QuickMessage => "Quick Drip Message",
            SurfaceButton::Referral => "Referral Partner",
            SurfaceButton::Delete => "Delete Lead",
        }
    }

    /// Registry entry the button calls. Hang-up has none.
    pub fn action(&self) -> Option<ActionName> {
        match self {
            SurfaceButton::Call => Some(ActionName::Dial),
            SurfaceButton::HangUp => None,
            SurfaceButton::EditLead => Some(ActionName::EditLead),
            SurfaceButton::SendToSpreadsheet => Some(ActionName::SendToSpreadsheet),
            SurfaceButton::BookAppointment => Some(ActionName::BookAppointment),
            SurfaceButton::AddReminder => Some(ActionName::AddReminder),
            SurfaceButton::AddToCampaign => Some(ActionName::AddToCampaign),
            SurfaceButton::QuickMessage => Some(ActionName::QuickMessage),
            SurfaceButton::Referral => Some(ActionName::Referral),
            SurfaceButton::Delete => Some(ActionName::DeleteLead),
        }
    }
}

/// Everything the user can do inside a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    DispositionChanged(String),
    NotesInput(String),
    NotesBlur,
    ButtonClicked(SurfaceButton),
    Close,
}

/// What the surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceView {
    pub notes: String,
    pub disposition: String,
    pub color: String,
    pub text_color: String,
    pub notes_status: SaveStatus,
    pub disposition_status: SaveStatus,
    pub clock: String,
    pub notice: Option<String>,
    pub closed: bool,
}

pub fn text_color_for(color: &str) -> &'static str {
    if is_light_color(color) {
        "#000"
    } else {
        "#fff"
    }
}

/// Wall clock in the record's zone, labelled with the abbreviation captured at
/// snapshot time. The label is never re-resolved while the surface is open.
#[derive(Debug, Clone)]
pub struct SurfaceClock {
    zone: Tz,
    abbreviation: String,
}

impl SurfaceClock {
    pub fn new(zone_name: &str, abbreviation: impl Into<String>) -> Self {
        Self {
            zone: parse_zone(zone_name).unwrap_or(FALLBACK_ZONE),
            abbreviation: abbreviation.into(),
        }
    }

    pub fn from_snapshot(snapshot: &RecordSnapshot) -> Self {
        Self::new(snapshot.zone(), snapshot.zone_abbreviation())
    }

    pub fn display_at(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            at.with_timezone(&self.zone).format("%I:%M%p"),
            self.abbreviation
        )
    }
}

/// A backend write the driver has to perform for the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSave {
    Notes(String),
    Disposition(String),
}

impl PendingSave {
    pub fn patch(&self) -> RecordPatch {
        match self {
            PendingSave::Notes(notes) => RecordPatch::notes(notes.clone()),
            PendingSave::Disposition(disposition) => RecordPatch::disposition(disposition.clone()),
        }
    }

    fn patch_kind(&self) -> &'static str {
        match self {
            PendingSave::Notes(_) => "notes",
            PendingSave::Disposition(_) => "disposition",
        }
    }

    fn message(&self, record_id: &str) -> SyncMessage {
        match self {
            PendingSave::Notes(notes) => SyncMessage::notes(record_id, notes.clone()),
            PendingSave::Disposition(disposition) => {
                SyncMessage::disposition(record_id, disposition.clone())
            }
        }
    }
}

/// Detached-side state for one record. Owns its snapshot; talks to the primary
/// view only through the opener reference.
#[derive(Debug)]
pub struct DetachedSurface {
    snapshot: RecordSnapshot,
    opener: OpenerRef,
    timing: SurfaceTiming,
    clock: SurfaceClock,
    autosave: NotesAutosave,
    close_at: Option<Instant>,
    view: SurfaceView,
}

impl DetachedSurface {
    pub fn new(
        snapshot: RecordSnapshot,
        opener: OpenerRef,
        timing: SurfaceTiming,
        wall: DateTime<Utc>,
    ) -> Self {
        let clock = SurfaceClock::from_snapshot(&snapshot);
        let record = snapshot.record();
        let notes = record.notes.clone().unwrap_or_default();
        let view = SurfaceView {
            notes: notes.clone(),
            disposition: record.disposition.clone().unwrap_or_default(),
            color: snapshot.color().to_string(),
            text_color: text_color_for(snapshot.color()).to_string(),
            notes_status: SaveStatus::Blank,
            disposition_status: SaveStatus::Blank,
            clock: clock.display_at(wall),
            notice: None,
            closed: false,
        };
        Self {
            autosave: NotesAutosave::new(notes, timing.notes_debounce),
            snapshot,
            opener,
            timing,
            clock,
            close_at: None,
            view,
        }
    }

    pub fn snapshot(&self) -> &RecordSnapshot {
        &self.snapshot
    }

    pub fn view(&self) -> &SurfaceView {
        &self.view
    }

    pub fn timing(&self) -> SurfaceTiming {
        self.timing
    }

    pub fn save_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    pub fn close_at(&self) -> Option<Instant> {
        self.close_at
    }

    pub fn handle(&mut self, event: SurfaceEvent, now: Instant) -> Option<PendingSave> {
        if self.view.closed {
            return None;
        }
        match event {
            SurfaceEvent::DispositionChanged(disposition) => {
                let color = self.snapshot.color_for(&disposition).to_string();
                self.view.text_color = text_color_for(&color).to_string();
                self.view.color = color;
                self.view.disposition = disposition.clone();
                self.view.disposition_status = SaveStatus::Saving;
                Some(PendingSave::Disposition(disposition))
            }
            SurfaceEvent::NotesInput(text) => {
                self.view.notes = text.clone();
                self.autosave.input(text, now);
                None
            }
            SurfaceEvent::NotesBlur => {
                let save = self.autosave.flush(now).map(PendingSave::Notes);
                self.view.notes_status = self.autosave.status();
                save
            }
            SurfaceEvent::ButtonClicked(button) => {
                self.click(button, now);
                None
            }
            SurfaceEvent::Close => {
                self.close();
                None
            }
        }
    }

    /// Fires the debounced notes save once its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<PendingSave> {
        let save = self.autosave.poll(now).map(PendingSave::Notes);
        self.view.notes_status = self.autosave.status();
        save
    }

    /// Record a finished backend write. Only accepted writes are announced to the opener.
    pub fn complete(&mut self, save: PendingSave, result: Result<Value, SaveError>) {
        let record_id = self.snapshot.record_id().to_string();
        match (&save, &result) {
            (PendingSave::Notes(_), Ok(_)) => self.autosave.saved(),
            (PendingSave::Notes(_), Err(_)) => self.autosave.failed(),
            (PendingSave::Disposition(_), Ok(_)) => {
                self.view.disposition_status = SaveStatus::Saved;
            }
            (PendingSave::Disposition(_), Err(_)) => {
                self.view.disposition_status = SaveStatus::Error;
            }
        }
        self.view.notes_status = self.autosave.status();

        match result {
            Ok(_) => {
                log_info!("Saved {} for {record_id}", save.patch_kind());
                if !self.opener.post_message(&save.message(&record_id)) {
                    log_debug!("No opener listening for {record_id}");
                }
            }
            Err(err) => log_warn!("Save of {} for {record_id} failed: {err}", save.patch_kind()),
        }
    }

    pub fn tick(&mut self, wall: DateTime<Utc>) {
        self.view.clock = self.clock.display_at(wall);
    }

    pub fn close(&mut self) {
        if !self.view.closed {
            log_info!("Closing inspector for {}", self.snapshot.record_id());
        }
        self.view.closed = true;
        self.close_at = None;
    }

    fn click(&mut self, button: SurfaceButton, now: Instant) {
        let Some(action) = button.action() else {
            self.view.notice = Some(HANG_UP_NOTICE.to_string());
            return;
        };
        self.view.notice = None;
        let invocation = ActionInvocation::for_lead(action, self.snapshot.record());
        if !self.opener.invoke(&invocation) {
            log_debug!(
                "{} from inspector for {} was not delivered",
                action,
                invocation.record_id
            );
            return;
        }
        if action.is_terminal() {
            self.close_at = Some(now + self.timing.terminal_close_delay);
        }
    }
}

/// Handles to a running surface task.
pub struct SurfaceRuntime {
    pub events: mpsc::UnboundedSender<SurfaceEvent>,
    pub view: watch::Receiver<SurfaceView>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

impl SurfaceRuntime {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished() && !self.view.borrow().closed
    }
}

/// Start the surface on the current tokio runtime.
pub fn spawn_surface<W: RecordWriter>(surface: DetachedSurface, writer: Arc<W>) -> SurfaceRuntime {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(surface.view().clone());
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_surface(
        surface,
        writer,
        events_rx,
        view_tx,
        cancel.clone(),
    ));
    SurfaceRuntime {
        events: events_tx,
        view: view_rx,
        cancel,
        task,
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Event loop for one surface. Saves run as their own tasks and report back over
/// `done`. Saves still in flight when the surface closes are awaited before the
/// task ends, so an accepted write is always announced to the opener.
pub async fn run_surface<W: RecordWriter>(
    mut surface: DetachedSurface,
    writer: Arc<W>,
    mut events: mpsc::UnboundedReceiver<SurfaceEvent>,
    view: watch::Sender<SurfaceView>,
    cancel: CancellationToken,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(PendingSave, Result<Value, SaveError>)>();
    let mut in_flight = 0usize;
    let mut ticker = time::interval(surface.timing().clock_refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let record_id = surface.snapshot().record_id().to_string();
    let token = surface.snapshot().token().clone();
    let spawn_save = |save: PendingSave| {
        let writer = writer.clone();
        let done = done_tx.clone();
        let record_id = record_id.clone();
        let token = token.clone();
        tokio::spawn(async move {
            let result = writer.put_record(&record_id, &save.patch(), &token).await;
            let _ = done.send((save, result));
        });
    };

    loop {
        let save_deadline = surface.save_deadline();
        let close_at = surface.close_at();

        let save = tokio::select! {
            _ = cancel.cancelled() => {
                surface.close();
                None
            }
            Some((save, result)) = done_rx.recv() => {
                in_flight -= 1;
                surface.complete(save, result);
                None
            }
            event = events.recv() => match event {
                Some(event) => surface.handle(event, Instant::now()),
                None => {
                    surface.close();
                    None
                }
            },
            _ = sleep_until_some(save_deadline) => surface.poll(Instant::now()),
            _ = sleep_until_some(close_at) => {
                surface.close();
                None
            }
            _ = ticker.tick() => {
                surface.tick(Utc::now());
                None
            }
        };

        if let Some(save) = save {
            spawn_save(save);
            in_flight += 1;
        }
        view.send_replace(surface.view().clone());
        if surface.view().closed {
            break;
        }
    }

    while in_flight > 0 {
        let Some((save, result)) = done_rx.recv().await else {
            break;
        };
        in_flight -= 1;
        surface.complete(save, result);
        view.send_replace(surface.view().clone());
    }
    log_debug!("Inspector task for {record_id} finished");
}
