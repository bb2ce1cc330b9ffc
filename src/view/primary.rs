use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use uuid::Uuid;

use super::opener::OpenerRef;
use crate::{
    actions::{ActionRegistry, LeadActions},
    channel::{Delivery, Envelope, NotesEditState, PrimaryListener, RecordCache, SyncMessage},
    log_info,
    records::LeadRecord,
    timezone::{TimeZoneOrderingEngine, ZoneView},
};

const ENABLE_LOGS: bool = true;

/// The long-lived primary window. Outlives any single mount of the lead view and
/// is what detached surfaces hold (weakly) as their opener.
#[derive(Debug)]
pub struct PrimaryWindow {
    origin: String,
    registry: ActionRegistry,
    inbox: Mutex<Option<(Uuid, mpsc::UnboundedSender<Envelope>)>>,
}

impl PrimaryWindow {
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into(),
            registry: ActionRegistry::default(),
            inbox: Mutex::new(None),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Opener handed to a surface served from this window's origin.
    pub fn opener(self: &Arc<Self>) -> OpenerRef {
        OpenerRef::new(Arc::downgrade(self), self.origin.clone())
    }

    /// Opener for a surface served from some other origin.
    pub fn opener_from(self: &Arc<Self>, surface_origin: impl Into<String>) -> OpenerRef {
        OpenerRef::new(Arc::downgrade(self), surface_origin)
    }

    /// Queue an envelope for the mounted listener. `false` when no view is mounted.
    pub fn post_message(&self, envelope: Envelope) -> bool {
        let guard = match self.inbox.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some((_, sender)) => sender.send(envelope).is_ok(),
            None => false,
        }
    }

    fn attach_inbox(&self, generation: Uuid, sender: mpsc::UnboundedSender<Envelope>) {
        let mut guard = match self.inbox.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some((generation, sender));
    }

    fn detach_inbox(&self, generation: Uuid) {
        let mut guard = match self.inbox.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_ref().map(|(owner, _)| *owner) == Some(generation) {
            *guard = None;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLog {
    pub received: u64,
    pub last: Option<Delivery>,
}

/// One mounted lifetime of the lead list view.
///
/// Mounting registers the action set and starts the message listener; dropping
/// the view undoes both. Neither is re-registered per record or per surface.
pub struct PrimaryView {
    window: Arc<PrimaryWindow>,
    generation: Uuid,
    records: RecordCache,
    editing: NotesEditState,
    ordering: TimeZoneOrderingEngine,
    listener: JoinHandle<()>,
    deliveries: watch::Receiver<DeliveryLog>,
    applied: broadcast::Sender<SyncMessage>,
}

impl PrimaryView {
    /// Must be called from within a tokio runtime.
    pub fn mount(
        window: &Arc<PrimaryWindow>,
        actions: Arc<dyn LeadActions>,
        records: Vec<LeadRecord>,
        ordering: TimeZoneOrderingEngine,
    ) -> Self {
        let generation = window.registry().register(actions);
        let records = RecordCache::new(records);
        let editing = NotesEditState::default();
        let listener = PrimaryListener::new(window.origin(), records.clone(), editing.clone());

        let (sender, mut inbox) = mpsc::unbounded_channel::<Envelope>();
        let (log_tx, log_rx) = watch::channel(DeliveryLog::default());
        let (applied_tx, _) = broadcast::channel(64);
        let applied = applied_tx.clone();

        let handle = tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                let (delivery, message) = listener.handle(&envelope);
                if let (Delivery::Applied, Some(message)) = (delivery, message) {
                    let _ = applied.send(message);
                }
                log_tx.send_modify(|log| {
                    log.received += 1;
                    log.last = Some(delivery);
                });
            }
        });
        window.attach_inbox(generation, sender);
        log_info!("Lead view mounted on {}", window.origin());

        Self {
            window: window.clone(),
            generation,
            records,
            editing,
            ordering,
            listener: handle,
            deliveries: log_rx,
            applied: applied_tx,
        }
    }

    /// Explicit teardown; equivalent to dropping the view.
    pub fn unmount(self) {}

    pub fn window(&self) -> &Arc<PrimaryWindow> {
        &self.window
    }

    pub fn opener(&self) -> OpenerRef {
        self.window.opener()
    }

    pub fn records(&self) -> &RecordCache {
        &self.records
    }

    pub fn ordering(&self) -> &TimeZoneOrderingEngine {
        &self.ordering
    }

    pub fn begin_notes_edit(&self, record_id: impl Into<String>) {
        self.editing.begin(record_id);
    }

    pub fn end_notes_edit(&self) {
        self.editing.end();
    }

    /// The list as the user sees it: zone filter, then zone sort, as a fresh vector.
    pub fn displayed(&self, view: &ZoneView) -> Vec<LeadRecord> {
        self.ordering.arrange(&self.records.all(), view)
    }

    pub fn zone_filter_options(&self) -> Vec<String> {
        self.ordering
            .abbreviations()
            .iter()
            .map(|abbreviation| (*abbreviation).to_string())
            .collect()
    }

    /// Sync messages that were applied to the record cache, in arrival order.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncMessage> {
        self.applied.subscribe()
    }

    pub fn deliveries(&self) -> DeliveryLog {
        *self.deliveries.borrow()
    }

    /// Wait until the listener has processed at least `count` envelopes.
    pub async fn wait_for_deliveries(&self, count: u64) -> DeliveryLog {
        let mut receiver = self.deliveries.clone();
        let log = match receiver.wait_for(|log| log.received >= count).await {
            Ok(log) => *log,
            Err(_) => *self.deliveries.borrow(),
        };
        log
    }
}

impl Drop for PrimaryView {
    fn drop(&mut self) {
        self.window.registry().clear_if(self.generation);
        self.window.detach_inbox(self.generation);
        self.listener.abort();
        log_info!("Lead view unmounted from {}", self.window.origin());
    }
}
