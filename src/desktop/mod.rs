//! Tauri wiring: the primary view lives in the `main` webview, inspectors are
//! extra webview windows. Surfaces without a `window.opener` reach the primary
//! side through `inspector://sync` and `inspector://action` events.

pub mod commands;
mod host;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tauri::{AppHandle, Emitter, Listener, Manager, Runtime, Wry};

pub use host::TauriSurfaceHost;

use crate::{
    actions::{ActionInvocation, ActionName, LeadActions},
    channel::Envelope,
    inspector::DetachedSurfaceFactory,
    log_info, log_warn,
    records::{LeadRecord, RecordSnapshotBuilder, StandardPalette},
    settings::SettingsStore,
    timezone::{TimeZoneOrderingEngine, TimeZoneResolver},
    utils::init_logging,
    view::{PrimaryView, PrimaryWindow},
};

const ENABLE_LOGS: bool = true;

pub const MAIN_WINDOW: &str = "main";
pub const SYNC_EVENT: &str = "inspector://sync";
pub const ACTION_EVENT: &str = "inspector://action";
/// Emitted to the main window when an inspector asks for a lead action.
pub const LEAD_ACTION_EVENT: &str = "lead-inspector://action";
/// Emitted to the main window after a sync message changed the record cache.
pub const RECORD_UPDATED_EVENT: &str = "lead-inspector://record-updated";

pub struct AppState {
    pub(crate) view: PrimaryView,
    pub(crate) factory: DetachedSurfaceFactory<TauriSurfaceHost<Wry>>,
    pub(crate) snapshots: RecordSnapshotBuilder<StandardPalette>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadActionRequest<'a> {
    action_name: ActionName,
    record_id: &'a str,
    lead: Option<&'a LeadRecord>,
    phone: Option<&'a str>,
}

/// Forwards registry calls to the main window's frontend, which owns the modals
/// and dialer those actions open.
struct EmittingActions<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> EmittingActions<R> {
    fn emit(&self, request: LeadActionRequest<'_>) {
        if let Err(err) = self.app.emit_to(MAIN_WINDOW, LEAD_ACTION_EVENT, &request) {
            log_warn!("Failed to forward {}: {err}", request.action_name);
        }
    }

    fn for_lead(&self, action_name: ActionName, lead: &LeadRecord) {
        self.emit(LeadActionRequest {
            action_name,
            record_id: &lead.id,
            lead: Some(lead),
            phone: None,
        });
    }
}

impl<R: Runtime> LeadActions for EmittingActions<R> {
    fn dial(&self, phone: &str) {
        self.emit(LeadActionRequest {
            action_name: ActionName::Dial,
            record_id: "",
            lead: None,
            phone: Some(phone),
        });
    }

    fn edit_lead(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::EditLead, lead);
    }

    fn delete_lead(&self, record_id: &str) {
        self.emit(LeadActionRequest {
            action_name: ActionName::DeleteLead,
            record_id,
            lead: None,
            phone: None,
        });
    }

    fn send_to_spreadsheet(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::SendToSpreadsheet, lead);
    }

    fn book_appointment(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::BookAppointment, lead);
    }

    fn add_reminder(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::AddReminder, lead);
    }

    fn add_to_campaign(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::AddToCampaign, lead);
    }

    fn quick_message(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::QuickMessage, lead);
    }

    fn referral(&self, lead: &LeadRecord) {
        self.for_lead(ActionName::Referral, lead);
    }
}

fn listen_for_surfaces(app: &AppHandle<Wry>, window: &Arc<PrimaryWindow>) {
    let sync_window = Arc::downgrade(window);
    app.listen_any(SYNC_EVENT, move |event| {
        let Some(window) = sync_window.upgrade() else {
            return;
        };
        match serde_json::from_str::<serde_json::Value>(event.payload()) {
            Ok(data) => {
                window.post_message(Envelope::raw(window.origin(), data));
            }
            Err(err) => log_warn!("Unreadable {SYNC_EVENT} payload: {err}"),
        }
    });

    let opener = window.opener();
    app.listen_any(ACTION_EVENT, move |event| {
        match serde_json::from_str::<ActionInvocation>(event.payload()) {
            Ok(invocation) => {
                opener.invoke(&invocation);
            }
            Err(err) => log_warn!("Unreadable {ACTION_EVENT} payload: {err}"),
        }
    });
}

fn forward_updates(app: AppHandle<Wry>, view: &PrimaryView) {
    let mut updates = view.subscribe();
    tauri::async_runtime::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(message) => {
                    let _ = app.emit_to(MAIN_WINDOW, RECORD_UPDATED_EVENT, &message);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log_warn!("Dropped {skipped} record updates for the main window");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn setup(app: &mut tauri::App<Wry>) -> Result<()> {
    let app_data_dir = app
        .path()
        .app_data_dir()
        .map_err(|err| anyhow::anyhow!(err))?;
    std::fs::create_dir_all(&app_data_dir)?;

    let settings = SettingsStore::new(app_data_dir.join("inspector-settings.json"))?;
    let current = settings.current();

    let window = PrimaryWindow::new(current.app_origin.clone());
    let actions = Arc::new(EmittingActions {
        app: app.handle().clone(),
    });
    let ordering =
        TimeZoneOrderingEngine::new(TimeZoneResolver::from_zone_name(&current.fallback_zone));
    let view = tauri::async_runtime::block_on(async {
        PrimaryView::mount(&window, actions, Vec::new(), ordering)
    });

    listen_for_surfaces(app.handle(), &window);
    forward_updates(app.handle().clone(), &view);

    let factory = DetachedSurfaceFactory::new(
        TauriSurfaceHost::new(app.handle().clone()),
        window.opener(),
        &current,
    );
    app.manage(AppState {
        snapshots: RecordSnapshotBuilder::new(StandardPalette, &current),
        view,
        factory,
    });
    log_info!("Lead inspector ready on {}", current.app_origin);
    Ok(())
}

/// Attach the inspector to an app builder. The host binary supplies the context
/// and calls `run`.
pub fn install(builder: tauri::Builder<Wry>) -> tauri::Builder<Wry> {
    init_logging();
    builder
        .setup(|app| setup(app).map_err(|err| err.into()))
        .invoke_handler(tauri::generate_handler![
            commands::open_inspector,
            commands::arrange_records,
            commands::zone_filter_options,
            commands::set_records,
            commands::set_notes_editing,
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SyncMessage;
    use serde_json::json;

    #[test]
    fn lead_action_request_shape() {
        let lead = LeadRecord::new("r1", "Ada");
        let request = LeadActionRequest {
            action_name: ActionName::AddToCampaign,
            record_id: &lead.id,
            lead: Some(&lead),
            phone: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["actionName"], "addToCampaign");
        assert_eq!(value["recordId"], "r1");
        assert_eq!(value["lead"]["_id"], "r1");
        assert_eq!(value["phone"], json!(null));
    }

    #[test]
    fn sync_payload_decodes_into_a_message() {
        let payload = r#"{"type":"notesUpdated","recordId":"r1","notes":"hi"}"#;
        let data: serde_json::Value = serde_json::from_str(payload).unwrap();
        let envelope = Envelope::raw("http://localhost:5173", data);
        assert_eq!(envelope.decode(), Some(SyncMessage::notes("r1", "hi")));
    }
}
