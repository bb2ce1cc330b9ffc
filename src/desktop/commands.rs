use chrono::Utc;
use tauri::State;

use super::AppState;
use crate::{
    inspector::SurfaceHandle,
    records::{CapabilityToken, LeadRecord},
    timezone::{SortDirection, ZoneView},
};

/// Open (or refocus) the inspector for a cached record. `token` is the session's
/// current bearer token; the surface keeps this copy for its whole lifetime.
#[tauri::command]
pub fn open_inspector(
    state: State<'_, AppState>,
    record_id: String,
    token: String,
) -> Result<SurfaceHandle, String> {
    let record = state
        .view
        .records()
        .get(&record_id)
        .ok_or_else(|| format!("Unknown record {record_id}"))?;
    let snapshot = state
        .snapshots
        .build(&record, CapabilityToken::new(token), Utc::now());
    state.factory.open(snapshot).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn arrange_records(
    state: State<'_, AppState>,
    filter: Option<String>,
    sort: Option<SortDirection>,
) -> Result<Vec<LeadRecord>, String> {
    Ok(state.view.displayed(&ZoneView { filter, sort }))
}

#[tauri::command]
pub fn zone_filter_options(state: State<'_, AppState>) -> Result<Vec<String>, String> {
    Ok(state.view.zone_filter_options())
}

#[tauri::command]
pub fn set_records(state: State<'_, AppState>, records: Vec<LeadRecord>) -> Result<(), String> {
    state.view.records().replace_all(records);
    Ok(())
}

/// `Some(id)` while the list view edits that record's notes inline, `None` after.
#[tauri::command]
pub fn set_notes_editing(
    state: State<'_, AppState>,
    record_id: Option<String>,
) -> Result<(), String> {
    match record_id {
        Some(record_id) => state.view.begin_notes_edit(record_id),
        None => state.view.end_notes_edit(),
    }
    Ok(())
}
