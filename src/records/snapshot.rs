use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    dispositions::DispositionPalette,
    format::{format_date, format_height, format_phone},
    model::LeadRecord,
};
use crate::{
    settings::InspectorSettings,
    timezone::{abbreviation_at, TimeZoneResolver},
};

/// Short-lived bearer credential captured when the snapshot is built.
///
/// Never refreshed: if the session rotates its token, writes from an already open
/// surface start failing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityToken(String);

impl CapabilityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapabilityToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableDisposition {
    pub name: String,
    pub color: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub phone: String,
    pub dob: String,
    pub height: String,
}

/// Frozen copy of one lead plus everything the inspector needs to render it
/// without talking to the primary view again.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    record: LeadRecord,
    display: DisplayFields,
    color: String,
    default_color: String,
    zone: String,
    zone_abbreviation: String,
    dispositions: Vec<SelectableDisposition>,
    token: CapabilityToken,
    api_base_url: String,
    app_origin: String,
    created_at: DateTime<Utc>,
}

impl RecordSnapshot {
    pub fn record(&self) -> &LeadRecord {
        &self.record
    }

    pub fn record_id(&self) -> &str {
        &self.record.id
    }

    pub fn display(&self) -> &DisplayFields {
        &self.display
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    /// Color for a disposition name, using only what was embedded at build time.
    pub fn color_for(&self, disposition: &str) -> &str {
        self.dispositions
            .iter()
            .find(|option| option.name == disposition)
            .map(|option| option.color.as_str())
            .unwrap_or(&self.default_color)
    }

    /// IANA zone name, e.g. `America/Chicago`.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn zone_abbreviation(&self) -> &str {
        &self.zone_abbreviation
    }

    pub fn dispositions(&self) -> &[SelectableDisposition] {
        &self.dispositions
    }

    pub fn token(&self) -> &CapabilityToken {
        &self.token
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn app_origin(&self) -> &str {
        &self.app_origin
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builds snapshots from live records. Pure: the record is only read.
pub struct RecordSnapshotBuilder<P> {
    palette: P,
    resolver: TimeZoneResolver,
    api_base_url: String,
    app_origin: String,
}

impl<P: DispositionPalette> RecordSnapshotBuilder<P> {
    pub fn new(palette: P, settings: &InspectorSettings) -> Self {
        Self {
            palette,
            resolver: TimeZoneResolver::from_zone_name(&settings.fallback_zone),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            app_origin: settings.app_origin.clone(),
        }
    }

    pub fn build(
        &self,
        record: &LeadRecord,
        token: CapabilityToken,
        now: DateTime<Utc>,
    ) -> RecordSnapshot {
        let current = record.disposition.clone().unwrap_or_default();
        let zone = self
            .resolver
            .zone_for(record.time_zone.as_deref(), record.zipcode.as_deref());

        let mut dispositions: Vec<SelectableDisposition> = self
            .palette
            .options()
            .into_iter()
            .map(|option| SelectableDisposition {
                selected: option.name == current,
                name: option.name,
                color: option.color,
            })
            .collect();
        if !current.is_empty() && !dispositions.iter().any(|option| option.selected) {
            dispositions.insert(
                0,
                SelectableDisposition {
                    name: current.clone(),
                    color: self.palette.color_for(&current),
                    selected: true,
                },
            );
        }

        RecordSnapshot {
            record: record.clone(),
            display: DisplayFields {
                phone: format_phone(record.phone.as_deref().unwrap_or_default()),
                dob: format_date(record.dob.as_deref().unwrap_or_default()),
                height: format_height(record.height.as_deref().unwrap_or_default()),
            },
            color: self.palette.color_for(&current),
            default_color: self.palette.default_color(),
            zone: zone.name().to_string(),
            zone_abbreviation: abbreviation_at(zone, now),
            dispositions,
            token,
            api_base_url: self.api_base_url.clone(),
            app_origin: self.app_origin.clone(),
            created_at: now,
        }
    }
}
