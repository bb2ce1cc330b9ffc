use std::{
    fmt,
    str::FromStr,
    sync::{Arc, RwLock},
};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::records::LeadRecord;
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionName {
    Dial,
    EditLead,
    DeleteLead,
    SendToSpreadsheet,
    BookAppointment,
    AddReminder,
    AddToCampaign,
    QuickMessage,
    Referral,
}

impl ActionName {
    pub const ALL: [ActionName; 9] = [
        ActionName::Dial,
        ActionName::EditLead,
        ActionName::DeleteLead,
        ActionName::SendToSpreadsheet,
        ActionName::BookAppointment,
        ActionName::AddReminder,
        ActionName::AddToCampaign,
        ActionName::QuickMessage,
        ActionName::Referral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::Dial => "dial",
            ActionName::EditLead => "editLead",
            ActionName::DeleteLead => "deleteLead",
            ActionName::SendToSpreadsheet => "sendToSpreadsheet",
            ActionName::BookAppointment => "bookAppointment",
            ActionName::AddReminder => "addReminder",
            ActionName::AddToCampaign => "addToCampaign",
            ActionName::QuickMessage => "quickMessage",
            ActionName::Referral => "referral",
        }
    }

    /// Actions that hand the lead off to another flow; the surface closes after them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionName::BookAppointment
                | ActionName::AddToCampaign
                | ActionName::QuickMessage
                | ActionName::Referral
        )
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| anyhow!("unknown action '{value}'"))
    }
}

/// A named call from a surface into the primary view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInvocation {
    pub action_name: ActionName,
    pub record_id: String,
    pub payload: Value,
}

impl ActionInvocation {
    pub fn for_lead(action_name: ActionName, lead: &LeadRecord) -> Self {
        let payload = match action_name {
            ActionName::Dial => json!({ "phone": lead.phone.clone().unwrap_or_default() }),
            ActionName::DeleteLead => json!({ "_id": lead.id }),
            _ => serde_json::to_value(lead).unwrap_or(Value::Null),
        };
        Self {
            action_name,
            record_id: lead.id.clone(),
            payload,
        }
    }
}

/// The action set the primary view implements. Injected, never looked up globally.
pub trait LeadActions: Send + Sync {
    fn dial(&self, phone: &str);
    fn edit_lead(&self, lead: &LeadRecord);
    fn delete_lead(&self, record_id: &str);
    fn send_to_spreadsheet(&self, lead: &LeadRecord);
    fn book_appointment(&self, lead: &LeadRecord);
    fn add_reminder(&self, lead: &LeadRecord);
    fn add_to_campaign(&self, lead: &LeadRecord);
    fn quick_message(&self, lead: &LeadRecord);
    fn referral(&self, lead: &LeadRecord);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Dispatch {
    Invoked,
    /// The primary view is not mounted; the call is skipped.
    NotRegistered,
    BadPayload,
}

struct Registration {
    generation: Uuid,
    actions: Arc<dyn LeadActions>,
}

/// The primary view's action table. Filled on mount, emptied on unmount; a later
/// mount overwrites an earlier one.
#[derive(Default)]
pub struct ActionRegistry {
    current: RwLock<Option<Registration>>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl ActionRegistry {
    /// Install `actions`, replacing whatever was there. The returned generation lets
    /// the mounting view clear only its own registration.
    pub fn register(&self, actions: Arc<dyn LeadActions>) -> Uuid {
        let generation = Uuid::new_v4();
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Registration {
            generation,
            actions,
        });
        generation
    }

    pub fn clear_if(&self, generation: Uuid) -> bool {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_ref().map(|r| r.generation) == Some(generation) {
            *guard = None;
            true
        } else {
            false
        }
    }

    pub fn is_registered(&self) -> bool {
        match self.current.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    pub fn dispatch(&self, invocation: &ActionInvocation) -> Dispatch {
        let actions = {
            let guard = match self.current.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.as_ref() {
                Some(registration) => registration.actions.clone(),
                None => {
                    log_debug!(
                        "Skipping {} for {}: no primary view mounted",
                        invocation.action_name,
                        invocation.record_id
                    );
                    return Dispatch::NotRegistered;
                }
            }
        };

        let lead = || -> Option<LeadRecord> {
            let mut lead: LeadRecord = serde_json::from_value(invocation.payload.clone()).ok()?;
            if lead.id.is_empty() {
                lead.id = invocation.record_id.clone();
            }
            Some(lead)
        };

        match invocation.action_name {
            ActionName::Dial => match invocation.payload.get("phone").and_then(Value::as_str) {
                Some(phone) => actions.dial(phone),
                None => return bad_payload(invocation),
            },
            ActionName::DeleteLead => actions.delete_lead(&invocation.record_id),
            name => {
                let Some(lead) = lead() else {
                    return bad_payload(invocation);
                };
                match name {
                    ActionName::EditLead => actions.edit_lead(&lead),
                    ActionName::SendToSpreadsheet => actions.send_to_spreadsheet(&lead),
                    ActionName::BookAppointment => actions.book_appointment(&lead),
                    ActionName::AddReminder => actions.add_reminder(&lead),
                    ActionName::AddToCampaign => actions.add_to_campaign(&lead),
                    ActionName::QuickMessage => actions.quick_message(&lead),
                    ActionName::Referral => actions.referral(&lead),
                    ActionName::Dial | ActionName::DeleteLead => {}
                }
            }
        }

        Dispatch::Invoked
    }
}

fn bad_payload(invocation: &ActionInvocation) -> Dispatch {
    log_warn!(
        "Ignoring {} for {}: payload does not fit the action",
        invocation.action_name,
        invocation.record_id
    );
    Dispatch::BadPayload
}
