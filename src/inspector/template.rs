//! Self-contained inspector document.
//!
//! [`render`] turns a snapshot into one HTML string: markup, styling and inline
//! behavior, with the snapshot embedded as JSON. The document needs nothing from
//! the primary view at runtime besides the opener reference it may or may not have.

use serde::Serialize;

use super::surface::{SurfaceButton, SurfaceTiming, HANG_UP_NOTICE};
use crate::{actions::ActionName, records::LeadRecord, records::RecordSnapshot};

const BOOTSTRAP_ID: &str = "inspector-bootstrap";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Bootstrap<'a> {
    record_id: &'a str,
    lead: &'a LeadRecord,
    token: &'a str,
    api_base: &'a str,
    app_origin: &'a str,
    zone: &'a str,
    zone_abbreviation: &'a str,
    colors: Vec<(&'a str, &'a str)>,
    default_color: &'a str,
    debounce_ms: u64,
    close_delay_ms: u64,
    clock_refresh_ms: u64,
    buttons: Vec<ButtonBinding>,
    hang_up_notice: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ButtonBinding {
    id: &'static str,
    action: Option<ActionName>,
    terminal: bool,
}

pub fn render(snapshot: &RecordSnapshot) -> String {
    render_with(snapshot, &SurfaceTiming::default())
}

pub fn render_with(snapshot: &RecordSnapshot, timing: &SurfaceTiming) -> String {
    let record = snapshot.record();
    let mut doc = String::with_capacity(16 * 1024);

    doc.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\" />");
    doc.push_str(&format!(
        "<title>Lead Details: {}</title>",
        escape_html(&record.name)
    ));
    doc.push_str("<style>");
    doc.push_str(&format!(
        ":root{{--card-accent:{};--card-text:{};}}",
        escape_css_color(snapshot.color()),
        super::surface::text_color_for(snapshot.color())
    ));
    doc.push_str(STYLE);
    doc.push_str("</style></head><body><div class=\"frame\">");

    doc.push_str("<div class=\"header\"><h1>");
    if let Some(badge) = source_badge(record.source.as_deref()) {
        doc.push_str(&format!(
            "<img id=\"source-icon\" class=\"source-icon\" src=\"{badge}\" alt=\"{}\" />",
            escape_html(record.source.as_deref().unwrap_or_default())
        ));
    }
    doc.push_str(&escape_html(&record.name));
    doc.push_str("</h1></div>");

    doc.push_str("<div class=\"content\"><div class=\"details-grid\">");
    let display = snapshot.display();
    let cells: [(&str, &str, &str); 9] = [
        ("Name", &record.name, &record.name),
        ("Email", opt(&record.email), opt(&record.email)),
        ("Phone", opt(&record.phone), &display.phone),
        ("Zipcode", opt(&record.zipcode), opt(&record.zipcode)),
        ("DOB", opt(&record.dob), &display.dob),
        ("Height", opt(&record.height), &display.height),
        ("Weight", opt(&record.weight), opt(&record.weight)),
        ("Gender", opt(&record.gender), opt(&record.gender)),
        ("State", opt(&record.state), opt(&record.state)),
    ];
    for (field, _, _) in &cells {
        doc.push_str(&format!("<div class=\"header-cell\">{field}</div>"));
    }
    doc.push_str("<div class=\"header-cell\">Disposition</div>");
    for (field, raw, shown) in &cells {
        let shown: &str = if shown.is_empty() { "-" } else { *shown };
        doc.push_str(&format!(
            "<div class=\"value-cell\" data-copy=\"{}\" data-field=\"{field}\" title=\"Click to copy\">{}</div>",
            escape_html(raw),
            escape_html(shown)
        ));
    }
    doc.push_str(
        "<div class=\"value-cell disposition-wrapper\"><select id=\"disposition-select\" class=\"disposition-select\">",
    );
    for option in snapshot.dispositions() {
        let name = escape_html(&option.name);
        let selected = if option.selected { " selected" } else { "" };
        doc.push_str(&format!(
            "<option value=\"{name}\"{selected}>{name}</option>"
        ));
    }
    doc.push_str(
        "</select><span id=\"disposition-status\" class=\"save-status\"></span></div></div>",
    );

    doc.push_str("<div class=\"notes-bar\">Notes: <span id=\"save-status\" class=\"save-status\"></span></div>");
    doc.push_str(&format!(
        "<div class=\"notes-section\"><textarea id=\"notes-textarea\" class=\"notes-textarea\" placeholder=\"Add notes...\">{}</textarea></div>",
        escape_html(opt(&record.notes))
    ));

    doc.push_str("<div class=\"footer\"><div class=\"call-controls\">");
    for button in [SurfaceButton::Call, SurfaceButton::HangUp] {
        doc.push_str(&format!(
            "<button id=\"{}\" class=\"{}\">{}</button>",
            button.element_id(),
            button.element_id(),
            button.label()
        ));
    }
    doc.push_str("</div><div class=\"footer-right\"><div id=\"local-time-display\" class=\"clock\"></div>");
    doc.push_str(
        "<div class=\"actions-menu-container\"><button id=\"actions-menu-btn\" class=\"quick-btn\" title=\"More Actions\">&#8942;</button><div id=\"actions-dropdown\" class=\"actions-dropdown\">",
    );
    for button in SurfaceButton::ALL {
        match button {
            SurfaceButton::Call | SurfaceButton::HangUp => {}
            SurfaceButton::Delete => doc.push_str(&format!(
                "<div class=\"menu-divider\"></div><button id=\"{}\" class=\"actions-dropdown-item danger\">{}</button>",
                button.element_id(),
                button.label()
            )),
            _ => doc.push_str(&format!(
                "<button id=\"{}\" class=\"actions-dropdown-item\">{}</button>",
                button.element_id(),
                button.label()
            )),
        }
    }
    doc.push_str("</div></div></div></div></div></div>");

    doc.push_str(&format!(
        "<script id=\"{BOOTSTRAP_ID}\" type=\"application/json\">{}</script>",
        bootstrap_json(snapshot, timing)
    ));
    doc.push_str("<script>");
    doc.push_str(BEHAVIOR);
    doc.push_str("</script></body></html>");
    doc
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn source_badge(source: Option<&str>) -> Option<&'static str> {
    match source {
        Some("NextGen") => Some("/images/nextgen.png"),
        Some("Marketplace") => Some("/images/marketplace.png"),
        _ => None,
    }
}

fn bootstrap_json(snapshot: &RecordSnapshot, timing: &SurfaceTiming) -> String {
    let bootstrap = Bootstrap {
        record_id: snapshot.record_id(),
        lead: snapshot.record(),
        token: snapshot.token().as_str(),
        api_base: snapshot.api_base_url(),
        app_origin: snapshot.app_origin(),
        zone: snapshot.zone(),
        zone_abbreviation: snapshot.zone_abbreviation(),
        colors: snapshot
            .dispositions()
            .iter()
            .map(|option| (option.name.as_str(), option.color.as_str()))
            .collect(),
        default_color: snapshot.default_color(),
        debounce_ms: timing.notes_debounce.as_millis() as u64,
        close_delay_ms: timing.terminal_close_delay.as_millis() as u64,
        clock_refresh_ms: timing.clock_refresh.as_millis() as u64,
        buttons: SurfaceButton::ALL
            .iter()
            .map(|button| ButtonBinding {
                id: button.element_id(),
                action: button.action(),
                terminal: button.action().is_some_and(|action| action.is_terminal()),
            })
            .collect(),
        hang_up_notice: HANG_UP_NOTICE,
    };
    let json = serde_json::to_string(&bootstrap).unwrap_or_else(|_| "{}".to_string());
    escape_script_json(&json)
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON placed inside a `<script>` element must not be able to close it.
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn escape_css_color(color: &str) -> &str {
    if color
        .chars()
        .all(|ch| ch == '#' || ch.is_ascii_alphanumeric())
    {
        color
    } else {
        "#FFFFFF"
    }
}

const STYLE: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
html,body{height:100%;display:flex;flex-direction:column;background:var(--card-accent)}
body{font-family:'Tektur','Inter',-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Arial,sans-serif;min-width:920px;min-height:400px}
.frame{box-shadow:0 0 0 6px var(--card-accent);flex:1;display:flex;flex-direction:column}
.header{background:#000;color:#fff;padding:6px 12px;display:flex;align-items:center;border-bottom-left-radius:8px;border-bottom-right-radius:8px}
.header h1{font-size:18px;font-weight:600;letter-spacing:1.2px}
.source-icon{height:20px;margin-right:8px;vertical-align:middle}
.content{flex:1;display:flex;flex-direction:column}
.details-grid{display:grid;grid-template-columns:2fr 2fr 1.5fr 1fr 1fr 1fr 1fr 1fr 1fr 1.5fr;gap:6px 8px;padding:12px 12px 0 12px}
.header-cell{background:#000;color:#fff;padding:2px 6px;font-size:10px;text-transform:uppercase;border-radius:2px;text-align:center}
.value-cell{background:#fff;color:#000;border:1px solid #000;font-size:14px;font-weight:600;cursor:pointer;border-radius:6px;display:flex;align-items:center;justify-content:center}
.value-cell:hover{background:#f3f3f3;color:#f97316}
.disposition-wrapper{background:transparent;border:none}
.disposition-select{background:#fff;color:#000;width:100%;padding:4px;border:1px solid #000;border-radius:4px;font-size:14px}
.notes-bar{color:var(--card-text);font-weight:600;padding:6px 10px;font-size:16px}
.save-status{font-size:12px;margin-left:8px}
.save-status.saved{color:#4CAF50}.save-status.error{color:#f44336}
.notes-section{flex:1;display:flex;flex-direction:column;padding:0 12px 20px 12px}
.notes-textarea{flex:1;background:#fff;border:1px solid #444;border-radius:4px;padding:15px;color:#000;font-size:14px;line-height:1.6;resize:none;font-family:inherit}
.notes-textarea:focus{outline:none;border-color:#ff9800}
.footer{color:var(--card-text);padding:10px 20px;display:flex;justify-content:space-between;align-items:center}
.call-controls,.footer-right{display:flex;gap:10px;align-items:center}
.call-btn,.hangup-btn{color:#fff;border:0;border-radius:6px;padding:8px 16px;min-width:120px;cursor:pointer;font-weight:600}
.call-btn{background:#28a745}.hangup-btn{background:#dc3545}
.clock{font-weight:bold;font-size:14px}
.actions-menu-container{position:relative}
.quick-btn{background:#fff;border:1px solid #000;border-radius:6px;padding:4px 10px;cursor:pointer}
.actions-dropdown{display:none;position:absolute;right:0;bottom:calc(100% + 5px);background:#fff;min-width:220px;box-shadow:0 4px 12px rgba(0,0,0,.15);border-radius:8px;padding:8px 0;z-index:1000}
.actions-dropdown.visible{display:block}
.actions-dropdown-item{color:#4a5568;padding:10px 16px;display:block;width:100%;text-align:left;border:none;background:none;font-size:14px;cursor:pointer}
.actions-dropdown-item:hover{background:rgba(74,85,104,.08)}
.actions-dropdown-item.danger{color:#e53e3e}
.menu-divider{height:1px;background:rgba(0,0,0,.08);margin:8px 0}
.toast{position:fixed;bottom:20px;left:50%;transform:translateX(-50%);background:#38A169;color:#fff;padding:10px 20px;border-radius:5px;z-index:9999;transition:opacity .5s}
"#;

const BEHAVIOR: &str = r#"
(function () {
  var boot = JSON.parse(document.getElementById('inspector-bootstrap').textContent);
  var tauriEvent = window.__TAURI__ && window.__TAURI__.event;
  var colors = {};
  boot.colors.forEach(function (pair) { colors[pair[0]] = pair[1]; });

  function openerAlive() {
    try { return !!window.opener && !window.opener.closed; } catch (e) { return false; }
  }

  function toast(text) {
    var el = document.createElement('div');
    el.className = 'toast';
    el.textContent = text;
    document.body.appendChild(el);
    setTimeout(function () {
      el.style.opacity = '0';
      setTimeout(function () { el.remove(); }, 500);
    }, 1500);
  }

  function notifyOpener(message) {
    if (openerAlive()) {
      window.opener.postMessage(message, boot.appOrigin);
    } else if (tauriEvent) {
      tauriEvent.emitTo('main', 'inspector://sync', message);
    }
  }

  function payloadFor(actionName) {
    if (actionName === 'dial') return { phone: boot.lead.phone || '' };
    if (actionName === 'deleteLead') return { _id: boot.recordId };
    return boot.lead;
  }

  function invokeOpener(actionName) {
    var invocation = { actionName: actionName, recordId: boot.recordId, payload: payloadFor(actionName) };
    if (openerAlive()) {
      var registry = null;
      try {
        if (window.opener.location.origin === boot.appOrigin) registry = window.opener.leadInspectorActions;
      } catch (e) { registry = null; }
      if (registry && typeof registry[actionName] === 'function') {
        registry[actionName](invocation.payload);
        return true;
      }
      return false;
    }
    if (tauriEvent) {
      tauriEvent.emitTo('main', 'inspector://action', invocation);
      return true;
    }
    return false;
  }

  function putRecord(patch) {
    return fetch(boot.apiBase + '/records/' + encodeURIComponent(boot.recordId), {
      method: 'PUT',
      headers: { 'Content-Type': 'application/json', Authorization: 'Bearer ' + boot.token },
      body: JSON.stringify(patch)
    }).then(function (r) {
      if (!r.ok) throw new Error('HTTP ' + r.status);
      return r.json().catch(function () { return null; });
    });
  }

  document.querySelectorAll('[data-copy]').forEach(function (cell) {
    cell.addEventListener('click', function () {
      var text = cell.getAttribute('data-copy');
      if (!text || !navigator.clipboard) return;
      navigator.clipboard.writeText(text).then(function () {
        toast(cell.getAttribute('data-field') + ' copied!');
      });
    });
  });

  function paint(color) {
    var light = color === '#FFFFFF' || color === '#E6F0F5';
    document.documentElement.style.setProperty('--card-accent', color);
    document.documentElement.style.setProperty('--card-text', light ? '#000' : '#fff');
  }

  function showStatus(el, label) {
    el.textContent = label;
    el.className = 'save-status ' + label.toLowerCase();
  }

  var dispositionSelect = document.getElementById('disposition-select');
  var dispositionStatus = document.getElementById('disposition-status');
  dispositionSelect.addEventListener('change', function (e) {
    var disposition = e.target.value;
    paint(colors[disposition] || boot.defaultColor);
    showStatus(dispositionStatus, 'Saving');
    putRecord({ disposition: disposition }).then(function () {
      showStatus(dispositionStatus, 'Saved');
      notifyOpener({ type: 'dispositionUpdated', recordId: boot.recordId, disposition: disposition });
    }).catch(function () {
      showStatus(dispositionStatus, 'Error');
    });
  });

  var notes = document.getElementById('notes-textarea');
  var status = document.getElementById('save-status');
  var saved = boot.lead.notes || '';
  var saving = false;
  var again = false;
  var timer = null;

  function saveNotes() {
    clearTimeout(timer);
    timer = null;
    if (saving) { again = true; return; }
    var text = notes.value;
    if (text === saved) return;
    saving = true;
    showStatus(status, 'Saving');
    putRecord({ notes: text }).then(function () {
      saved = text;
      showStatus(status, 'Saved');
      notifyOpener({ type: 'notesUpdated', recordId: boot.recordId, notes: text });
    }).catch(function () {
      showStatus(status, 'Error');
    }).then(function () {
      saving = false;
      if (again) { again = false; saveNotes(); }
    });
  }

  notes.addEventListener('input', function () {
    clearTimeout(timer);
    timer = setTimeout(saveNotes, boot.debounceMs);
  });
  notes.addEventListener('blur', saveNotes);

  var clock = document.getElementById('local-time-display');
  var clockFormat = new Intl.DateTimeFormat('en-US', { timeZone: boot.zone, hour: '2-digit', minute: '2-digit', hour12: true });
  function tick() {
    clock.textContent = clockFormat.format(new Date()).replace(' AM', 'AM').replace(' PM', 'PM') + ' ' + boot.zoneAbbreviation;
  }
  tick();
  setInterval(tick, boot.clockRefreshMs);

  var menuButton = document.getElementById('actions-menu-btn');
  var dropdown = document.getElementById('actions-dropdown');
  menuButton.addEventListener('click', function (event) {
    event.stopPropagation();
    dropdown.classList.toggle('visible');
  });
  document.addEventListener('click', function (event) {
    if (!menuButton.contains(event.target) && !dropdown.contains(event.target)) {
      dropdown.classList.remove('visible');
    }
  });

  boot.buttons.forEach(function (binding) {
    var button = document.getElementById(binding.id);
    if (!button) return;
    button.addEventListener('click', function () {
      dropdown.classList.remove('visible');
      if (!binding.action) { toast(boot.hangUpNotice); return; }
      if (invokeOpener(binding.action) && binding.terminal) {
        setTimeout(function () { window.close(); }, boot.closeDelayMs);
      }
    });
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::snapshot::tests::{sample_lead, sample_snapshot};
    use crate::records::{CapabilityToken, RecordSnapshotBuilder, StandardPalette};
    use crate::settings::InspectorSettings;
    use chrono::Utc;
    use std::time::Duration;

    fn bootstrap_of(document: &str) -> serde_json::Value {
        let start_tag = format!("<script id=\"{BOOTSTRAP_ID}\" type=\"application/json\">");
        let start = document.find(&start_tag).unwrap() + start_tag.len();
        let end = start + document[start..].find("</script>").unwrap();
        serde_json::from_str(&document[start..end]).unwrap()
    }

    #[test]
    fn document_is_complete_and_self_contained() {
        let document = render(&sample_snapshot());
        assert!(document.starts_with("<!DOCTYPE html>"));
        assert!(document.ends_with("</html>"));
        assert!(!document.contains("<script src"));
        assert!(!document.contains("import "));
        assert!(document.contains("<title>Lead Details: Ada Lovelace</title>"));
    }

    #[test]
    fn fields_are_copy_targets() {
        let document = render(&sample_snapshot());
        assert!(document.contains(
            "data-copy=\"5551234567\" data-field=\"Phone\" title=\"Click to copy\">(555) 123-4567</div>"
        ));
        assert!(document.contains("data-field=\"DOB\" title=\"Click to copy\">04/09/1980</div>"));
        assert!(document.contains("<textarea id=\"notes-textarea\" class=\"notes-textarea\" placeholder=\"Add notes...\">called twice</textarea>"));
    }

    #[test]
    fn selector_preselects_the_current_disposition() {
        let document = render(&sample_snapshot());
        assert!(document.contains("<option value=\"Quoted\" selected>Quoted</option>"));
        assert!(document.contains("<option value=\"SOLD\">SOLD</option>"));
        assert_eq!(document.matches(" selected>").count(), 1);
    }

    #[test]
    fn disposition_save_reports_inline_status() {
        let document = render(&sample_snapshot());
        assert!(document.contains(
            "</select><span id=\"disposition-status\" class=\"save-status\"></span>"
        ));
        assert!(document.contains("showStatus(dispositionStatus, 'Saving')"));
        assert!(document.contains("showStatus(dispositionStatus, 'Error')"));
        assert!(!document.contains("toast('Error')"));
    }

    #[test]
    fn every_button_is_present_and_delete_is_separated() {
        let document = render(&sample_snapshot());
        for button in SurfaceButton::ALL {
            assert!(
                document.contains(&format!("id=\"{}\"", button.element_id())),
                "missing {}",
                button.element_id()
            );
        }
        assert!(document.contains(
            "<div class=\"menu-divider\"></div><button id=\"delete-lead-action\" class=\"actions-dropdown-item danger\">"
        ));
    }

    #[test]
    fn bootstrap_carries_snapshot_and_timing() {
        let timing = SurfaceTiming {
            notes_debounce: Duration::from_millis(200),
            ..SurfaceTiming::default()
        };
        let boot = bootstrap_of(&render_with(&sample_snapshot(), &timing));
        assert_eq!(boot["recordId"], "lead-1");
        assert_eq!(boot["token"], "tok-123");
        assert_eq!(boot["apiBase"], "http://localhost:3005/api");
        assert_eq!(boot["appOrigin"], "http://localhost:5173");
        assert_eq!(boot["zone"], "America/Chicago");
        assert_eq!(boot["zoneAbbreviation"], "CDT");
        assert_eq!(boot["debounceMs"], 200);
        assert_eq!(boot["closeDelayMs"], 50);
        assert_eq!(boot["lead"]["_id"], "lead-1");

        let terminal: Vec<_> = boot["buttons"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|b| b["terminal"] == true)
            .map(|b| b["action"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            terminal,
            vec!["bookAppointment", "addToCampaign", "quickMessage", "referral"]
        );
    }

    #[test]
    fn behavior_targets_the_record_endpoint() {
        let document = render(&sample_snapshot());
        assert!(document.contains("boot.apiBase + '/records/' + encodeURIComponent(boot.recordId)"));
        assert!(document.contains("Authorization: 'Bearer ' + boot.token"));
        assert!(document.contains("window.opener.postMessage(message, boot.appOrigin)"));
    }

    #[test]
    fn hostile_values_cannot_break_out() {
        let mut lead = sample_lead();
        lead.name = "<script>alert('x')</script>".into();
        lead.notes = Some("</textarea><script>bad()</script>".into());
        let snapshot = RecordSnapshotBuilder::new(StandardPalette, &InspectorSettings::default())
            .build(&lead, CapabilityToken::new("t"), Utc::now());
        let document = render(&snapshot);

        assert!(!document.contains("<script>alert"));
        assert!(!document.contains("</textarea><script>"));
        assert!(document.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert_eq!(document.matches("</script>").count(), 2);
        assert_eq!(bootstrap_of(&document)["lead"]["name"], "<script>alert('x')</script>");
    }

    #[test]
    fn source_badge_only_for_known_sources() {
        assert!(render(&sample_snapshot()).contains("src=\"/images/nextgen.png\""));

        let mut lead = sample_lead();
        lead.source = Some("Referral".into());
        let snapshot = RecordSnapshotBuilder::new(StandardPalette, &InspectorSettings::default())
            .build(&lead, CapabilityToken::new("t"), Utc::now());
        assert!(!render(&snapshot).contains("source-icon\" src"));
    }

    #[test]
    fn rendering_is_pure() {
        let snapshot = sample_snapshot();
        assert_eq!(render(&snapshot), render(&snapshot));
    }
}
