use anyhow::{anyhow, Context, Result};
use tauri::{AppHandle, Manager, Runtime, WebviewUrl, WebviewWindowBuilder};

use crate::{
    inspector::{SurfaceHost, SurfaceLaunch},
    log_debug,
};

const ENABLE_LOGS: bool = true;

/// Page every inspector window starts from before its document is written in.
/// Keeps the window on the app's own origin so `fetch` and the event bridge work.
const SHELL_PAGE: &str = "index.html";

/// Inspector surfaces as Tauri webview windows, one per label.
pub struct TauriSurfaceHost<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriSurfaceHost<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

/// Script that replaces the shell page with the rendered inspector document.
fn injection_script(document: &str) -> Result<String> {
    let literal = serde_json::to_string(document).context("Failed to encode inspector document")?;
    Ok(format!(
        "document.addEventListener('DOMContentLoaded', function () {{ document.open(); document.write({literal}); document.close(); }}, {{ once: true }});"
    ))
}

impl<R: Runtime> SurfaceHost for TauriSurfaceHost<R> {
    fn is_open(&self, label: &str) -> bool {
        self.app.get_webview_window(label).is_some()
    }

    fn focus(&self, label: &str) -> Result<()> {
        let window = self
            .app
            .get_webview_window(label)
            .ok_or_else(|| anyhow!("No window named {label}"))?;
        if window.is_minimized().unwrap_or(false) {
            window.unminimize()?;
        }
        window.set_focus()?;
        Ok(())
    }

    fn create(&self, launch: SurfaceLaunch) -> Result<()> {
        let script = injection_script(&launch.document)?;
        WebviewWindowBuilder::new(&self.app, &launch.label, WebviewUrl::App(SHELL_PAGE.into()))
            .title(&launch.title)
            .inner_size(launch.window.width, launch.window.height)
            .resizable(true)
            .initialization_script(&script)
            .build()
            .with_context(|| format!("Failed to build window {}", launch.label))?;
        log_debug!("Created webview window {}", launch.label);
        Ok(())
    }

    fn close(&self, label: &str) -> Result<()> {
        if let Some(window) = self.app.get_webview_window(label) {
            window.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injection_script_embeds_the_document_as_a_string_literal() {
        let script = injection_script("<p>\"quoted\"</p>").unwrap();
        assert!(script.contains(r#"document.write("<p>\"quoted\"</p>")"#));
        assert!(script.ends_with("{ once: true });"));
    }
}
