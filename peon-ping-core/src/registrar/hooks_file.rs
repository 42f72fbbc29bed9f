//! Hooks-file registration (Cursor)
//!
//! Cursor reads a flat hooks.json: a top-level version field and an
//! event-keyed map of `{"command": ...}` entries, with no matcher or nested
//! hook list. Same merge discipline as the settings variant, different shape.

use anyhow::Result;
use serde_json::{json, Value};

use super::{
    ensure_array, ensure_object, is_integration_command, load_json_or_empty, write_pretty_json,
    HookRegistrar, RegisterOutcome,
};
use crate::hosts::InstallState;

/// Events the notification adapter is registered for
pub const CURSOR_EVENTS: &[&str] = &["beforeSubmitPrompt", "stop"];

/// Adapter script invoked by Cursor, relative to the install dir
const ADAPTER_SCRIPT: &str = "adapters/cursor.sh";

const HOOKS_FILE_VERSION: u64 = 1;

pub struct HooksFileRegistrar;

impl HookRegistrar for HooksFileRegistrar {
    fn describe(&self) -> &'static str {
        "hooks-file"
    }

    fn register(&self, state: &InstallState) -> Result<RegisterOutcome> {
        let hooks_path = state.host.root().join("hooks.json");

        let mut document = load_json_or_empty(&hooks_path);
        if !document.is_object() {
            document = json!({});
        }

        let command = state.install_dir.join(ADAPTER_SCRIPT).display().to_string();
        let entry = json!({ "command": command });

        if let Some(object) = document.as_object_mut() {
            object
                .entry("version")
                .or_insert_with(|| json!(HOOKS_FILE_VERSION));
        }

        let hooks = ensure_object(&mut document, "hooks")?;
        for event in CURSOR_EVENTS {
            let entries = ensure_array(hooks, event)?;
            entries.retain(|existing| !entry_references_integration(existing));
            entries.push(entry.clone());
        }

        write_pretty_json(&hooks_path, &document)?;

        Ok(RegisterOutcome::Registered {
            detail: format!("hooks registered for: {}", CURSOR_EVENTS.join(", ")),
        })
    }
}

fn entry_references_integration(entry: &Value) -> bool {
    entry
        .get("command")
        .and_then(Value::as_str)
        .map(is_integration_command)
        .unwrap_or(false)
}
