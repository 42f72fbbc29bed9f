//! Settings-merge registration (Claude Code)
//!
//! Claude Code keeps an event-keyed hook list in settings.json. For each
//! event we own, any entry referencing a current or prior integration command
//! is removed and one fresh entry is appended, leaving at most one entry
//! invoking our command per event. Unrelated settings are passed through
//! untouched.

use anyhow::Result;
use serde_json::{json, Value};

use super::{
    ensure_array, ensure_object, is_integration_command, load_json_or_empty, write_pretty_json,
    HookRegistrar, RegisterOutcome, RUNTIME_SCRIPT,
};
use crate::hosts::InstallState;

/// Events the notification hook is registered for
pub const CLAUDE_EVENTS: &[&str] = &[
    "SessionStart",
    "UserPromptSubmit",
    "Stop",
    "Notification",
    "PermissionRequest",
];

const HOOK_TIMEOUT_SECS: u64 = 10;

pub struct SettingsMergeRegistrar;

impl HookRegistrar for SettingsMergeRegistrar {
    fn describe(&self) -> &'static str {
        "settings-merge"
    }

    fn register(&self, state: &InstallState) -> Result<RegisterOutcome> {
        let settings_path = state.host.root().join("settings.json");

        let mut settings = load_json_or_empty(&settings_path);
        if !settings.is_object() {
            settings = json!({});
        }

        let command = state.install_dir.join(RUNTIME_SCRIPT).display().to_string();
        let entry = json!({
            "matcher": "",
            "hooks": [{
                "type": "command",
                "command": command,
                "timeout": HOOK_TIMEOUT_SECS,
            }]
        });

        let hooks = ensure_object(&mut settings, "hooks")?;
        for event in CLAUDE_EVENTS {
            let entries = ensure_array(hooks, event)?;
            entries.retain(|existing| !entry_references_integration(existing));
            entries.push(entry.clone());
        }

        write_pretty_json(&settings_path, &settings)?;

        Ok(RegisterOutcome::Registered {
            detail: format!("hooks registered for: {}", CLAUDE_EVENTS.join(", ")),
        })
    }
}

/// Whether a settings-file entry's nested hook list invokes our command
fn entry_references_integration(entry: &Value) -> bool {
    entry
        .get("hooks")
        .and_then(Value::as_array)
        .map(|hooks| {
            hooks.iter().any(|hook| {
                hook.get("command")
                    .and_then(Value::as_str)
                    .map(is_integration_command)
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::{supported_hosts, HostId};
    use serial_test::serial;
    use tempfile::TempDir;

    fn state_for(temp: &TempDir) -> InstallState {
        std::env::set_var("CLAUDE_CONFIG_DIR", temp.path());
        let host = supported_hosts()
            .into_iter()
            .find(|h| h.id == HostId::Claude)
            .unwrap();
        InstallState::for_host(&host)
    }

    fn read_settings(temp: &TempDir) -> Value {
        let content = std::fs::read_to_string(temp.path().join("settings.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    #[serial]
    fn fresh_install_registers_every_event() {
        let temp = TempDir::new().unwrap();
        let state = state_for(&temp);

        SettingsMergeRegistrar.register(&state).unwrap();

        let settings = read_settings(&temp);
        for event in CLAUDE_EVENTS {
            let entries = settings["hooks"][event].as_array().unwrap();
            assert_eq!(entries.len(), 1, "{event}");
            let hook = &entries[0]["hooks"][0];
            assert_eq!(hook["type"], "command");
            assert_eq!(hook["timeout"], 10);
            assert!(hook["command"].as_str().unwrap().ends_with("peon.sh"));
        }

        std::env::remove_var("CLAUDE_CONFIG_DIR");
    }

    #[test]
    #[serial]
    fn registration_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let state = state_for(&temp);

        SettingsMergeRegistrar.register(&state).unwrap();
        let first = std::fs::read(temp.path().join("settings.json")).unwrap();

        SettingsMergeRegistrar.register(&state).unwrap();
        let second = std::fs::read(temp.path().join("settings.json")).unwrap();

        assert_eq!(first, second);

        std::env::remove_var("CLAUDE_CONFIG_DIR");
    }

    #[test]
    #[serial]
    fn stale_entries_are_replaced_and_others_kept() {
        let temp = TempDir::new().unwrap();

        let existing = json!({
            "model": "opus",
            "hooks": {
                "Stop": [
                    {"matcher": "", "hooks": [{"type": "command", "command": "/old/notify.sh"}]},
                    {"matcher": "", "hooks": [{"type": "command", "command": "echo done"}]}
                ]
            }
        });
        std::fs::write(
            temp.path().join("settings.json"),
            serde_json::to_string_pretty(&existing).unwrap(),
        )
        .unwrap();

        let state = state_for(&temp);
        SettingsMergeRegistrar.register(&state).unwrap();

        let settings = read_settings(&temp);
        assert_eq!(settings["model"], "opus");

        let stop = settings["hooks"]["Stop"].as_array().unwrap();
        // The legacy notify.sh entry is gone; the unrelated echo entry stays
        assert_eq!(stop.len(), 2);
        assert_eq!(stop[0]["hooks"][0]["command"], "echo done");
        assert!(stop[1]["hooks"][0]["command"]
            .as_str()
            .unwrap()
            .ends_with("peon.sh"));

        std::env::remove_var("CLAUDE_CONFIG_DIR");
    }

    #[test]
    #[serial]
    fn malformed_settings_are_treated_as_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("settings.json"), "{not json").unwrap();

        let state = state_for(&temp);
        SettingsMergeRegistrar.register(&state).unwrap();

        let settings = read_settings(&temp);
        assert_eq!(settings["hooks"]["Stop"].as_array().unwrap().len(), 1);

        std::env::remove_var("CLAUDE_CONFIG_DIR");
    }

    #[test]
    #[serial]
    fn written_file_ends_with_newline() {
        let temp = TempDir::new().unwrap();
        let state = state_for(&temp);

        SettingsMergeRegistrar.register(&state).unwrap();

        let content = std::fs::read_to_string(temp.path().join("settings.json")).unwrap();
        assert!(content.ends_with('\n'));
        assert!(!content.ends_with("\n\n"));

        std::env::remove_var("CLAUDE_CONFIG_DIR");
    }
}
