//! Per-host hook registration
//!
//! One trait, three strategies: merging hook entries into Claude Code's
//! settings.json, merging flat command entries into Cursor's hooks.json, and
//! symlinking a plugin file into OpenCode's plugin directory. Every strategy
//! is idempotent: registering twice with the same inputs leaves the same
//! on-disk state.

mod hooks_file;
mod plugin_link;
mod settings_merge;

pub use hooks_file::{HooksFileRegistrar, CURSOR_EVENTS};
pub use plugin_link::{PluginLinkRegistrar, PLUGIN_FILE};
pub use settings_merge::{SettingsMergeRegistrar, CLAUDE_EVENTS};

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::path::Path;

use crate::hosts::{HostDescriptor, InstallState, RegistrationStrategy};

/// The runtime script every hook entry invokes
pub const RUNTIME_SCRIPT: &str = "peon.sh";

/// Command filenames this or earlier releases have registered. Any existing
/// entry referencing one of these belongs to us and is replaced, so upgrades
/// never leave stale duplicates behind.
pub const KNOWN_COMMANDS: &[&str] = &["peon.sh", "notify.sh", "cursor.sh"];

/// Whether a hook command string references this integration
pub fn is_integration_command(command: &str) -> bool {
    KNOWN_COMMANDS.iter().any(|known| command.contains(known))
}

/// Result of one host's registration
#[derive(Debug)]
pub enum RegisterOutcome {
    Registered { detail: String },
    /// The host was skipped with a warning (e.g. missing plugin source)
    Skipped { reason: String },
}

/// A host-specific registration strategy
pub trait HookRegistrar {
    /// Short label for the summary
    fn describe(&self) -> &'static str;

    /// Install the integration into this host's config, idempotently
    fn register(&self, state: &InstallState) -> Result<RegisterOutcome>;
}

/// Pick the registrar variant for a host
pub fn registrar_for(host: &HostDescriptor) -> Box<dyn HookRegistrar> {
    match host.strategy {
        RegistrationStrategy::SettingsMerge => Box::new(SettingsMergeRegistrar),
        RegistrationStrategy::HooksFile => Box::new(HooksFileRegistrar),
        RegistrationStrategy::PluginSymlink => Box::new(PluginLinkRegistrar),
    }
}

/// Load a JSON settings document, tolerating a missing or malformed file by
/// treating it as an empty object
pub(crate) fn load_json_or_empty(path: &Path) -> Value {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("ignoring malformed {}: {e}", path.display());
                json!({})
            }
        },
        Err(_) => json!({}),
    }
}

/// Write a settings document back: pretty-printed, trailing newline, full
/// rewrite so the file keeps its host-native shape
pub(crate) fn write_pretty_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Get or create an object member, coercing a non-object value
pub(crate) fn ensure_object<'a>(value: &'a mut Value, key: &str) -> Result<&'a mut Value> {
    let member = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("Settings document is not a JSON object"))?
        .entry(key)
        .or_insert_with(|| json!({}));
    if !member.is_object() {
        *member = json!({});
    }
    Ok(member)
}

/// Get or create an array member under an object, coercing non-arrays
pub(crate) fn ensure_array<'a>(object: &'a mut Value, key: &str) -> Result<&'a mut Vec<Value>> {
    let member = object
        .as_object_mut()
        .ok_or_else(|| anyhow!("Hooks member is not a JSON object"))?
        .entry(key)
        .or_insert_with(|| json!([]));
    if !member.is_array() {
        *member = json!([]);
    }
    member
        .as_array_mut()
        .ok_or_else(|| anyhow!("Event member is not a JSON array"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_commands_match_by_filename() {
        assert!(is_integration_command("/home/u/.claude/hooks/peon-ping/peon.sh"));
        assert!(is_integration_command("bash ~/.claude/hooks/notify.sh"));
        assert!(is_integration_command("/x/adapters/cursor.sh"));
        assert!(!is_integration_command("cupcake eval --harness claude"));
        assert!(!is_integration_command("echo done"));
    }

    #[test]
    fn registrar_dispatch_follows_strategy() {
        for host in crate::hosts::supported_hosts() {
            let registrar = registrar_for(&host);
            let expected = match host.strategy {
                RegistrationStrategy::SettingsMerge => "settings-merge",
                RegistrationStrategy::HooksFile => "hooks-file",
                RegistrationStrategy::PluginSymlink => "plugin-symlink",
            };
            assert_eq!(registrar.describe(), expected);
        }
    }
}
