//! Plugin-symlink registration (OpenCode)
//!
//! OpenCode loads executable plugin files from a directory. Registration
//! places a symlink in that directory pointing at the plugin source inside
//! the stable install location, so upgrades of the install are picked up
//! without re-running setup. A missing plugin source is a warning for this
//! host, never fatal to the run.

use anyhow::{Context, Result};
use std::path::Path;

use super::{HookRegistrar, RegisterOutcome};
use crate::hosts::InstallState;

/// Name of the plugin file inside the host's plugin directory
pub const PLUGIN_FILE: &str = "peon-ping.js";

/// Plugin source, relative to the install dir
const PLUGIN_SOURCE: &str = "adapters/opencode/peon-ping.js";

pub struct PluginLinkRegistrar;

impl HookRegistrar for PluginLinkRegistrar {
    fn describe(&self) -> &'static str {
        "plugin-symlink"
    }

    fn register(&self, state: &InstallState) -> Result<RegisterOutcome> {
        let source = state.install_dir.join(PLUGIN_SOURCE);
        if !source.is_file() {
            return Ok(RegisterOutcome::Skipped {
                reason: format!("plugin source not found: {}", source.display()),
            });
        }

        let plugin_dir = state.host.root().join("plugin");
        std::fs::create_dir_all(&plugin_dir)
            .with_context(|| format!("Failed to create {}", plugin_dir.display()))?;

        let link = plugin_dir.join(PLUGIN_FILE);
        if std::fs::symlink_metadata(&link).is_ok() {
            if std::fs::read_link(&link).map(|t| t == source).unwrap_or(false) {
                return Ok(RegisterOutcome::Registered {
                    detail: format!("plugin already linked: {}", link.display()),
                });
            }
            // Stale link or a regular file from an older install
            std::fs::remove_file(&link)
                .with_context(|| format!("Failed to remove {}", link.display()))?;
        }

        symlink_file(&source, &link)
            .with_context(|| format!("Failed to link {}", link.display()))?;

        Ok(RegisterOutcome::Registered {
            detail: format!("plugin linked: {}", link.display()),
        })
    }
}

#[cfg(unix)]
fn symlink_file(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn symlink_file(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, link)
}
