//! Setup orchestrator
//!
//! Drives one setup run end to end: detect hosts, resolve and download the
//! selected packs into the shared cache, then migrate, link, and register
//! each detected host. Everything past host detection degrades to warnings;
//! the only fatal condition is finding no supported host at all, which
//! aborts before any mutation.

use anyhow::{Context, Result};
use std::path::Path;

use crate::hosts::{self, HostDescriptor, InstallState};
use crate::migrate;
use crate::packs::PackCache;
use crate::registrar::{registrar_for, RegisterOutcome};
use crate::registry::{self, PackOrigin, RegistryClient, DEFAULT_PACKS};

/// Options parsed from the CLI surface
#[derive(Debug, Default)]
pub struct SetupOptions {
    /// Install every available pack
    pub all: bool,
    /// Explicit pack selection; empty means the curated default set
    pub packs: Vec<String>,
}

/// The one fatal setup error: nothing to register into
#[derive(Debug, thiserror::Error)]
#[error("no supported host detected\n{listing}")]
pub struct NoHostsError {
    listing: String,
}

impl NoHostsError {
    fn new() -> Self {
        let listing = hosts::supported_hosts()
            .iter()
            .map(|h| format!("  {}: expected at {}", h.name, h.root().display()))
            .collect::<Vec<_>>()
            .join("\n");
        Self { listing }
    }
}

#[derive(Debug)]
pub struct PackSummary {
    pub name: String,
    pub sound_files: usize,
    pub downloaded: usize,
    pub cached: usize,
}

#[derive(Debug)]
pub struct HostSummary {
    pub name: String,
    pub strategy: &'static str,
    pub updating: bool,
    pub detail: String,
}

/// Everything a run wants to report at the end
#[derive(Debug, Default)]
pub struct RunSummary {
    pub packs: Vec<PackSummary>,
    pub hosts: Vec<HostSummary>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn render(&self) -> String {
        let mut out = String::new();

        for pack in &self.packs {
            out.push_str(&format!(
                "[{}] {} sound files ({} downloaded, {} cached)\n",
                pack.name, pack.sound_files, pack.downloaded, pack.cached
            ));
        }

        for host in &self.hosts {
            let mode = if host.updating { "updated" } else { "installed" };
            out.push_str(&format!(
                "{} ({}): {} - {}\n",
                host.name, host.strategy, mode, host.detail
            ));
        }

        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                out.push_str(&format!("  {warning}\n"));
            }
        }

        out
    }
}

/// Run setup end to end
pub async fn run(options: &SetupOptions) -> Result<RunSummary> {
    let detected = hosts::detect_hosts();
    if detected.is_empty() {
        return Err(NoHostsError::new().into());
    }
    for host in &detected {
        tracing::info!("detected {} at {}", host.name, host.root().display());
    }

    let mut summary = RunSummary::default();

    let client = RegistryClient::load(&registry::registry_url()).await;
    if !client.from_registry() {
        summary
            .warnings
            .push("could not fetch pack registry; using fallback pack list".to_string());
    }

    let selected = select_packs(options, &client);
    tracing::info!("installing {} packs", selected.len());

    let cache = PackCache::new()?;
    for name in &selected {
        let (record, origin) = client.resolve(name);
        tracing::info!(
            "resolved {name} via {}",
            match origin {
                PackOrigin::Registry => "registry",
                PackOrigin::Fallback => "fallback",
            }
        );

        match cache.ensure(&record).await {
            Ok(outcome) => {
                if outcome.sound_files == 0 {
                    summary.warnings.push(format!("[{name}] no sound files found"));
                }
                for basename in &outcome.failed {
                    summary
                        .warnings
                        .push(format!("[{name}] failed to download sounds/{basename}"));
                }
                summary.packs.push(PackSummary {
                    name: outcome.name,
                    sound_files: outcome.sound_files,
                    downloaded: outcome.downloaded,
                    cached: outcome.cached,
                });
            }
            Err(e) => {
                tracing::warn!("skipping pack {name}: {e:#}");
                summary.warnings.push(format!("[{name}] skipped: {e:#}"));
            }
        }
    }

    for host in &detected {
        if let Err(e) = install_into_host(host, cache.packs_dir(), &mut summary) {
            tracing::warn!("{} registration failed: {e:#}", host.name);
            summary
                .warnings
                .push(format!("[{}] registration failed: {e:#}", host.name));
        }
    }

    Ok(summary)
}

/// Which packs this run installs
fn select_packs(options: &SetupOptions, client: &RegistryClient) -> Vec<String> {
    let names: Vec<String> = if !options.packs.is_empty() {
        options
            .packs
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    } else if options.all {
        client.available_packs()
    } else {
        DEFAULT_PACKS.iter().map(|s| s.to_string()).collect()
    };

    // Names must stay unique within one run
    let mut seen = std::collections::HashSet::new();
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}

/// Migrate, link, register, and mark one host. Failure here is scoped to the
/// host; the caller turns it into a warning and continues.
fn install_into_host(
    host: &HostDescriptor,
    shared_packs: &Path,
    summary: &mut RunSummary,
) -> Result<()> {
    let state = InstallState::for_host(host);
    std::fs::create_dir_all(&state.install_dir)
        .with_context(|| format!("Failed to create {}", state.install_dir.display()))?;

    migrate::migrate_legacy_packs(&state.install_dir, shared_packs)?;

    let registrar = registrar_for(host);
    let detail = match registrar.register(&state)? {
        RegisterOutcome::Registered { detail } => detail,
        RegisterOutcome::Skipped { reason } => {
            summary.warnings.push(format!("[{}] {reason}", host.name));
            format!("skipped: {reason}")
        }
    };

    if !state.updating {
        std::fs::write(&state.state_path, "{}\n")
            .with_context(|| format!("Failed to write {}", state.state_path.display()))?;
    }

    summary.hosts.push(HostSummary {
        name: host.name.to_string(),
        strategy: registrar.describe(),
        updating: state.updating,
        detail,
    });

    Ok(())
}
