//! Legacy pack-layout migration
//!
//! Installs predating the shared cache stored packs as a real directory
//! inside each host's install dir. The migration moves any pack not already
//! present in the shared cache over, removes the old directory, and leaves a
//! symlink in its place. Finding a symlink means the host is already
//! migrated and nothing happens, so the migration is safe to run every
//! setup.

use anyhow::{Context, Result};
use std::path::Path;

/// Name of the packs entry inside a host's install dir
pub const PACKS_LINK: &str = "packs";

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// packs was already a symlink to the shared cache
    AlreadyLinked,
    /// No previous packs entry existed; the link was created
    FreshInstall,
    /// A legacy directory was migrated into the shared cache
    Migrated { moved: usize },
}

/// Ensure `<install_dir>/packs` is a symlink to the shared cache, migrating
/// a legacy real-directory layout when one is found
pub fn migrate_legacy_packs(install_dir: &Path, shared_packs: &Path) -> Result<MigrationOutcome> {
    std::fs::create_dir_all(install_dir)
        .with_context(|| format!("Failed to create {}", install_dir.display()))?;

    let packs_path = install_dir.join(PACKS_LINK);

    match std::fs::symlink_metadata(&packs_path) {
        Ok(meta) if meta.file_type().is_symlink() => Ok(MigrationOutcome::AlreadyLinked),
        Ok(meta) if meta.is_dir() => {
            let moved = move_unseen_packs(&packs_path, shared_packs)?;
            std::fs::remove_dir_all(&packs_path)
                .with_context(|| format!("Failed to remove legacy {}", packs_path.display()))?;
            symlink_dir(shared_packs, &packs_path)
                .with_context(|| format!("Failed to link {}", packs_path.display()))?;
            tracing::info!(
                "migrated legacy pack directory {} ({moved} packs moved)",
                packs_path.display()
            );
            Ok(MigrationOutcome::Migrated { moved })
        }
        Ok(_) => {
            // A stray regular file; replace it with the link
            std::fs::remove_file(&packs_path)
                .with_context(|| format!("Failed to remove {}", packs_path.display()))?;
            symlink_dir(shared_packs, &packs_path)
                .with_context(|| format!("Failed to link {}", packs_path.display()))?;
            Ok(MigrationOutcome::FreshInstall)
        }
        Err(_) => {
            symlink_dir(shared_packs, &packs_path)
                .with_context(|| format!("Failed to link {}", packs_path.display()))?;
            Ok(MigrationOutcome::FreshInstall)
        }
    }
}

/// Move pack subdirectories into the shared cache unless already present
fn move_unseen_packs(legacy_dir: &Path, shared_packs: &Path) -> Result<usize> {
    let mut moved = 0;

    for entry in std::fs::read_dir(legacy_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let dest = shared_packs.join(entry.file_name());
        if dest.exists() {
            tracing::debug!("shared cache already has {:?}, dropping legacy copy", entry.file_name());
            continue;
        }

        std::fs::rename(&path, &dest).with_context(|| {
            format!("Failed to move {} to {}", path.display(), dest.display())
        })?;
        tracing::info!("moved {} -> {}", path.display(), dest.display());
        moved += 1;
    }

    Ok(moved)
}

#[cfg(unix)]
fn symlink_dir(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn symlink_dir(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(source, link)
}
