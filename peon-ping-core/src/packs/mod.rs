//! Shared sound-pack cache
//!
//! One directory tree per machine holds every downloaded pack; hosts
//! reference it through a symlink rather than keeping copies. Downloads are
//! checksum-gated: a file is only fetched again when it is missing, has no
//! recorded checksum, or no longer matches the one on record. Individual
//! failures degrade to warnings, never to an aborted run.

mod checksums;
mod manifest;

pub use checksums::{hash_bytes, hash_file, ChecksumStore, CHECKSUM_FILE};
pub use manifest::{PackManifest, MANIFEST_FILE};

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::PackRecord;

/// File extensions counted when verifying a pack's sounds on disk
pub const SOUND_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg"];

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters escaped in sound-file basenames when building asset URLs.
/// Pack authors use punctuation like `?`, `!` and `#` in filenames, which is
/// unsafe in a raw URL path segment.
const ASSET_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Machine-wide packs directory, overridable via `PEON_PING_DATA_DIR`
pub fn shared_packs_dir() -> Result<PathBuf> {
    let data_dir = match std::env::var("PEON_PING_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => directories::ProjectDirs::from("com", "PeonPing", "peon-ping")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .or_else(|| dirs::data_dir().map(|d| d.join("peon-ping")))
            .context("Could not determine data directory")?,
    };

    let packs_dir = data_dir.join("packs");
    std::fs::create_dir_all(&packs_dir)
        .with_context(|| format!("Failed to create pack cache: {}", packs_dir.display()))?;

    Ok(packs_dir)
}

/// Percent-encode a sound-file basename for use as a URL path segment
pub fn encode_basename(basename: &str) -> String {
    utf8_percent_encode(basename, ASSET_SEGMENT).to_string()
}

/// What happened while ensuring one pack
#[derive(Debug)]
pub struct PackOutcome {
    pub name: String,
    /// Files fetched this run
    pub downloaded: usize,
    /// Files skipped because the local copy matched its checksum
    pub cached: usize,
    /// Basenames that could not be fetched
    pub failed: Vec<String>,
    /// Sound files present on disk after processing (extension-filtered)
    pub sound_files: usize,
}

/// Downloads and verifies packs into the shared cache
pub struct PackCache {
    client: reqwest::Client,
    packs_dir: PathBuf,
}

impl PackCache {
    /// Cache rooted at the machine-wide packs directory
    pub fn new() -> Result<Self> {
        Self::with_packs_dir(shared_packs_dir()?)
    }

    /// Cache rooted at a specific directory (tests)
    pub fn with_packs_dir(packs_dir: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("peon-ping-setup/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        std::fs::create_dir_all(&packs_dir)
            .with_context(|| format!("Failed to create pack cache: {}", packs_dir.display()))?;

        Ok(Self { client, packs_dir })
    }

    pub fn packs_dir(&self) -> &Path {
        &self.packs_dir
    }

    /// Make a pack's files locally available, best-effort
    ///
    /// An error here means the manifest itself could not be fetched or
    /// parsed; the caller treats that as "skip this pack with a warning".
    /// Individual file failures are recorded in the outcome instead.
    pub async fn ensure(&self, record: &PackRecord) -> Result<PackOutcome> {
        let base_url = record.base_url();
        let pack_dir = self.packs_dir.join(&record.name);
        let sounds_dir = pack_dir.join("sounds");
        std::fs::create_dir_all(&sounds_dir)
            .with_context(|| format!("Failed to create {}", sounds_dir.display()))?;

        let manifest_text = self
            .fetch_text(&format!("{base_url}/{MANIFEST_FILE}"))
            .await
            .with_context(|| format!("Failed to download manifest for {}", record.name))?;
        let manifest = PackManifest::from_json(&manifest_text)
            .with_context(|| format!("Invalid manifest for {}", record.name))?;

        std::fs::write(pack_dir.join(MANIFEST_FILE), &manifest_text)
            .with_context(|| format!("Failed to store manifest for {}", record.name))?;

        let mut store = ChecksumStore::load(&pack_dir);
        let mut downloaded = 0;
        let mut cached = 0;
        let mut failed = Vec::new();

        for basename in manifest.sound_basenames() {
            let target = sounds_dir.join(&basename);
            if is_cached(&target, &store, &basename) {
                tracing::debug!("cache hit: {}/{}", record.name, basename);
                cached += 1;
                continue;
            }

            let url = format!("{base_url}/sounds/{}", encode_basename(&basename));
            match self.fetch_bytes(&url).await {
                Ok(bytes) => match std::fs::write(&target, &bytes) {
                    Ok(()) => {
                        store.record(&basename, &hash_bytes(&bytes));
                        downloaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!("failed to write {}/sounds/{basename}: {e}", record.name);
                        failed.push(basename);
                    }
                },
                Err(e) => {
                    // Any previous file stays untouched
                    tracing::warn!("failed to download {}/sounds/{basename}: {e:#}", record.name);
                    failed.push(basename);
                }
            }
        }

        store.save()?;

        Ok(PackOutcome {
            name: record.name.clone(),
            downloaded,
            cached,
            failed,
            sound_files: count_sound_files(&sounds_dir),
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get_ok(url).await?;
        response.text().await.context("Failed to read response body")
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_ok(url).await?;
        let bytes = response.bytes().await.context("Failed to read response body")?;
        Ok(bytes.to_vec())
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {}", response.status(), url);
        }
        Ok(response)
    }
}

/// A local file counts as cached only when it exists, has a recorded
/// checksum, and still hashes to it. Anything else (including a corrupted
/// file) is a cache miss, not an error.
fn is_cached(target: &Path, store: &ChecksumStore, basename: &str) -> bool {
    if !target.is_file() {
        return false;
    }
    let Some(expected) = store.get(basename) else {
        return false;
    };
    match hash_file(target) {
        Ok(actual) => actual == expected,
        Err(_) => false,
    }
}

/// Count sound files in a directory by extension
pub fn count_sound_files(sounds_dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(sounds_dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SOUND_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .count()
}
