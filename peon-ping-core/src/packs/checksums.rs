//! Per-pack checksum store
//!
//! A flat text file, one `<basename> <hex-sha256>` line per sound file.
//! Updates are written to a temp file in the same directory and renamed into
//! place so a concurrent reader never sees a partial table.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Name of the store file inside a pack's cache directory
pub const CHECKSUM_FILE: &str = ".checksums";

#[derive(Debug)]
pub struct ChecksumStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ChecksumStore {
    /// Load the store for a pack directory; a missing file means an empty
    /// store, and unparseable lines are skipped rather than rejected
    pub fn load(pack_dir: &Path) -> Self {
        let path = pack_dir.join(CHECKSUM_FILE);
        let mut entries = BTreeMap::new();

        if let Ok(content) = std::fs::read_to_string(&path) {
            for line in content.lines() {
                let mut parts = line.split_whitespace();
                if let (Some(name), Some(hash)) = (parts.next(), parts.next()) {
                    entries.insert(name.to_string(), hash.to_string());
                }
            }
        }

        Self { path, entries }
    }

    pub fn get(&self, basename: &str) -> Option<&str> {
        self.entries.get(basename).map(String::as_str)
    }

    pub fn record(&mut self, basename: &str, hash: &str) {
        self.entries.insert(basename.to_string(), hash.to_string());
    }

    /// Persist the table atomically (write temp, rename)
    pub fn save(&self) -> Result<()> {
        let mut content = String::new();
        for (name, hash) in &self.entries {
            content.push_str(name);
            content.push(' ');
            content.push_str(hash);
            content.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write checksum store: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace checksum store: {}", self.path.display()))?;

        Ok(())
    }
}

/// SHA-256 of a file's contents as lowercase hex, streaming in 8KB chunks
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of a byte slice as lowercase hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_store_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = ChecksumStore::load(temp.path());
        assert!(store.get("ready.wav").is_none());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let temp = TempDir::new().unwrap();

        let mut store = ChecksumStore::load(temp.path());
        store.record("ready.wav", "abc123");
        store.record("yes.wav", "def456");
        store.save().unwrap();

        let reloaded = ChecksumStore::load(temp.path());
        assert_eq!(reloaded.get("ready.wav"), Some("abc123"));
        assert_eq!(reloaded.get("yes.wav"), Some("def456"));

        // No stray temp file left behind
        assert!(!temp.path().join(".checksums.tmp").exists());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CHECKSUM_FILE),
            "ready.wav abc123\ngarbage-line\n\nyes.wav def456\n",
        )
        .unwrap();

        let store = ChecksumStore::load(temp.path());
        assert_eq!(store.get("ready.wav"), Some("abc123"));
        assert_eq!(store.get("yes.wav"), Some("def456"));
        assert!(store.get("garbage-line").is_none());
    }

    #[test]
    fn store_file_has_one_entry_per_line() {
        let temp = TempDir::new().unwrap();

        let mut store = ChecksumStore::load(temp.path());
        store.record("b.wav", "222");
        store.record("a.wav", "111");
        store.save().unwrap();

        let content = std::fs::read_to_string(temp.path().join(CHECKSUM_FILE)).unwrap();
        assert_eq!(content, "a.wav 111\nb.wav 222\n");
    }

    #[test]
    fn hash_file_matches_hash_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sample.wav");
        std::fs::write(&path, b"fake audio data").unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"fake audio data"));
        assert_eq!(hash_file(&path).unwrap().len(), 64);
    }
}
