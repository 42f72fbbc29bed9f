//! Pack manifest (openpeon.json) parsing
//!
//! The manifest is used only to enumerate which sound files a pack ships;
//! category structure is irrelevant to setup beyond de-duplication.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

/// Name of the manifest file at a pack's base URL
pub const MANIFEST_FILE: &str = "openpeon.json";

#[derive(Debug, Deserialize)]
pub struct PackManifest {
    #[serde(default)]
    categories: HashMap<String, Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default)]
    sounds: Vec<SoundRef>,
}

#[derive(Debug, Deserialize)]
struct SoundRef {
    file: String,
}

impl PackManifest {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse pack manifest")
    }

    /// De-duplicated, order-independent set of sound file basenames
    ///
    /// The same basename referenced from several categories is downloaded
    /// once.
    pub fn sound_basenames(&self) -> BTreeSet<String> {
        self.categories
            .values()
            .flat_map(|c| &c.sounds)
            .filter_map(|s| basename(&s.file))
            .map(str::to_string)
            .collect()
    }
}

fn basename(file: &str) -> Option<&str> {
    file.rsplit('/').next().filter(|b| !b.is_empty())
}
