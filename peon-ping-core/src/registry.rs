//! Pack registry client
//!
//! Resolves pack names to download locations. The remote registry document is
//! fetched at most once per run; when it is unreachable, or when a requested
//! name is missing from it, resolution falls back to the fixed fallback
//! repository with the pack name as the source path. The registry is
//! authoritative but never a hard dependency.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Remote source of truth mapping pack names to download locations
pub const DEFAULT_REGISTRY_URL: &str = "https://peonping.github.io/registry/index.json";

/// Host that serves raw pack assets
pub const DEFAULT_SOURCE_BASE: &str = "https://raw.githubusercontent.com";

/// Repository packs resolve to when the registry has no record for them
pub const FALLBACK_REPO: &str = "PeonPing/og-packs";

/// Ref used with the fallback repository
pub const FALLBACK_REF: &str = "v1.1.0";

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);

/// Curated packs installed when neither --all nor --packs is given
pub const DEFAULT_PACKS: &[&str] = &[
    "peon",
    "peasant",
    "glados",
    "sc_kerrigan",
    "sc_battlecruiser",
    "ra2_kirov",
    "dota2_axe",
    "duke_nukem",
    "tf2_engineer",
    "hd2_helldiver",
];

/// Pack names known to exist in the fallback repository, used when the
/// registry cannot be fetched
pub const FALLBACK_PACKS: &[&str] = &[
    "acolyte_de",
    "acolyte_ru",
    "aoe2",
    "aom_greek",
    "brewmaster_ru",
    "dota2_axe",
    "duke_nukem",
    "glados",
    "hd2_helldiver",
    "molag_bal",
    "murloc",
    "ocarina_of_time",
    "peon",
    "peon_cz",
    "peon_de",
    "peon_es",
    "peon_fr",
    "peon_pl",
    "peon_ru",
    "peasant",
    "peasant_cz",
    "peasant_es",
    "peasant_fr",
    "peasant_ru",
    "ra2_kirov",
    "ra2_soviet_engineer",
    "ra_soviet",
    "rick",
    "sc_battlecruiser",
    "sc_firebat",
    "sc_kerrigan",
    "sc_medic",
    "sc_scv",
    "sc_tank",
    "sc_terran",
    "sc_vessel",
    "sheogorath",
    "sopranos",
    "tf2_engineer",
    "wc2_peasant",
];

/// Registry endpoint, overridable for tests
pub fn registry_url() -> String {
    std::env::var("PEON_PING_REGISTRY_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
}

/// Asset host, overridable for tests
pub fn source_base() -> String {
    let base = std::env::var("PEON_PING_SOURCE_BASE")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE_BASE.to_string());
    base.trim_end_matches('/').to_string()
}

/// Where a pack's assets are downloaded from
#[derive(Debug, Clone, Deserialize)]
pub struct PackRecord {
    pub name: String,
    pub source_repo: String,
    #[serde(default = "default_ref")]
    pub source_ref: String,
    #[serde(default)]
    pub source_path: String,
}

fn default_ref() -> String {
    "main".to_string()
}

impl PackRecord {
    /// Record for a pack the registry does not know about
    pub fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            source_repo: FALLBACK_REPO.to_string(),
            source_ref: FALLBACK_REF.to_string(),
            source_path: name.to_string(),
        }
    }

    /// Base download URL for this pack's manifest and sound files
    ///
    /// All registry-provided components are sanitized before URL construction
    /// so a tampered registry response cannot inject characters or traverse
    /// out of the asset host's path space.
    pub fn base_url(&self) -> String {
        let repo = sanitize_component(&self.source_repo);
        let source_ref = sanitize_component(&self.source_ref);
        let path = sanitize_component(&self.source_path);

        let mut url = format!("{}/{}/{}", source_base(), repo, source_ref);
        if !path.is_empty() {
            url.push('/');
            url.push_str(&path);
        }
        url
    }
}

/// Restrict a registry-provided string to URL-safe characters
///
/// Keeps the allow-list (alphanumeric, `.`, `_`, `/`, `-`) and additionally
/// drops `..` segments and empty segments, which pass a pure character filter
/// but would still allow path traversal.
pub fn sanitize_component(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
        .collect();

    filtered
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a record came from the registry or was synthesized locally.
/// Logging only; downstream handling is identical either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackOrigin {
    Registry,
    Fallback,
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    packs: Vec<PackRecord>,
}

/// In-memory pack index for one setup run
pub struct RegistryClient {
    /// None when the registry could not be fetched
    index: Option<HashMap<String, PackRecord>>,
}

impl RegistryClient {
    /// Fetch and index the registry document, degrading to the static
    /// fallback list when the fetch or parse fails
    pub async fn load(url: &str) -> Self {
        match fetch_index(url).await {
            Ok(index) => {
                tracing::info!("registry: {} packs available", index.len());
                Self { index: Some(index) }
            }
            Err(e) => {
                tracing::warn!("could not fetch pack registry, using fallback pack list: {e:#}");
                Self { index: None }
            }
        }
    }

    /// Client that behaves as if the registry were unreachable
    pub fn offline() -> Self {
        Self { index: None }
    }

    /// Client over a fixed record set (tests)
    pub fn from_records(records: Vec<PackRecord>) -> Self {
        let mut index = HashMap::new();
        for record in records {
            index.entry(record.name.clone()).or_insert(record);
        }
        Self { index: Some(index) }
    }

    pub fn from_registry(&self) -> bool {
        self.index.is_some()
    }

    /// Every pack name available for --all
    pub fn available_packs(&self) -> Vec<String> {
        match &self.index {
            Some(index) => {
                let mut names: Vec<String> = index.keys().cloned().collect();
                names.sort();
                names
            }
            None => FALLBACK_PACKS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Resolve a pack name to a download record
    ///
    /// Names absent from the registry (or any name when the registry is
    /// unreachable) resolve to the fallback repository with the pack name as
    /// source path.
    pub fn resolve(&self, name: &str) -> (PackRecord, PackOrigin) {
        if let Some(index) = &self.index {
            if let Some(record) = index.get(name) {
                return (record.clone(), PackOrigin::Registry);
            }
        }
        (PackRecord::fallback(name), PackOrigin::Fallback)
    }
}

async fn fetch_index(url: &str) -> Result<HashMap<String, PackRecord>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("peon-ping-setup/", env!("CARGO_PKG_VERSION")))
        .timeout(REGISTRY_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch pack registry from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Registry fetch failed: HTTP {} from {}", response.status(), url);
    }

    let document: RegistryDocument = response
        .json()
        .await
        .with_context(|| format!("Failed to parse pack registry from {url}"))?;

    // First occurrence wins so names stay unique within a run
    let mut index = HashMap::new();
    for record in document.packs {
        index.entry(record.name.clone()).or_insert(record);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<PackRecord> {
        serde_json::from_str::<Vec<PackRecord>>(
            r#"[
                {"name": "peon", "source_repo": "PeonPing/packs", "source_ref": "v2.0.0", "source_path": "peon"},
                {"name": "glados", "source_repo": "PeonPing/community"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn source_ref_defaults_to_main() {
        let records = sample_records();
        assert_eq!(records[1].source_ref, "main");
        assert_eq!(records[1].source_path, "");
    }

    #[test]
    fn resolve_prefers_registry_record() {
        let client = RegistryClient::from_records(sample_records());

        let (record, origin) = client.resolve("peon");
        assert_eq!(origin, PackOrigin::Registry);
        assert_eq!(record.source_repo, "PeonPing/packs");
        assert_eq!(record.source_ref, "v2.0.0");
    }

    #[test]
    fn unknown_name_falls_back_even_with_registry() {
        let client = RegistryClient::from_records(sample_records());

        let (record, origin) = client.resolve("murloc");
        assert_eq!(origin, PackOrigin::Fallback);
        assert_eq!(record.source_repo, FALLBACK_REPO);
        assert_eq!(record.source_ref, FALLBACK_REF);
        assert_eq!(record.source_path, "murloc");
    }

    #[test]
    fn offline_client_resolves_via_fallback() {
        let client = RegistryClient::offline();
        assert!(!client.from_registry());

        let (record, origin) = client.resolve("peon");
        assert_eq!(origin, PackOrigin::Fallback);
        assert_eq!(record.source_repo, FALLBACK_REPO);
        assert_eq!(record.source_path, "peon");
    }

    #[test]
    fn offline_available_packs_is_static_list() {
        let client = RegistryClient::offline();
        let names = client.available_packs();
        assert_eq!(names.len(), FALLBACK_PACKS.len());
        assert!(names.iter().any(|n| n == "sheogorath"));
    }

    #[test]
    fn duplicate_registry_names_keep_first_record() {
        let records = serde_json::from_str::<Vec<PackRecord>>(
            r#"[
                {"name": "peon", "source_repo": "first/repo"},
                {"name": "peon", "source_repo": "second/repo"}
            ]"#,
        )
        .unwrap();
        let client = RegistryClient::from_records(records);

        let (record, _) = client.resolve("peon");
        assert_eq!(record.source_repo, "first/repo");
    }

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_component("a; rm -rf /"), "arm-rf");
        assert_eq!(sanitize_component("repo name!?"), "reponame");
        assert_eq!(sanitize_component("PeonPing/og-packs"), "PeonPing/og-packs");
    }

    #[test]
    fn sanitize_blocks_path_traversal() {
        assert_eq!(sanitize_component("../../etc"), "etc");
        assert_eq!(sanitize_component("/absolute/path"), "absolute/path");
        assert_eq!(sanitize_component("a//b/../c"), "a/b/c");
    }

    #[test]
    fn base_url_for_hostile_record_is_clean() {
        let record = PackRecord {
            name: "evil".to_string(),
            source_repo: "a; rm -rf /".to_string(),
            source_ref: "main".to_string(),
            source_path: "../../etc".to_string(),
        };

        let url = record.base_url();
        assert!(!url.contains(".."));
        assert!(!url.contains(';'));
        assert!(!url.contains(' '));
        assert!(url.ends_with("/arm-rf/main/etc"));
    }

    #[test]
    fn base_url_omits_empty_path() {
        let record = PackRecord {
            name: "peon".to_string(),
            source_repo: "PeonPing/og-packs".to_string(),
            source_ref: "v1.1.0".to_string(),
            source_path: String::new(),
        };

        assert!(record.base_url().ends_with("/PeonPing/og-packs/v1.1.0"));
    }

    #[test]
    fn default_packs_are_a_subset_of_fallback_packs() {
        for name in DEFAULT_PACKS {
            assert!(FALLBACK_PACKS.contains(name), "{name} missing from fallback list");
        }
    }
}
