//! Supported host environments and detection
//!
//! The host catalog is a fixed table per release. Each descriptor knows where
//! the host keeps its configuration (overridable through an environment
//! variable) and which registration strategy applies to it. Presence checks
//! are pure filesystem existence tests with no side effects.

use std::path::PathBuf;

/// Directory name of the peon-ping install inside a host's config root
pub const INSTALL_SUBDIR: &str = "hooks/peon-ping";

/// State blob written on first install, used to tell updates from fresh runs
pub const STATE_FILE: &str = ".state.json";

/// Supported host identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostId {
    Claude,
    Cursor,
    OpenCode,
}

/// How peon-ping integrates into a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStrategy {
    /// Merge hook entries into an event-keyed settings.json
    SettingsMerge,
    /// Merge flat command entries into a hooks.json document
    HooksFile,
    /// Symlink a plugin file into the host's plugin directory
    PluginSymlink,
}

/// A supported host environment
#[derive(Debug, Clone)]
pub struct HostDescriptor {
    pub id: HostId,
    /// Human-readable name for output
    pub name: &'static str,
    /// Environment variable that overrides the config root
    pub env_override: &'static str,
    pub strategy: RegistrationStrategy,
}

impl HostDescriptor {
    /// The host's config root, honoring the override variable
    pub fn root(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(self.env_override) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        self.default_root()
    }

    fn default_root(&self) -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        match self.id {
            HostId::Claude => home.join(".claude"),
            HostId::Cursor => home.join(".cursor"),
            HostId::OpenCode => dirs::config_dir()
                .unwrap_or_else(|| home.join(".config"))
                .join("opencode"),
        }
    }

    /// Whether this host appears to be installed on the machine
    pub fn is_present(&self) -> bool {
        self.root().is_dir()
    }

    /// Where peon-ping installs itself for this host
    pub fn install_dir(&self) -> PathBuf {
        self.root().join(INSTALL_SUBDIR)
    }
}

/// All hosts this release knows how to register into
pub fn supported_hosts() -> Vec<HostDescriptor> {
    vec![
        HostDescriptor {
            id: HostId::Claude,
            name: "Claude Code",
            env_override: "CLAUDE_CONFIG_DIR",
            strategy: RegistrationStrategy::SettingsMerge,
        },
        HostDescriptor {
            id: HostId::Cursor,
            name: "Cursor",
            env_override: "CURSOR_CONFIG_DIR",
            strategy: RegistrationStrategy::HooksFile,
        },
        HostDescriptor {
            id: HostId::OpenCode,
            name: "OpenCode",
            env_override: "OPENCODE_CONFIG_DIR",
            strategy: RegistrationStrategy::PluginSymlink,
        },
    ]
}

/// The subset of supported hosts present on this machine
pub fn detect_hosts() -> Vec<HostDescriptor> {
    supported_hosts().into_iter().filter(|h| h.is_present()).collect()
}

/// Per-host install facts derived at the start of a run
#[derive(Debug, Clone)]
pub struct InstallState {
    pub host: HostDescriptor,
    pub install_dir: PathBuf,
    /// True when a previous install's state blob exists
    pub updating: bool,
    pub state_path: PathBuf,
}

impl InstallState {
    pub fn for_host(host: &HostDescriptor) -> Self {
        let install_dir = host.install_dir();
        let state_path = install_dir.join(STATE_FILE);
        let updating = state_path.exists();
        Self {
            host: host.clone(),
            install_dir,
            updating,
            state_path,
        }
    }
}
