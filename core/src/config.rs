//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! tree_name = "Login"
//! resume_uri = "https://am.example.com/login/resume"
//! identity_resource = "managed/alpha_user"
//! state_containers = ["objectAttributes"]
//! session_property_blacklist = ["tenantKey"]
//! ```

use crate::context::DEFAULT_IDENTITY_RESOURCE;
use crate::error::ConfigError;
use crate::state::StateContainers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

/// Session property names owned by the infrastructure.
pub const RESERVED_SESSION_PROPERTIES: &[&str] = &[
    "AMCtxId",
    "AuthLevel",
    "authInstant",
    "CharSet",
    "clientType",
    "FullLoginURL",
    "Host",
    "HostName",
    "Locale",
    "loginURL",
    "Organization",
    "Principal",
    "Principals",
    "Service",
    "successURL",
    "sun.am.UniversalIdentifier",
    "UserId",
    "UserProfile",
    "UserToken",
];

pub const DEFAULT_RESUME_URI: &str = "http://localhost:8080/am/XUI/resume";

/// Read-only set of session property names nodes may not set or remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPropertyBlacklist(BTreeSet<String>);

impl SessionPropertyBlacklist {
    /// The reserved names plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: BTreeSet<String> = RESERVED_SESSION_PROPERTIES.iter().map(|s| s.to_string()).collect();
        names.extend(extra.into_iter().map(Into::into));
        Self(names)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl Default for SessionPropertyBlacklist {
    fn default() -> Self {
        Self::with_extra(std::iter::empty::<String>())
    }
}

static BLACKLIST: OnceLock<SessionPropertyBlacklist> = OnceLock::new();

/// The process-wide blacklist: the installed one, or the reserved defaults.
pub fn session_property_blacklist() -> &'static SessionPropertyBlacklist {
    BLACKLIST.get_or_init(SessionPropertyBlacklist::default)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tree_name: String,
    /// Base URI handed to suspension handlers; a `suspendedId` query is appended.
    pub resume_uri: String,
    pub identity_resource: String,
    pub state_containers: BTreeSet<String>,
    /// Extra reserved session property names on top of the built-in ones.
    pub session_property_blacklist: BTreeSet<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tree_name: "default".to_string(),
            resume_uri: DEFAULT_RESUME_URI.to_string(),
            identity_resource: DEFAULT_IDENTITY_RESOURCE.to_string(),
            state_containers: BTreeSet::new(),
            session_property_blacklist: BTreeSet::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn state_containers(&self) -> StateContainers {
        StateContainers::new(self.state_containers.iter().cloned())
    }

    pub fn blacklist(&self) -> SessionPropertyBlacklist {
        SessionPropertyBlacklist::with_extra(self.session_property_blacklist.iter().cloned())
    }

    /// Publishes this config's blacklist process-wide.
    ///
    /// Returns false if a blacklist was already in effect; it is never replaced.
    pub fn install(&self) -> bool {
        let installed = BLACKLIST.set(self.blacklist()).is_ok();
        if !installed {
            tracing::warn!("session property blacklist already installed; keeping the existing one");
        }
        installed
    }
}
