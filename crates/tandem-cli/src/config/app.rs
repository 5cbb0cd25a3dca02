use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Yaml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ProjectLayout;
use crate::error::{ConfigError, Result};

/// Runtime a role executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleRuntime {
    Browser,
    Node,
    Server,
}

impl RoleRuntime {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleRuntime::Browser => "browser",
            RoleRuntime::Node => "node",
            RoleRuntime::Server => "server",
        }
    }
}

impl fmt::Display for RoleRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleRuntime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "browser" => Ok(RoleRuntime::Browser),
            "node" => Ok(RoleRuntime::Node),
            "server" => Ok(RoleRuntime::Server),
            other => Err(other.to_string()),
        }
    }
}

/// One entry of the `clients` map.
///
/// `target` is the older spelling of `runtime`; either may be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RoleDescriptor {
    pub fn new(runtime: RoleRuntime) -> Self {
        Self {
            runtime: Some(runtime.as_str().to_string()),
            target: None,
        }
    }

    /// Reconcile `runtime` and `target` into one runtime for `role`.
    pub fn resolve(&self, role: &str) -> Result<RoleRuntime, ConfigError> {
        let declared = match (&self.runtime, &self.target) {
            (Some(runtime), Some(target)) if runtime != target => {
                return Err(ConfigError::ConflictingOptions(format!(
                    "client \"{role}\" declares runtime \"{runtime}\" and target \"{target}\""
                )));
            }
            (Some(value), _) | (None, Some(value)) => value,
            (None, None) => {
                return Err(ConfigError::MissingField {
                    field: format!("clients.{role}.runtime"),
                    hint: format!(
                        "Declare client \"{role}\" with \"runtime\": \"browser\" or \"node\""
                    ),
                });
            }
        };

        declared.parse().map_err(|value| ConfigError::InvalidValue {
            field: format!("clients.{role}.runtime"),
            value,
            hint: "Must be \"browser\", \"node\" or \"server\"".to_string(),
        })
    }
}

/// Application configuration (`config/application.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub clients: IndexMap<String, RoleDescriptor>,
}

impl AppConfig {
    const FILE_STEM: &'static str = "application";

    /// First existing `config/application.{json,yaml,yml}`.
    pub fn locate(layout: &ProjectLayout) -> Option<PathBuf> {
        let dir = layout.config_root();
        ["json", "yaml", "yml"]
            .iter()
            .map(|ext| dir.join(format!("{}.{ext}", Self::FILE_STEM)))
            .find(|path| path.is_file())
    }

    /// Load the config, overlaying `config/env-<env>.json` and `TANDEM_`
    /// environment variables (`TANDEM_CLIENTS__PLAYER__RUNTIME=browser`).
    ///
    /// Environment keys are lowercased before merging, so a variable can only
    /// override a role whose name is all lowercase. A role named `Player`
    /// must be overridden through an `env-<env>.json` overlay instead.
    ///
    /// Returns `Ok(None)` when no application config exists.
    pub fn load(layout: &ProjectLayout, env: Option<&str>) -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::locate(layout) else {
            return Ok(None);
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => figment.merge(Json::file(&path)),
            _ => figment.merge(Yaml::file(&path)),
        };

        if let Some(env) = env.filter(|e| !e.is_empty()) {
            let overlay = layout.config_root().join(format!("env-{env}.json"));
            if overlay.is_file() {
                tracing::debug!("applying config overlay {}", overlay.display());
                figment = figment.merge(Json::file(overlay));
            }
        }

        figment = figment.merge(Env::prefixed("TANDEM_").split("__"));

        figment
            .extract()
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))
    }

    /// Load using the `ENV` environment variable for the overlay.
    pub fn load_from_env(layout: &ProjectLayout) -> Result<Option<Self>, ConfigError> {
        let env = std::env::var("ENV").ok();
        Self::load(layout, env.as_deref())
    }

    /// Every declared role with its reconciled runtime, in declaration order.
    pub fn roles(&self) -> Result<Vec<(String, RoleRuntime)>, ConfigError> {
        self.clients
            .iter()
            .map(|(role, descriptor)| Ok((role.clone(), descriptor.resolve(role)?)))
            .collect()
    }

    pub fn role(&self, role: &str) -> Option<&RoleDescriptor> {
        self.clients.get(role)
    }
}

/// Path of the main config file as shown in messages.
pub(crate) fn config_display_path(layout: &ProjectLayout) -> PathBuf {
    AppConfig::locate(layout)
        .map(|p| layout.display_path(&p).to_path_buf())
        .unwrap_or_else(|| Path::new(ProjectLayout::CONFIG_DIR).join("application.json"))
}
