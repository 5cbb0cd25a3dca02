//! Packaging configuration and the project-level override hook.
//!
//! [`BundleSettings`] holds the defaults every client bundle is built with.
//! A [`ConfigOverride`] sees those settings as a JSON object and returns a
//! replacement, which is validated once at startup.

use std::path::{Path, PathBuf};

use rolldown::{IsExternal, OutputFormat, Platform, RawMinifyOptions, SourceMapType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Name of the project file merged over the defaults.
pub const OVERRIDE_FILE: &str = "bundler.config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    Esm,
    Cjs,
    Iife,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundlePlatform {
    Browser,
    Node,
    Neutral,
}

/// Where the bundle's source map goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// Sibling `.map` file referenced from the bundle.
    Linked,
    Inline,
    /// Sibling `.map` file without a reference comment.
    Hidden,
    None,
}

/// Packaging options applied to every client bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleSettings {
    pub format: BundleFormat,
    pub minify: bool,
    /// Preserve function and class names so `instanceof` and `.name` checks
    /// keep working after minification.
    pub keep_names: bool,
    pub sourcemap: SourceMapMode,
    pub platform: BundlePlatform,
    #[serde(default)]
    pub external: Vec<String>,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            format: BundleFormat::Esm,
            minify: true,
            keep_names: true,
            sourcemap: SourceMapMode::Linked,
            platform: BundlePlatform::Browser,
            external: Vec::new(),
        }
    }
}

impl BundleSettings {
    pub(crate) fn output_format(&self) -> OutputFormat {
        match self.format {
            BundleFormat::Esm => OutputFormat::Esm,
            BundleFormat::Cjs => OutputFormat::Cjs,
            BundleFormat::Iife => OutputFormat::Iife,
        }
    }

    pub(crate) fn rolldown_platform(&self) -> Platform {
        match self.platform {
            BundlePlatform::Browser => Platform::Browser,
            BundlePlatform::Node => Platform::Node,
            BundlePlatform::Neutral => Platform::Neutral,
        }
    }

    pub(crate) fn sourcemap_type(&self) -> Option<SourceMapType> {
        match self.sourcemap {
            SourceMapMode::Linked => Some(SourceMapType::File),
            SourceMapMode::Inline => Some(SourceMapType::Inline),
            SourceMapMode::Hidden => Some(SourceMapType::Hidden),
            SourceMapMode::None => None,
        }
    }

    pub(crate) fn minify_options(&self) -> RawMinifyOptions {
        RawMinifyOptions::from(self.minify)
    }

    pub(crate) fn is_external(&self) -> IsExternal {
        IsExternal::from(self.external.clone())
    }

    /// Settings as the JSON object handed to overrides.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::InvalidConfig(format!("cannot serialize bundle settings: {e}")))
    }

    fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidConfig(format!("override returned invalid settings: {e}")))
    }
}

/// Hook that rewrites the default packaging configuration.
pub trait ConfigOverride: Send + Sync {
    /// Return the settings to build with, given the defaults.
    fn apply(&self, settings: Value) -> Value;

    /// Human-readable origin, used in error messages.
    fn describe(&self) -> String {
        "configuration override".to_string()
    }
}

impl<F> ConfigOverride for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn apply(&self, settings: Value) -> Value {
        self(settings)
    }
}

/// Override read from a JSON object file and deep-merged over the defaults.
#[derive(Debug, Clone)]
pub struct JsonFileOverride {
    path: PathBuf,
    patch: Map<String, Value>,
}

impl JsonFileOverride {
    /// Load `<dir>/bundler.config.json` if it exists.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid JSON, or its top
    /// level is not an object.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(OVERRIDE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError {
            message: format!("Failed to read {}", path.display()),
            source: e,
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!("Invalid \"{}\" file: {e}", path.display()))
        })?;

        match value {
            Value::Object(patch) => Ok(Self {
                path: path.to_path_buf(),
                patch,
            }),
            _ => Err(Error::InvalidConfig(format!(
                "Invalid \"{}\" file: top level must be an object",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigOverride for JsonFileOverride {
    fn apply(&self, mut settings: Value) -> Value {
        deep_merge(&mut settings, Value::Object(self.patch.clone()));
        settings
    }

    fn describe(&self) -> String {
        format!("\"{}\"", self.path.display())
    }
}

/// Check that an override maps an object to an object.
pub fn validate_override(hook: &dyn ConfigOverride) -> Result<()> {
    match hook.apply(Value::Object(Map::new())) {
        Value::Object(_) => Ok(()),
        _ => Err(Error::InvalidConfig(format!(
            "Invalid {}: must return an object",
            hook.describe()
        ))),
    }
}

/// Apply an optional override to `defaults` and validate the result.
pub fn resolve_settings(
    defaults: &BundleSettings,
    hook: Option<&dyn ConfigOverride>,
) -> Result<BundleSettings> {
    let Some(hook) = hook else {
        return Ok(defaults.clone());
    };

    validate_override(hook)?;

    match hook.apply(defaults.to_value()?) {
        value @ Value::Object(_) => BundleSettings::from_value(value).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{} ({})", msg, hook.describe()))
            }
            other => other,
        }),
        _ => Err(Error::InvalidConfig(format!(
            "Invalid {}: must return an object",
            hook.describe()
        ))),
    }
}

fn deep_merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}
