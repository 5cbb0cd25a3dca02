//! Rolldown plugin that loads every script module through the shared oxc
//! transpiler.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use oxc_sourcemap::SourceMap;
use parking_lot::Mutex;
use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};
use rustc_hash::FxHashSet;
use tandem_compiler::{TranspileOptions, is_recognized, transpile};

/// Load hook transpiling recognized modules.
///
/// Each module's map is handed to Rolldown alongside its code, so the
/// bundle's map points back at the original sources.
///
/// The plugin also records which files were loaded, so a rebuild context can
/// watch them, and keeps the first transpile failure verbatim for the error
/// artifact.
#[derive(Debug, Clone)]
pub struct TranspilePlugin {
    output: PathBuf,
    loaded: Arc<Mutex<FxHashSet<PathBuf>>>,
    first_error: Arc<Mutex<Option<String>>>,
}

impl TranspilePlugin {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            loaded: Arc::default(),
            first_error: Arc::default(),
        }
    }

    /// Files loaded since the last call, leaving the set empty.
    pub fn take_loaded(&self) -> FxHashSet<PathBuf> {
        std::mem::take(&mut *self.loaded.lock())
    }

    /// First transpile failure since the last call.
    pub fn take_error(&self) -> Option<String> {
        self.first_error.lock().take()
    }
}

impl Plugin for TranspilePlugin {
    fn name(&self) -> Cow<'static, str> {
        "tandem-transpile".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let output = self.output.clone();
        let loaded = Arc::clone(&self.loaded);
        let first_error = Arc::clone(&self.first_error);

        async move {
            // Virtual modules start with a NUL byte and have no file behind them.
            if id.starts_with('\0') {
                return Ok(None);
            }

            let path = PathBuf::from(&id);
            if !path.is_file() {
                return Ok(None);
            }
            loaded.lock().insert(path.clone());

            if !is_recognized(&path) {
                return Ok(None);
            }

            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read module {}", path.display()))?;

            let options = TranspileOptions {
                source_map_path: Some(path.clone()),
                ..TranspileOptions::default()
            };

            match transpile(&source, &path, &options) {
                Ok(transpiled) => {
                    let map = transpiled
                        .map
                        .as_deref()
                        .map(SourceMap::from_json_string)
                        .transpose()
                        .with_context(|| format!("Invalid source map for {}", path.display()))?;

                    Ok(Some(HookLoadOutput {
                        code: transpiled.code.into(),
                        map,
                        module_type: Some(ModuleType::Js),
                        ..Default::default()
                    }))
                }
                Err(e) => {
                    let message = e.to_string();
                    first_error.lock().get_or_insert_with(|| message.clone());
                    Err(anyhow::anyhow!(message))
                        .with_context(|| format!("while bundling {}", output.display()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_loaded_drains() {
        let plugin = TranspilePlugin::new("/app/.build/public/player.js");
        plugin.loaded.lock().insert(PathBuf::from("/app/src/clients/player.js"));

        assert_eq!(plugin.take_loaded().len(), 1);
        assert!(plugin.take_loaded().is_empty());
    }

    #[test]
    fn test_take_error_keeps_first() {
        let plugin = TranspilePlugin::new("/app/.build/public/player.js");
        plugin.first_error.lock().get_or_insert_with(|| "first".to_string());
        plugin.first_error.lock().get_or_insert_with(|| "second".to_string());

        assert_eq!(plugin.take_error().as_deref(), Some("first"));
        assert!(plugin.take_error().is_none());
    }
}
