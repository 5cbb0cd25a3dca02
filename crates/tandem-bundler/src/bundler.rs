//! Per-role client bundling with contained failures.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use path_clean::PathClean;
use rolldown::{BundlerBuilder, BundlerOptions};
use rolldown_plugin::__inner::SharedPluginable;
use rustc_hash::FxHashSet;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::diagnostics::{DiagnosticKind, ExtractedDiagnostic};
use crate::entries::{sibling_entries, to_input_items};
use crate::error_artifact::error_artifact;
use crate::plugin::TranspilePlugin;
use crate::settings::BundleSettings;
use crate::writer::{write_atomic, write_bundle_to};
use crate::{Error, Result};

/// Result of one bundle pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// Bundle and its companions written.
    Bundled { files: Vec<PathBuf> },
    /// Build failed; an error artifact now sits at the output path.
    Failed { message: String },
}

impl BundleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BundleOutcome::Bundled { .. })
    }
}

/// Bundles one role's entry point into a single browser-loadable file.
#[derive(Debug, Clone)]
pub struct ClientBundler {
    entry: PathBuf,
    output: PathBuf,
    output_stem: String,
    cwd: PathBuf,
    settings: BundleSettings,
    plugin: TranspilePlugin,
}

impl ClientBundler {
    /// Create a bundler writing `entry`'s bundle to `output`.
    ///
    /// Relative paths are resolved against `cwd`, which is also the prefix
    /// shortened to `.` in error artifacts.
    ///
    /// # Errors
    ///
    /// Fails when `entry` does not exist or `output` has no file name.
    pub fn new(
        entry: impl AsRef<Path>,
        output: impl AsRef<Path>,
        cwd: impl Into<PathBuf>,
        settings: BundleSettings,
    ) -> Result<Self> {
        let cwd = cwd.into().clean();
        let entry = cwd.join(entry.as_ref()).clean();
        let output = cwd.join(output.as_ref()).clean();

        if !entry.is_file() {
            return Err(Error::EntryNotFound(entry));
        }

        let output_stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidOutputPath(output.display().to_string()))?;

        let plugin = TranspilePlugin::new(&output);

        Ok(Self {
            entry,
            output,
            output_stem,
            cwd,
            settings,
            plugin,
        })
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    fn output_dir(&self) -> &Path {
        self.output.parent().unwrap_or(self.cwd.as_path())
    }

    /// Build once.
    ///
    /// Compile and bundle failures never surface as errors: they are written
    /// to the output path as an error artifact and reported as
    /// [`BundleOutcome::Failed`].
    pub async fn build(&self) -> BundleOutcome {
        self.build_tracked().await.0
    }

    /// Build and return what the graph touched.
    async fn build_tracked(&self) -> (BundleOutcome, GraphTrace) {
        self.plugin.take_loaded();
        self.plugin.take_error();

        let result = self.run_rolldown().await;
        let mut trace = GraphTrace {
            loaded: self.plugin.take_loaded(),
            missing_dirs: FxHashSet::default(),
        };
        let plugin_error = self.plugin.take_error();

        let outcome = match result {
            Ok(files) => {
                for file in &files {
                    tracing::info!("bundled {}", file.display());
                }
                BundleOutcome::Bundled { files }
            }
            Err(e) => {
                if let Error::Bundler(diagnostics) = &e {
                    trace.missing_dirs = unresolved_import_dirs(diagnostics);
                }
                let message = plugin_error.unwrap_or_else(|| first_message(&e));
                self.contain_failure(message)
            }
        };

        (outcome, trace)
    }

    async fn run_rolldown(&self) -> Result<Vec<PathBuf>> {
        let entries = sibling_entries(&self.entry, &self.output_stem)?;
        let options = self.rolldown_options(&entries);
        let plugins: Vec<SharedPluginable> = vec![Arc::new(self.plugin.clone())];

        let mut bundler = BundlerBuilder::default()
            .with_options(options)
            .with_plugins(plugins)
            .build()
            .map_err(|e| Error::from_rolldown_batch(&e, &self.cwd))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| Error::from_rolldown_batch(&e, &self.cwd))?;

        write_bundle_to(&output, self.output_dir())
    }

    fn rolldown_options(&self, entries: &[crate::entries::BundleEntry]) -> BundlerOptions {
        BundlerOptions {
            input: Some(to_input_items(entries)),
            cwd: Some(self.cwd.clone()),
            dir: Some(self.output_dir().to_string_lossy().into_owned()),
            format: Some(self.settings.output_format()),
            platform: Some(self.settings.rolldown_platform()),
            minify: Some(self.settings.minify_options()),
            keep_names: Some(self.settings.keep_names),
            sourcemap: self.settings.sourcemap_type(),
            external: Some(self.settings.is_external()),
            ..Default::default()
        }
    }

    fn contain_failure(&self, message: String) -> BundleOutcome {
        tracing::error!("bundle {} failed:\n{}", self.output.display(), message);

        let artifact = error_artifact(&message, &self.cwd);
        if let Err(e) = write_atomic(&self.output, artifact.as_bytes()) {
            tracing::error!("cannot write error artifact: {}", e);
        }

        BundleOutcome::Failed { message }
    }

    /// Build, then rebuild whenever a file of the module graph changes.
    ///
    /// Watched: every file loaded by the last build, the entry directory and,
    /// after a failure, the directories unresolved imports point into. A
    /// failed rebuild only adds to the loaded set, so fixing a file that
    /// broke the graph still triggers the next rebuild.
    pub async fn watch(self, settle: Duration) -> Result<BundleWatch> {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Err(e) => tracing::warn!("bundle watcher error: {}", e),
            }
        })?;

        let entry_dir = self
            .entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone());
        watcher.watch(&entry_dir, RecursiveMode::NonRecursive)?;

        let (outcome, trace) = self.build_tracked().await;
        let mut tracked = WatchedSet::new(entry_dir);
        tracked.update(&mut watcher, trace, outcome.is_success());

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                let first = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    path = rx.recv() => match path {
                        Some(path) => path,
                        None => break,
                    },
                };

                let mut batch = vec![first];
                while let Ok(Some(path)) = tokio::time::timeout(settle, rx.recv()).await {
                    batch.push(path);
                }

                if !batch.iter().any(|p| tracked.is_relevant(p)) {
                    continue;
                }

                tracing::debug!("rebuilding {}", self.output.display());
                let (outcome, trace) = self.build_tracked().await;
                tracked.update(&mut watcher, trace, outcome.is_success());
            }

            drop(watcher);
            tracing::debug!("stopped bundle watch for {}", self.output.display());
        });

        Ok(BundleWatch {
            shutdown: Some(shutdown_tx),
            handle,
        })
    }
}

/// Files a build loaded, and where the files it could not find would appear.
#[derive(Debug, Default)]
struct GraphTrace {
    loaded: FxHashSet<PathBuf>,
    missing_dirs: FxHashSet<PathBuf>,
}

/// Files and directories a rebuild context listens to.
struct WatchedSet {
    entry_dir: PathBuf,
    files: FxHashSet<PathBuf>,
    missing_dirs: FxHashSet<PathBuf>,
    dirs: FxHashSet<PathBuf>,
}

impl WatchedSet {
    fn new(entry_dir: PathBuf) -> Self {
        Self {
            entry_dir,
            files: FxHashSet::default(),
            missing_dirs: FxHashSet::default(),
            dirs: FxHashSet::default(),
        }
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if self.files.contains(path) {
            return true;
        }
        path.parent()
            .is_some_and(|dir| dir == self.entry_dir || self.missing_dirs.contains(dir))
    }

    /// Replace the file set after a success, extend it after a failure, and
    /// keep the directory watches in line with it.
    fn update(&mut self, watcher: &mut RecommendedWatcher, trace: GraphTrace, success: bool) {
        if success {
            self.files = trace.loaded;
        } else {
            self.files.extend(trace.loaded);
        }
        self.missing_dirs = trace.missing_dirs;

        let wanted = self.wanted_dirs();

        for dir in self.dirs.difference(&wanted) {
            let _ = watcher.unwatch(dir);
        }
        for dir in wanted.difference(&self.dirs) {
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                tracing::warn!("cannot watch {}: {}", dir.display(), e);
            }
        }
        self.dirs = wanted;
    }

    /// Directories are watched rather than files so editors that save by
    /// rename keep being observed.
    fn wanted_dirs(&self) -> FxHashSet<PathBuf> {
        self.files
            .iter()
            .filter_map(|f| f.parent().map(Path::to_path_buf))
            .chain(self.missing_dirs.iter().cloned())
            .filter(|d| *d != self.entry_dir)
            .collect()
    }
}

/// Nearest existing directory of every relative or absolute import that
/// failed to resolve, so creating the missing file triggers a rebuild.
fn unresolved_import_dirs(diagnostics: &[ExtractedDiagnostic]) -> FxHashSet<PathBuf> {
    diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::UnresolvedImport)
        .filter_map(|d| {
            let importer = Path::new(d.file.as_deref()?);
            let specifier = d.specifier.as_deref()?;
            if !(specifier.starts_with('.') || specifier.starts_with('/')) {
                return None;
            }
            let missing = importer.parent()?.join(specifier).clean();
            missing.ancestors().skip(1).find(|dir| dir.is_dir()).map(Path::to_path_buf)
        })
        .collect()
}

/// Handle on a running rebuild context.
pub struct BundleWatch {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl BundleWatch {
    /// End the rebuild context and wait for it to wind down.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("bundle watch ended abnormally: {}", e);
        }
    }
}

fn first_message(error: &Error) -> String {
    match error {
        Error::Bundler(diagnostics) => diagnostics
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_missing_entry() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = ClientBundler::new(
            "src/clients/player.js",
            ".build/public/player.js",
            temp.path(),
            BundleSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }

    #[test]
    fn test_relative_paths_resolve_against_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let clients = temp.path().join("src/clients");
        std::fs::create_dir_all(&clients).unwrap();
        std::fs::write(clients.join("player.js"), "").unwrap();

        let bundler = ClientBundler::new(
            "src/clients/player.js",
            ".build/public/player.js",
            temp.path(),
            BundleSettings::default(),
        )
        .unwrap();

        assert_eq!(bundler.entry(), clients.join("player.js"));
        assert_eq!(
            bundler.output_path(),
            temp.path().join(".build/public/player.js")
        );
    }

    #[test]
    fn test_watched_set_relevance() {
        let mut set = WatchedSet::new(PathBuf::from("/app/src/clients"));
        set.files.insert(PathBuf::from("/app/src/lib/utils.js"));

        assert!(set.is_relevant(Path::new("/app/src/lib/utils.js")));
        assert!(set.is_relevant(Path::new("/app/src/clients/new.js")));
        assert!(!set.is_relevant(Path::new("/app/src/lib/other.js")));

        set.missing_dirs.insert(PathBuf::from("/app/src/shared"));
        assert!(set.is_relevant(Path::new("/app/src/shared/missing.ts")));
        assert!(set.wanted_dirs().contains(Path::new("/app/src/shared")));
    }

    #[test]
    fn test_unresolved_import_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src/clients")).unwrap();
        std::fs::create_dir_all(root.join("src/shared")).unwrap();

        let unresolved = |specifier: &str| ExtractedDiagnostic {
            kind: DiagnosticKind::UnresolvedImport,
            message: format!("Could not resolve '{specifier}' in src/clients/player.ts"),
            file: Some(root.join("src/clients/player.ts").to_string_lossy().into_owned()),
            help: None,
            specifier: Some(specifier.to_string()),
        };

        let dirs = unresolved_import_dirs(&[
            unresolved("../shared/missing.ts"),
            // Nearest existing ancestor when the directory itself is missing.
            unresolved("../widgets/deep/missing.ts"),
            // Bare specifiers are treated as external.
            unresolved("left-pad"),
        ]);

        assert_eq!(dirs.len(), 2);
        assert!(dirs.contains(&root.join("src/shared")));
        assert!(dirs.contains(&root.join("src")));
    }
}
