//! Compile-or-copy pipeline mirroring a source root into a build root.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use walkdir::WalkDir;

use crate::paths::{self, is_recognized, map_path, source_map_reference};
use crate::transpile::{TranspileOptions, transpile};
use crate::watcher::{SourceWatcher, WatchEvent, WatchEventKind};
use crate::{Error, Result};

/// What happened to a single source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Transpiled to the contained artifact path.
    Compiled(PathBuf),
    /// Copied byte-for-byte to the contained path.
    Copied(PathBuf),
    /// Artifact (and map, or mirrored directory) deleted.
    Removed(PathBuf),
    /// Nothing to do: directory, or a file that vanished before it was read.
    Skipped,
}

/// Totals of a one-shot compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub compiled: usize,
    pub copied: usize,
    pub failed: usize,
}

/// Converts files from a source root into a build root.
#[derive(Debug, Clone)]
pub struct SourceCompiler {
    src_root: PathBuf,
    build_root: PathBuf,
}

impl SourceCompiler {
    pub fn new(src_root: impl Into<PathBuf>, build_root: impl Into<PathBuf>) -> Self {
        Self {
            src_root: src_root.into(),
            build_root: build_root.into(),
        }
    }

    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Build-root path the given source path is written to.
    pub fn output_path(&self, path: &Path) -> Result<PathBuf> {
        paths::output_path(&self.src_root, &self.build_root, path)
    }

    /// Transpile or copy one file.
    ///
    /// Directories and paths that no longer exist are skipped.
    pub fn compile_file(&self, path: &Path) -> Result<CompileOutcome> {
        if !path.is_file() {
            return Ok(CompileOutcome::Skipped);
        }

        let output = self.output_path(path)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("Failed to create directory {}", parent.display()), e)
            })?;
        }

        if !is_recognized(path) {
            fs::copy(path, &output).map_err(|e| {
                Error::io(format!("Failed to copy {}", path.display()), e)
            })?;
            tracing::debug!("copied {} -> {}", path.display(), output.display());
            return Ok(CompileOutcome::Copied(output));
        }

        let source = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;

        let output_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let options = TranspileOptions {
            source_map_path: Some(paths::relative_path(output_dir, path)),
            ..TranspileOptions::default()
        };
        let transpiled = transpile(&source, path, &options)?;

        let mut code = transpiled.code;
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&source_map_reference(&output));
        code.push('\n');

        fs::write(&output, code)
            .map_err(|e| Error::io(format!("Failed to write {}", output.display()), e))?;

        if let Some(map) = transpiled.map {
            let map_file = map_path(&output);
            fs::write(&map_file, map).map_err(|e| {
                Error::io(format!("Failed to write {}", map_file.display()), e)
            })?;
        }

        tracing::debug!("compiled {} -> {}", path.display(), output.display());
        Ok(CompileOutcome::Compiled(output))
    }

    /// Delete whatever `path` was mirrored to.
    ///
    /// A missing artifact or map is not an error.
    pub fn remove_file(&self, path: &Path) -> Result<CompileOutcome> {
        let mirrored = paths::mirror_path(&self.src_root, &self.build_root, path)?;

        if mirrored.is_dir() {
            fs::remove_dir_all(&mirrored).map_err(|e| {
                Error::io(format!("Failed to remove {}", mirrored.display()), e)
            })?;
            tracing::debug!("deleted {}", mirrored.display());
            return Ok(CompileOutcome::Removed(mirrored));
        }

        let artifact = self.output_path(path)?;
        remove_if_exists(&artifact)?;
        if is_recognized(path) {
            remove_if_exists(&map_path(&artifact))?;
        }

        tracing::debug!("deleted {}", artifact.display());
        Ok(CompileOutcome::Removed(artifact))
    }

    /// Apply one watch event to the build root.
    ///
    /// A directory that appears as a whole (moved in) is compiled file by
    /// file, since its contents produce no events of their own.
    pub fn apply_event(&self, event: &WatchEvent) -> Vec<Result<CompileOutcome>> {
        match event.kind {
            WatchEventKind::Removed => vec![self.remove_file(&event.path)],
            WatchEventKind::Added if event.path.is_dir() => walk_files(&event.path)
                .map(|file| self.compile_file(&file))
                .collect(),
            WatchEventKind::Added | WatchEventKind::Changed => {
                vec![self.compile_file(&event.path)]
            }
        }
    }

    /// Convert every file under the source root concurrently.
    ///
    /// Per-file failures are logged and counted; they never abort the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceRootMissing`] when the source root does not
    /// exist.
    pub async fn compile_all(&self) -> Result<CompileReport> {
        if !self.src_root.is_dir() {
            return Err(Error::SourceRootMissing(self.src_root.clone()));
        }

        let files: Vec<PathBuf> = walk_files(&self.src_root).collect();
        tracing::debug!("compiling {} files from {}", files.len(), self.src_root.display());

        let semaphore = Arc::new(Semaphore::new(num_cpus::get().max(1)));
        let mut join_set = JoinSet::new();

        for file in files {
            let compiler = self.clone();
            let permit = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await;
                let path = file.clone();
                let result = tokio::task::spawn_blocking(move || compiler.compile_file(&path))
                    .await
                    .unwrap_or_else(|e| {
                        Err(Error::Transpile {
                            file: file.clone(),
                            message: format!("compile task panicked: {e}"),
                        })
                    });
                (file, result)
            });
        }

        let mut report = CompileReport::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(CompileOutcome::Compiled(_)))) => report.compiled += 1,
                Ok((_, Ok(CompileOutcome::Copied(_)))) => report.copied += 1,
                Ok((_, Ok(_))) => {}
                Ok((file, Err(e))) => {
                    tracing::error!("{} ({})", e, file.display());
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("compile task failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Keep the build root in sync with the source root until stopped.
    ///
    /// Pre-existing files are not recompiled; run [`Self::compile_all`]
    /// first for a complete tree.
    pub fn watch(&self, settle: Duration) -> Result<CompileWatch> {
        let mut watcher = SourceWatcher::subscribe(&self.src_root, settle)?;
        // Events carry canonical paths; the compiler must agree on the root.
        let mut compiler = self.clone();
        compiler.src_root = watcher.root().to_path_buf();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = watcher.next() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                let worker = compiler.clone();
                let applied =
                    tokio::task::spawn_blocking(move || (worker.apply_event(&event), event)).await;

                match applied {
                    Ok((results, event)) => {
                        for result in results {
                            log_outcome(&event.path, result);
                        }
                    }
                    Err(e) => tracing::error!("compile task failed: {}", e),
                }
            }

            watcher.unsubscribe();
        });

        Ok(CompileWatch {
            shutdown: Some(shutdown_tx),
            handle,
        })
    }
}

/// Handle on a running continuous compilation.
pub struct CompileWatch {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl CompileWatch {
    /// Unsubscribe from the source root and wait for the loop to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("compile watch ended abnormally: {}", e);
        }
    }
}

fn log_outcome(source: &Path, result: Result<CompileOutcome>) {
    match result {
        Ok(CompileOutcome::Compiled(out)) => tracing::info!("compiled {}", out.display()),
        Ok(CompileOutcome::Copied(out)) => tracing::info!("copied {}", out.display()),
        Ok(CompileOutcome::Removed(out)) => tracing::info!("deleted {}", out.display()),
        Ok(CompileOutcome::Skipped) => {}
        Err(e) => tracing::error!("{} ({})", e, source.display()),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(format!("Failed to remove {}", path.display()), e)),
    }
}

fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SourceCompiler) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let compiler = SourceCompiler::new(&src, temp.path().join(".build"));
        (temp, compiler)
    }

    #[test]
    fn test_compile_file_skips_directories() {
        let (_temp, compiler) = setup();
        let dir = compiler.src_root().join("lib");
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(compiler.compile_file(&dir).unwrap(), CompileOutcome::Skipped);
        assert!(!compiler.build_root().join("lib").exists());
    }

    #[test]
    fn test_remove_tolerates_missing_artifacts() {
        let (_temp, compiler) = setup();
        let gone = compiler.src_root().join("gone.ts");

        let outcome = compiler.remove_file(&gone).unwrap();
        assert_eq!(
            outcome,
            CompileOutcome::Removed(compiler.build_root().join("gone.js"))
        );
    }

    #[test]
    fn test_remove_directory_removes_mirror() {
        let (_temp, compiler) = setup();
        let mirrored = compiler.build_root().join("lib");
        fs::create_dir_all(&mirrored).unwrap();
        fs::write(mirrored.join("a.js"), "").unwrap();

        compiler.remove_file(&compiler.src_root().join("lib")).unwrap();
        assert!(!mirrored.exists());
    }

    #[test]
    fn test_apply_event_added_directory_compiles_contents() {
        let (_temp, compiler) = setup();
        let dir = compiler.src_root().join("moved");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.ts"), "export const a: number = 1;\n").unwrap();
        fs::write(dir.join("b.txt"), "plain").unwrap();

        let results = compiler.apply_event(&WatchEvent::new(WatchEventKind::Added, &dir));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(compiler.build_root().join("moved/a.js").exists());
        assert!(compiler.build_root().join("moved/b.txt").exists());
    }

    #[tokio::test]
    async fn test_compile_all_missing_root() {
        let temp = TempDir::new().unwrap();
        let compiler = SourceCompiler::new(temp.path().join("nope"), temp.path().join(".build"));

        let err = compiler.compile_all().await.unwrap_err();
        assert!(matches!(err, Error::SourceRootMissing(_)));
    }
}
