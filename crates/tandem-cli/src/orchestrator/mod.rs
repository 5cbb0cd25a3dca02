//! Build orchestration.
//!
//! [`BuildOrchestrator`] checks the preconditions of a build, then runs the
//! [`SourceCompiler`] over the whole source tree and one [`ClientBundler`]
//! per browser role. Compilation and bundling run concurrently and never
//! wait on each other.
//!
//! Preconditions are checked before anything is written:
//!
//! 1. `src/public` must not exist.
//! 2. The bundler override (`bundler.config.json` or a programmatic one)
//!    must produce valid settings.
//! 3. Every browser role must have an entry point.

mod entry;

pub use entry::{SERVER_ROLE, locate_entry_point, role_candidates};

use std::time::{Duration, Instant};

use tandem_bundler::{
    BundleOutcome, BundleSettings, BundleWatch, ClientBundler, ConfigOverride, JsonFileOverride,
    resolve_settings,
};
use tandem_compiler::{CompileReport, CompileWatch, DEFAULT_SETTLE, SourceCompiler};
use tokio::task::JoinSet;

use crate::config::{ProjectLayout, RoleRuntime};
use crate::error::{BuildError, CliError, Result};

/// Outcome of one full pass.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub compile: CompileReport,
    /// Bundle outcome per browser role, in role order.
    pub bundles: Vec<(String, BundleOutcome)>,
    pub duration: Duration,
}

impl BuildReport {
    /// True when every file compiled and every bundle succeeded.
    pub fn is_clean(&self) -> bool {
        self.compile.failed == 0 && self.bundles.iter().all(|(_, o)| o.is_success())
    }
}

/// Compiler and bundlers ready to run, preconditions checked.
struct Prepared {
    compiler: SourceCompiler,
    bundlers: Vec<(String, ClientBundler)>,
}

/// Drives the source compiler and the client bundlers for one project.
pub struct BuildOrchestrator {
    layout: ProjectLayout,
    roles: Vec<(String, RoleRuntime)>,
    settle: Duration,
    defaults: BundleSettings,
    config_override: Option<Box<dyn ConfigOverride>>,
}

impl BuildOrchestrator {
    pub fn new(layout: ProjectLayout, roles: Vec<(String, RoleRuntime)>) -> Self {
        Self {
            layout,
            roles,
            settle: DEFAULT_SETTLE,
            defaults: BundleSettings::default(),
            config_override: None,
        }
    }

    /// Use `hook` instead of discovering `bundler.config.json`.
    pub fn with_override(mut self, hook: Box<dyn ConfigOverride>) -> Self {
        self.config_override = Some(hook);
        self
    }

    /// Debounce window for both watchers.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Browser roles, in declaration order.
    pub fn browser_roles(&self) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .filter(|(_, runtime)| *runtime == RoleRuntime::Browser)
            .map(|(role, _)| role.as_str())
    }

    fn check_reserved_path(&self) -> Result<()> {
        let reserved = self.layout.reserved_path();
        if reserved.exists() {
            return Err(
                BuildError::ReservedPath(self.layout.display_path(&reserved).to_path_buf()).into(),
            );
        }
        Ok(())
    }

    fn bundle_settings(&self) -> Result<BundleSettings> {
        if let Some(hook) = self.config_override.as_deref() {
            return Ok(resolve_settings(&self.defaults, Some(hook))?);
        }

        let discovered = JsonFileOverride::discover(&self.layout.cwd)?;
        if let Some(file) = &discovered {
            tracing::debug!("bundler override {}", file.path().display());
        }
        Ok(resolve_settings(
            &self.defaults,
            discovered.as_ref().map(|f| f as &dyn ConfigOverride),
        )?)
    }

    fn prepare(&self) -> Result<Prepared> {
        self.check_reserved_path()?;
        let settings = self.bundle_settings()?;

        let src_root = self.layout.src_root();
        let mut bundlers = Vec::new();
        for role in self.browser_roles() {
            let entry = locate_entry_point(&src_root, role).map_err(|e| self.relative(e))?;
            let bundler = ClientBundler::new(
                &entry,
                self.layout.bundle_output(role),
                self.layout.cwd.clone(),
                settings.clone(),
            )?;
            tracing::debug!("client {} entry {}", role, entry.display());
            bundlers.push((role.to_string(), bundler));
        }

        let compiler = SourceCompiler::new(src_root, self.layout.build_root());
        Ok(Prepared { compiler, bundlers })
    }

    fn relative(&self, err: BuildError) -> BuildError {
        match err {
            BuildError::EntryNotFound { role, searched } => BuildError::EntryNotFound {
                role,
                searched: searched
                    .iter()
                    .map(|p| self.layout.display_path(p).to_path_buf())
                    .collect(),
            },
            other => other,
        }
    }

    /// Compile the whole tree and build every bundle once.
    pub async fn build(&self) -> Result<BuildReport> {
        let started = Instant::now();
        let Prepared { compiler, bundlers } = self.prepare()?;

        let (compile, bundles) = tokio::join!(compiler.compile_all(), bundle_all(bundlers));

        Ok(BuildReport {
            compile: compile?,
            bundles,
            duration: started.elapsed(),
        })
    }

    /// Compile and bundle once, then keep both in sync until stopped.
    ///
    /// The source watcher subscribes before the initial compilation so no
    /// edit made during it is lost.
    pub async fn watch(&self) -> Result<WatchSession> {
        let started = Instant::now();
        let Prepared { compiler, bundlers } = self.prepare()?;

        let compile_watch = compiler.watch(self.settle)?;
        let (compile, bundles) =
            tokio::join!(compiler.compile_all(), watch_all(bundlers, self.settle));

        let bundles = match bundles {
            Ok(bundles) => bundles,
            Err(e) => {
                compile_watch.stop().await;
                return Err(e);
            }
        };
        let compile = match compile {
            Ok(report) => report,
            Err(e) => {
                let session = WatchSession {
                    compile: compile_watch,
                    bundles,
                    initial: None,
                };
                session.stop().await;
                return Err(e.into());
            }
        };

        tracing::debug!("initial pass done in {:?}", started.elapsed());
        Ok(WatchSession {
            compile: compile_watch,
            bundles,
            initial: Some(compile),
        })
    }
}

async fn bundle_all(bundlers: Vec<(String, ClientBundler)>) -> Vec<(String, BundleOutcome)> {
    let mut join_set = JoinSet::new();
    for (index, (role, bundler)) in bundlers.into_iter().enumerate() {
        join_set.spawn(async move { (index, role, bundler.build().await) });
    }

    let mut results = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!("bundle task failed: {}", e),
        }
    }

    results.sort_by_key(|(index, _, _)| *index);
    results
        .into_iter()
        .map(|(_, role, outcome)| (role, outcome))
        .collect()
}

async fn watch_all(
    bundlers: Vec<(String, ClientBundler)>,
    settle: Duration,
) -> Result<Vec<(String, BundleWatch)>> {
    let mut join_set = JoinSet::new();
    for (role, bundler) in bundlers {
        join_set.spawn(async move { (role, bundler.watch(settle).await) });
    }

    let mut watches = Vec::new();
    let mut first_error: Option<CliError> = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((role, Ok(watch))) => watches.push((role, watch)),
            Ok((role, Err(e))) => {
                tracing::error!("cannot watch client {}: {}", role, e);
                first_error.get_or_insert(e.into());
            }
            Err(e) => {
                first_error.get_or_insert(CliError::Custom(format!("bundle task failed: {e}")));
            }
        }
    }

    match first_error {
        None => Ok(watches),
        Some(e) => {
            for (_, watch) in watches {
                watch.stop().await;
            }
            Err(e)
        }
    }
}

/// Running watch-mode build.
pub struct WatchSession {
    compile: CompileWatch,
    bundles: Vec<(String, BundleWatch)>,
    initial: Option<CompileReport>,
}

impl WatchSession {
    /// Counts from the initial compilation.
    pub fn initial_compile(&self) -> Option<CompileReport> {
        self.initial
    }

    /// Roles with a live rebuild context.
    pub fn watched_roles(&self) -> impl Iterator<Item = &str> {
        self.bundles.iter().map(|(role, _)| role.as_str())
    }

    /// Unsubscribe the source watcher and end every rebuild context.
    pub async fn stop(self) {
        self.compile.stop().await;
        for (role, watch) in self.bundles {
            tracing::debug!("stopping client {}", role);
            watch.stop().await;
        }
    }
}
