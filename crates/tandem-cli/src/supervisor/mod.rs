//! Supervised execution of built node roles.
//!
//! A role is launched as `node --trace-warnings --enable-source-maps --watch`
//! against its built artifact; restarts on change are left to node itself.
//! The child inherits the standard streams of the CLI.

mod node;
mod port;

pub use node::{MIN_NODE_MAJOR, check_node_version, node_major, parse_major};
pub use port::{DEFAULT_INSPECT_PORT, find_available_port};

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::config::{AppConfig, ProjectLayout, RoleRuntime};
use crate::error::{ConfigError, ProcessError, Result};
use crate::orchestrator::{SERVER_ROLE, role_candidates};

const NODE_PROGRAM: &str = "node";
const BASE_FLAGS: &[&str] = &["--trace-warnings", "--enable-source-maps"];

/// Launches built roles under the host runtime's watch mode.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    layout: ProjectLayout,
    config: Option<AppConfig>,
    program: String,
}

impl ProcessSupervisor {
    pub fn new(layout: ProjectLayout, config: Option<AppConfig>) -> Self {
        Self {
            layout,
            config,
            program: NODE_PROGRAM.to_string(),
        }
    }

    /// Run `program` instead of `node`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Built artifact to run for `role`, relative to the project directory.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] when a client role is requested without an
    ///   application config
    /// - [`ProcessError::UndeclaredRole`] / [`ProcessError::NotNodeRole`] when
    ///   the role is not a declared node client
    /// - [`ProcessError::ArtifactMissing`] when the role has not been built
    pub fn locate_artifact(&self, role: &str) -> Result<PathBuf> {
        if role != SERVER_ROLE {
            self.check_node_role(role)?;
        }

        let searched = role_candidates(&self.layout.build_root(), role, &["js"]);
        match searched.iter().find(|path| path.is_file()) {
            Some(found) => Ok(self.layout.display_path(found).to_path_buf()),
            None => Err(ProcessError::ArtifactMissing {
                role: role.to_string(),
                searched: searched
                    .iter()
                    .map(|p| self.layout.display_path(p).to_path_buf())
                    .collect(),
            }
            .into()),
        }
    }

    fn check_node_role(&self, role: &str) -> Result<()> {
        let config_path = crate::config::config_display_path(&self.layout);
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ConfigError::NotFound(self.layout.cwd.join(&config_path)))?;

        let descriptor = config.role(role).ok_or_else(|| ProcessError::UndeclaredRole {
            role: role.to_string(),
            config: config_path,
        })?;

        match descriptor.resolve(role)? {
            RoleRuntime::Node => Ok(()),
            runtime => Err(ProcessError::NotNodeRole {
                role: role.to_string(),
                runtime: runtime.to_string(),
            }
            .into()),
        }
    }

    /// Command-line arguments for running `artifact`.
    pub fn launch_args(artifact: &std::path::Path, inspect_port: Option<u16>) -> Vec<String> {
        let mut args: Vec<String> = BASE_FLAGS.iter().map(|f| f.to_string()).collect();
        if let Some(port) = inspect_port {
            args.push(format!("--inspect=127.0.0.1:{port}"));
        }
        args.push("--watch".to_string());
        args.push(artifact.display().to_string());
        args
    }

    /// Check preconditions and start `role`.
    pub async fn launch(&self, role: &str, inspect: bool) -> Result<SupervisedProcess> {
        check_node_version(&self.program).await;
        let artifact = self.locate_artifact(role)?;

        let port = if inspect {
            Some(find_available_port(DEFAULT_INSPECT_PORT)?)
        } else {
            None
        };

        let args = Self::launch_args(&artifact, port);
        tracing::debug!("{} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.layout.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        Ok(SupervisedProcess {
            pid: child.id(),
            child,
            args,
            inspect_port: port,
        })
    }
}

/// Handle on a launched role.
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    pid: Option<u32>,
    args: Vec<String>,
    inspect_port: Option<u16>,
}

impl SupervisedProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Arguments the runtime was started with.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn inspect_port(&self) -> Option<u16> {
        self.inspect_port
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Kill the process and reap it.
    pub async fn terminate(&mut self) -> Result<()> {
        if let Err(e) = self.child.start_kill() {
            // Already exited.
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(e.into());
            }
        }
        self.child.wait().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleDescriptor;
    use crate::error::CliError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn supervisor(clients: &[(&str, RoleRuntime)]) -> (TempDir, ProcessSupervisor) {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        for (role, runtime) in clients {
            config
                .clients
                .insert(role.to_string(), RoleDescriptor::new(*runtime));
        }
        let supervisor = ProcessSupervisor::new(ProjectLayout::new(temp.path()), Some(config));
        (temp, supervisor)
    }

    fn touch(root: &Path, path: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_launch_args_order() {
        let plain = ProcessSupervisor::launch_args(Path::new(".build/server.js"), None);
        assert_eq!(
            plain,
            vec![
                "--trace-warnings",
                "--enable-source-maps",
                "--watch",
                ".build/server.js"
            ]
        );

        let inspect = ProcessSupervisor::launch_args(Path::new(".build/server.js"), Some(9230));
        assert_eq!(inspect[2], "--inspect=127.0.0.1:9230");
        assert_eq!(inspect[3], "--watch");
    }

    #[test]
    fn test_server_artifact() {
        let (temp, supervisor) = supervisor(&[]);
        touch(temp.path(), ".build/server/index.js");

        assert_eq!(
            supervisor.locate_artifact("server").unwrap(),
            PathBuf::from(".build/server/index.js")
        );
    }

    #[test]
    fn test_server_without_build() {
        let (_temp, supervisor) = supervisor(&[]);
        let err = supervisor.locate_artifact("server").unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, CliError::Process(ProcessError::ArtifactMissing { .. })));
        assert!(message.contains("\"server\""));
        assert!(message.contains(".build/server.js"));
    }

    #[test]
    fn test_undeclared_role() {
        let (_temp, supervisor) = supervisor(&[("thing", RoleRuntime::Node)]);
        let err = supervisor.locate_artifact("ghost").unwrap_err();
        assert!(matches!(
            err,
            CliError::Process(ProcessError::UndeclaredRole { ref role, .. }) if role == "ghost"
        ));
    }

    #[test]
    fn test_browser_role_is_rejected() {
        let (temp, supervisor) = supervisor(&[("player", RoleRuntime::Browser)]);
        touch(temp.path(), ".build/clients/player.js");

        let err = supervisor.locate_artifact("player").unwrap_err();
        assert!(matches!(
            err,
            CliError::Process(ProcessError::NotNodeRole { ref runtime, .. }) if runtime == "browser"
        ));
    }

    #[test]
    fn test_node_client_artifact() {
        let (temp, supervisor) = supervisor(&[("thing", RoleRuntime::Node)]);
        touch(temp.path(), ".build/clients/thing.js");

        assert_eq!(
            supervisor.locate_artifact("thing").unwrap(),
            PathBuf::from(".build/clients/thing.js")
        );
    }

    #[test]
    fn test_client_without_config() {
        let temp = TempDir::new().unwrap();
        let supervisor = ProcessSupervisor::new(ProjectLayout::new(temp.path()), None);
        assert!(matches!(
            supervisor.locate_artifact("thing").unwrap_err(),
            CliError::Config(ConfigError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure_names_program() {
        let (temp, supervisor) = supervisor(&[]);
        touch(temp.path(), ".build/server.js");
        let supervisor = supervisor.with_program("tandem-no-such-runtime");

        let err = supervisor.launch("server", false).await.unwrap_err();
        assert!(err.to_string().contains("tandem-no-such-runtime"));
    }
}
