use crate::config::toml_config::{InstallerSection, MANIFEST_PLACEHOLDER};
use crate::domain::model::Manifest;
use crate::domain::ports::Installer;
use crate::utils::error::{Result, UnitError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Runs an external installer tool (pip by default) as a child process.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    upgrade_args: Vec<String>,
    install_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandInstaller {
    pub fn new(section: &InstallerSection) -> Self {
        Self {
            program: section.program.clone(),
            upgrade_args: section.upgrade_args.clone(),
            install_args: section.install_args.clone(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn install_args_for(&self, manifest: &Manifest) -> Vec<String> {
        let manifest_path = manifest.path.display().to_string();
        self.install_args
            .iter()
            .map(|arg| arg.replace(MANIFEST_PLACEHOLDER, &manifest_path))
            .collect()
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        tracing::debug!("Running installer: {} {}", self.program, args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| UnitError::DependencyResolutionError {
                message: format!("failed to run `{}`: {}", self.program, e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            tracing::debug!("  {}", line);
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();

        Err(UnitError::DependencyResolutionError {
            message: format!(
                "`{} {}` exited with {}{}",
                self.program,
                args.join(" "),
                output.status,
                if tail.is_empty() {
                    String::new()
                } else {
                    format!(": {}", tail.join(" | "))
                }
            ),
        })
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn upgrade_self(&self) -> Result<()> {
        if self.upgrade_args.is_empty() {
            tracing::debug!("No upgrade command configured for {}", self.program);
            return Ok(());
        }
        self.run(&self.upgrade_args).await
    }

    async fn install(&self, manifest: &Manifest) -> Result<()> {
        let args = self.install_args_for(manifest);
        self.run(&args).await
    }

    fn describe(&self) -> String {
        self.program.clone()
    }
}
