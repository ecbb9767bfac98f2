use crate::domain::model::StartupCommand;
use crate::utils::error::{Result, UnitError};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

/// Starts a built unit using the command registered at build time.
#[derive(Debug, Clone)]
pub struct Launcher {
    root: PathBuf,
    command: StartupCommand,
}

impl Launcher {
    /// Reads `unit.toml` from the unit root. The unit runs from this root
    /// even if it was built somewhere else and moved.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        let descriptor = StartupCommand::descriptor_path(&root);

        let content = std::fs::read_to_string(&descriptor).map_err(|e| UnitError::LaunchError {
            message: format!("no startup command registered at {}: {}", descriptor.display(), e),
        })?;
        let command: StartupCommand = toml::from_str(&content)?;

        Ok(Self { root, command })
    }

    pub fn command(&self) -> &StartupCommand {
        &self.command
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs the registered command and waits for it. `runtime_args` never
    /// reach the child; the command is fixed once the unit is built.
    pub async fn launch(&self, runtime_args: &[String]) -> Result<ExitStatus> {
        if !runtime_args.is_empty() {
            tracing::warn!(
                "Ignoring {} runtime argument(s); the startup command is fixed",
                runtime_args.len()
            );
        }

        let entry = self.command.entry_in(&self.root);
        if !entry.is_file() {
            return Err(UnitError::EntryMissingError {
                path: entry.display().to_string(),
            });
        }

        tracing::info!(
            "▶️ Launching `{}` in {}",
            self.command.describe(),
            self.root.display()
        );

        let mut child = Command::new(&self.command.program)
            .arg(&self.command.entry)
            .current_dir(&self.root)
            .spawn()
            .map_err(|e| UnitError::LaunchError {
                message: format!("failed to start `{}`: {}", self.command.program, e),
            })?;

        let status = child.wait().await?;
        tracing::info!("Unit exited with {}", status);
        Ok(status)
    }
}
