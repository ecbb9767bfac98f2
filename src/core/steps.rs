use crate::core::materialize;
use crate::core::sequencer::{BuildContext, BuildStep};
use crate::domain::model::{Manifest, StartupCommand};
use crate::domain::ports::Installer;
use crate::utils::error::{Result, UnitError};
use crate::utils::validation::Validate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

/// Validates the configuration and creates the unit root.
pub struct PrepareRoot;

#[async_trait::async_trait]
impl BuildStep for PrepareRoot {
    fn name(&self) -> &str {
        "prepare-root"
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        ctx.config.validate()?;

        let root = ctx.config.root();
        fs::create_dir_all(&root)?;
        Ok(format!("root {}", root.display()))
    }
}

/// Copies the dependency manifest into the unit root.
pub struct MaterializeManifest;

#[async_trait::async_trait]
impl BuildStep for MaterializeManifest {
    fn name(&self) -> &str {
        "materialize-manifest"
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        let source = ctx.config.manifest_source();
        let content =
            fs::read_to_string(&source).map_err(|e| UnitError::DependencyResolutionError {
                message: format!("cannot read manifest {}: {}", source.display(), e),
            })?;

        let target = ctx.config.manifest_target();
        if !materialize::copy_file(&source, &target)? {
            tracing::debug!("Manifest {} already in place", target.display());
        }

        let manifest = Manifest::parse(&target, &content);
        if !manifest.is_pinned() {
            tracing::warn!(
                "Manifest {} has unpinned requirements; rebuilds may resolve different versions",
                source.display()
            );
        }

        let detail = format!(
            "{} requirement(s) -> {}",
            manifest.requirements.len(),
            target.display()
        );
        ctx.manifest = Some(manifest);
        Ok(detail)
    }
}

/// Upgrades the installer, then installs the manifest.
pub struct InstallDependencies {
    installer: Arc<dyn Installer>,
}

impl InstallDependencies {
    pub fn new(installer: Arc<dyn Installer>) -> Self {
        Self { installer }
    }
}

#[async_trait::async_trait]
impl BuildStep for InstallDependencies {
    fn name(&self) -> &str {
        "install-dependencies"
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        let manifest = ctx
            .manifest
            .as_ref()
            .ok_or_else(|| UnitError::DependencyResolutionError {
                message: "manifest was not materialized".to_string(),
            })?;

        tracing::debug!("Upgrading installer {}", self.installer.describe());
        self.installer.upgrade_self().await?;

        for req in &manifest.requirements {
            tracing::debug!(
                "  requires {}{}",
                req.name,
                req.constraint.as_deref().unwrap_or("")
            );
        }
        self.installer.install(manifest).await?;

        Ok(format!(
            "{} requirement(s) installed with {}",
            manifest.requirements.len(),
            self.installer.describe()
        ))
    }
}

/// Copies the source tree into `<root>/<source_subdir>`.
pub struct MaterializeSource;

#[async_trait::async_trait]
impl BuildStep for MaterializeSource {
    fn name(&self) -> &str {
        "materialize-source"
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        let source = ctx.config.source_dir();
        let target = ctx.config.source_target();

        let copied = materialize::copy_tree(&source, &target)?;
        Ok(format!("{} file(s) -> {}", copied, target.display()))
    }
}

/// Fails the build when the entry file is absent, instead of failing at launch.
pub struct VerifyEntry;

#[async_trait::async_trait]
impl BuildStep for VerifyEntry {
    fn name(&self) -> &str {
        "verify-entry"
    }

    fn should_execute(&self, ctx: &BuildContext) -> bool {
        ctx.config.unit.validate_entry
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        let entry = ctx.config.entry_path();
        if !entry.is_file() {
            return Err(UnitError::EntryMissingError {
                path: entry.display().to_string(),
            });
        }
        Ok(format!("entry {}", ctx.config.startup.entry))
    }
}

/// Writes `unit.toml` with the fixed startup command.
pub struct RegisterStartup;

#[async_trait::async_trait]
impl BuildStep for RegisterStartup {
    fn name(&self) -> &str {
        "register-startup"
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        let root = std::path::absolute(ctx.config.root())?;
        let command = StartupCommand {
            program: ctx.config.startup.interpreter.clone(),
            entry: ctx.config.startup.entry.clone(),
            working_dir: root.clone(),
            registered_at: chrono::Utc::now().to_rfc3339(),
        };

        let descriptor = StartupCommand::descriptor_path(&root);
        fs::write(&descriptor, toml::to_string_pretty(&command)?)?;

        Ok(format!("`{}` registered in {}", command.describe(), descriptor.display()))
    }
}

/// Zips the finished unit root when an archive path is configured.
pub struct ExportArchive;

#[async_trait::async_trait]
impl BuildStep for ExportArchive {
    fn name(&self) -> &str {
        "export-archive"
    }

    fn should_execute(&self, ctx: &BuildContext) -> bool {
        ctx.config.unit.archive.is_some()
    }

    async fn run(&self, ctx: &mut BuildContext) -> Result<String> {
        let archive = match &ctx.config.unit.archive {
            Some(path) => PathBuf::from(path),
            None => return Ok("no archive configured".to_string()),
        };

        let count = write_archive(&ctx.config.root(), &archive)?;
        Ok(format!("{} file(s) -> {}", count, archive.display()))
    }
}

/// Writes every file under `root` into a zip at `archive`, named relative to `root`.
pub fn write_archive(root: &Path, archive: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    if let Some(parent) = archive.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut zip = ZipWriter::new(fs::File::create(archive)?);
    for file in &files {
        let name = file
            .strip_prefix(root)
            .map_err(|e| UnitError::ConfigError {
                message: format!("{} is outside {}: {}", file.display(), root.display(), e),
            })?
            .to_string_lossy()
            .replace('\\', "/");

        zip.start_file::<_, ()>(name, file_options(file)?)?;
        zip.write_all(&fs::read(file)?)?;
    }
    zip.finish()?;

    Ok(files.len())
}

#[cfg(unix)]
fn file_options(path: &Path) -> Result<FileOptions<'static, ()>> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)?.permissions().mode();
    Ok(FileOptions::default().unix_permissions(mode))
}

#[cfg(not(unix))]
fn file_options(_path: &Path) -> Result<FileOptions<'static, ()>> {
    Ok(FileOptions::default())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
