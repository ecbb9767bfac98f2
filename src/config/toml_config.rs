use crate::utils::error::{Result, UnitError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build configuration for a runnable unit. Every section is optional; the
/// defaults reproduce the stock layout (`/app`, `requirements.txt`, `src/`,
/// `python src/main.py`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub unit: UnitSection,
    pub installer: InstallerSection,
    pub startup: StartupSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSection {
    /// Working location of the unit. Everything is materialized below it.
    pub root: String,
    /// Directory that `manifest` and `source` are resolved against.
    pub context: String,
    pub manifest: String,
    pub source: String,
    /// Subdirectory of `root` that receives the source tree.
    pub source_subdir: String,
    pub validate_entry: bool,
    pub archive: Option<String>,
}

impl Default for UnitSection {
    fn default() -> Self {
        Self {
            root: "/app".to_string(),
            context: ".".to_string(),
            manifest: "requirements.txt".to_string(),
            source: "src".to_string(),
            source_subdir: "src".to_string(),
            validate_entry: true,
            archive: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSection {
    pub program: String,
    pub upgrade_args: Vec<String>,
    /// `{manifest}` is replaced with the materialized manifest path.
    pub install_args: Vec<String>,
}

impl Default for InstallerSection {
    fn default() -> Self {
        Self {
            program: "pip".to_string(),
            upgrade_args: vec![
                "install".to_string(),
                "--upgrade".to_string(),
                "pip".to_string(),
            ],
            install_args: vec![
                "install".to_string(),
                "--no-cache-dir".to_string(),
                "-r".to_string(),
                MANIFEST_PLACEHOLDER.to_string(),
            ],
        }
    }
}

pub const MANIFEST_PLACEHOLDER: &str = "{manifest}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupSection {
    pub interpreter: String,
    /// Entry file, relative to the unit root.
    pub entry: String,
}

impl Default for StartupSection {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            entry: "src/main.py".to_string(),
        }
    }
}

impl BuildConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(UnitError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| UnitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| UnitError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.unit.root)
    }

    pub fn manifest_source(&self) -> PathBuf {
        Path::new(&self.unit.context).join(&self.unit.manifest)
    }

    pub fn source_dir(&self) -> PathBuf {
        Path::new(&self.unit.context).join(&self.unit.source)
    }

    pub fn source_target(&self) -> PathBuf {
        self.root().join(&self.unit.source_subdir)
    }

    /// Where the manifest lands inside the unit root.
    pub fn manifest_target(&self) -> PathBuf {
        let name = Path::new(&self.unit.manifest)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "requirements.txt".into());
        self.root().join(name)
    }

    pub fn entry_path(&self) -> PathBuf {
        self.root().join(&self.startup.entry)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("unit.root", &self.unit.root)?;
        validation::validate_path("unit.context", &self.unit.context)?;
        validation::validate_path("unit.manifest", &self.unit.manifest)?;
        validation::validate_path("unit.source", &self.unit.source)?;
        validation::validate_relative_path("unit.source_subdir", &self.unit.source_subdir)?;
        if !Path::new(&self.unit.source_subdir)
            .components()
            .any(|c| matches!(c, std::path::Component::Normal(_)))
        {
            return Err(UnitError::InvalidConfigValueError {
                field: "unit.source_subdir".to_string(),
                value: self.unit.source_subdir.clone(),
                reason: "must name a subdirectory of the unit root".to_string(),
            });
        }
        if crate::core::materialize::trees_overlap(&self.source_dir(), &self.source_target())? {
            return Err(UnitError::InvalidConfigValueError {
                field: "unit.source_subdir".to_string(),
                value: self.source_target().display().to_string(),
                reason: format!(
                    "source target overlaps the source tree {}",
                    self.source_dir().display()
                ),
            });
        }
        validation::validate_non_empty_string("installer.program", &self.installer.program)?;
        validation::validate_non_empty_string("startup.interpreter", &self.startup.interpreter)?;
        validation::validate_relative_path("startup.entry", &self.startup.entry)?;

        if !self
            .installer
            .install_args
            .iter()
            .any(|a| a.contains(MANIFEST_PLACEHOLDER))
        {
            return Err(UnitError::InvalidConfigValueError {
                field: "installer.install_args".to_string(),
                value: self.installer.install_args.join(" "),
                reason: format!("must reference {}", MANIFEST_PLACEHOLDER),
            });
        }

        if let Some(archive) = &self.unit.archive {
            validation::validate_path("unit.archive", archive)?;
            let root = crate::core::materialize::resolve(&self.root())?;
            let archive = crate::core::materialize::resolve(Path::new(archive))?;
            if archive.starts_with(&root) {
                return Err(UnitError::InvalidConfigValueError {
                    field: "unit.archive".to_string(),
                    value: archive.display().to_string(),
                    reason: "archive must be written outside the unit root".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for BuildConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
