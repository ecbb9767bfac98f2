use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnitError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Dependency resolution failed: {message}")]
    DependencyResolutionError { message: String },

    #[error("Source materialization failed for {path}: {reason}")]
    SourceMaterializationError { path: String, reason: String },

    #[error("Entry file does not exist: {path}")]
    EntryMissingError { path: String },

    #[error("Launch failed: {message}")]
    LaunchError { message: String },

    #[error("Step '{stage}' failed: {source}")]
    StepFailed {
        stage: String,
        #[source]
        source: Box<UnitError>,
    },

    #[error("Link store error: {message}")]
    StoreError { message: String },

    #[error("Duplicate link for {key}: {value}")]
    DuplicateLinkError { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl UnitError {
    /// The innermost error, looking through `StepFailed` wrappers.
    pub fn root_cause(&self) -> &UnitError {
        match self {
            UnitError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the build step that failed, if the error came from the sequencer.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            UnitError::StepFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.root_cause() {
            UnitError::StoreError { .. } => ErrorSeverity::Medium,
            UnitError::DuplicateLinkError { .. } => ErrorSeverity::Low,
            UnitError::IoError(_) | UnitError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root_cause() {
            UnitError::DependencyResolutionError { .. } => {
                "Check package names and version pins in the manifest and that the package index is reachable"
            }
            UnitError::SourceMaterializationError { .. } => {
                "Make sure the source directory exists and is readable"
            }
            UnitError::EntryMissingError { .. } => {
                "Add the entry file to the source tree or point --entry at an existing file"
            }
            UnitError::LaunchError { .. } => {
                "Check that the interpreter is installed and on PATH"
            }
            UnitError::ConfigError { .. }
            | UnitError::InvalidConfigValueError { .. }
            | UnitError::ConfigValidationError { .. }
            | UnitError::TomlParseError(_) => "Review the build configuration file and CLI flags",
            UnitError::StoreError { .. } => "Retry later; the link store is unavailable",
            UnitError::IoError(_) => "Check file permissions and free disk space",
            _ => "Re-run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            UnitError::StepFailed { stage, source } => {
                format!("Build aborted during '{}': {}", stage, source.user_friendly_message())
            }
            UnitError::DependencyResolutionError { message } => {
                format!("Dependencies could not be installed ({})", message)
            }
            UnitError::SourceMaterializationError { path, reason } => {
                format!("Source tree '{}' could not be copied ({})", path, reason)
            }
            UnitError::EntryMissingError { path } => {
                format!("Entry file '{}' was not found", path)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UnitError>;
