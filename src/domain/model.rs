use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One `name<constraint>` line of a dependency manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub constraint: Option<String>,
}

impl Requirement {
    /// Splits `requests==2.31.0` into `requests` and `==2.31.0`.
    /// Environment markers and extras stay part of the constraint.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let split = line
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
            .unwrap_or(line.len());
        let (name, rest) = line.split_at(split);
        if name.is_empty() {
            return None;
        }

        let rest = rest.trim();
        Some(Self {
            name: name.to_string(),
            constraint: (!rest.is_empty()).then(|| rest.to_string()),
        })
    }
}

/// A dependency manifest. The file is what the installer consumes; the
/// parsed requirements only feed logs and summaries.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
    pub option_lines: usize,
}

impl Manifest {
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Self {
        let mut requirements = Vec::new();
        let mut option_lines = 0;

        for raw in content.lines() {
            let line = match raw.find('#') {
                Some(idx) => &raw[..idx],
                None => raw,
            }
            .trim();

            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                option_lines += 1;
                continue;
            }
            if let Some(req) = Requirement::parse(line) {
                requirements.push(req);
            }
        }

        Self {
            path: path.into(),
            requirements,
            option_lines,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.requirements.iter().all(|r| {
            r.constraint
                .as_deref()
                .map_or(false, |c| c.starts_with("=="))
        })
    }
}

/// The fixed command registered for a runnable unit, persisted as `unit.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupCommand {
    pub program: String,
    /// Entry file, relative to the unit root.
    pub entry: String,
    /// Unit root at build time. Informational; launches resolve against
    /// the root they are started from.
    pub working_dir: PathBuf,
    pub registered_at: String,
}

impl StartupCommand {
    pub fn entry_in(&self, root: &Path) -> PathBuf {
        root.join(&self.entry)
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.program, self.entry)
    }

    pub fn descriptor_path(root: &Path) -> PathBuf {
        root.join(UNIT_DESCRIPTOR)
    }
}

pub const UNIT_DESCRIPTOR: &str = "unit.toml";

/// Outcome of one executed build step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_name: String,
    pub detail: String,
    pub duration: Duration,
}

/// A stored short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub short_url_path: String,
    pub long_url: String,
    pub visits: u64,
}
