use crate::config::toml_config::BuildConfig;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "shortbox")]
#[command(about = "Builds and launches runnable units from a manifest and a source tree")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install dependencies, materialize sources and register the startup command
    Build(BuildArgs),
    /// Run the startup command registered for a unit
    Launch(LaunchArgs),
    /// Print the startup command registered for a unit
    Show(RootArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// Path to a TOML build configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Unit root (working location)
    #[arg(long)]
    pub root: Option<String>,

    /// Build context that manifest and source are resolved against
    #[arg(long)]
    pub context: Option<String>,

    #[arg(long)]
    pub manifest: Option<String>,

    #[arg(long)]
    pub source: Option<String>,

    /// Entry file relative to the unit root
    #[arg(long)]
    pub entry: Option<String>,

    #[arg(long)]
    pub interpreter: Option<String>,

    /// Installer program (default: pip)
    #[arg(long)]
    pub installer: Option<String>,

    /// Skip the build-time check that the entry file exists
    #[arg(long)]
    pub no_entry_check: bool,

    /// Also export the unit as a zip archive
    #[arg(long)]
    pub archive: Option<String>,

    /// Log CPU and memory after each step
    #[arg(long)]
    pub monitor: bool,
}

impl BuildArgs {
    /// Command-line values win over the configuration file.
    pub fn apply_overrides(&self, config: &mut BuildConfig) {
        if let Some(root) = &self.root {
            config.unit.root = root.clone();
        }
        if let Some(context) = &self.context {
            config.unit.context = context.clone();
        }
        if let Some(manifest) = &self.manifest {
            config.unit.manifest = manifest.clone();
        }
        if let Some(source) = &self.source {
            config.unit.source = source.clone();
        }
        if let Some(entry) = &self.entry {
            config.startup.entry = entry.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.startup.interpreter = interpreter.clone();
        }
        if let Some(installer) = &self.installer {
            config.installer.program = installer.clone();
        }
        if self.no_entry_check {
            config.unit.validate_entry = false;
        }
        if let Some(archive) = &self.archive {
            config.unit.archive = Some(archive.clone());
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RootArgs {
    #[arg(long, default_value = "/app")]
    pub root: String,
}

#[derive(Debug, Clone, Args)]
pub struct LaunchArgs {
    #[command(flatten)]
    pub target: RootArgs,

    /// Accepted but ignored: the registered command is fixed
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
