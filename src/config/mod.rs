#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{BuildArgs, CliConfig, Command, LaunchArgs, RootArgs};
pub use settings::ServiceSettings;
pub use toml_config::BuildConfig;
