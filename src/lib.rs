pub mod config;
pub mod core;
pub mod domain;
pub mod shortener;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{BuildConfig, ServiceSettings};

pub use crate::core::{
    installer::CommandInstaller, launcher::Launcher, sequencer::BuildContext,
    sequencer::BuildStep, sequencer::Sequencer,
};
pub use utils::error::{Result, UnitError};
