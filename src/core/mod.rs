pub mod installer;
pub mod launcher;
pub mod materialize;
pub mod sequencer;
pub mod steps;

pub use crate::domain::model::{Manifest, Requirement, StartupCommand, StepResult};
pub use crate::domain::ports::{Installer, LinkStore};
pub use crate::utils::error::Result;
