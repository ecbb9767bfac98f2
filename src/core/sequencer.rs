use crate::config::toml_config::BuildConfig;
use crate::core::steps;
use crate::domain::model::{Manifest, StepResult};
use crate::domain::ports::Installer;
use crate::utils::error::{Result, UnitError};
use crate::utils::monitor::SystemMonitor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// State handed from one build step to the next.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: BuildConfig,
    /// Manifest as materialized inside the unit root.
    pub manifest: Option<Manifest>,
}

impl BuildContext {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            manifest: None,
        }
    }
}

/// One all-or-nothing stage of a unit build.
#[async_trait::async_trait]
pub trait BuildStep: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the step and returns a one-line description of what it did.
    async fn run(&self, ctx: &mut BuildContext) -> Result<String>;

    fn should_execute(&self, _ctx: &BuildContext) -> bool {
        true
    }
}

/// Runs build steps strictly in order and stops at the first failure.
pub struct Sequencer {
    steps: Vec<Box<dyn BuildStep>>,
    monitor: Option<SystemMonitor>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            monitor: None,
        }
    }

    /// The stock pipeline: prepare root, manifest, dependencies, source,
    /// entry check, startup registration, optional archive.
    pub fn standard(installer: Arc<dyn Installer>) -> Self {
        let mut sequencer = Self::new();
        sequencer.add_step(Box::new(steps::PrepareRoot));
        sequencer.add_step(Box::new(steps::MaterializeManifest));
        sequencer.add_step(Box::new(steps::InstallDependencies::new(installer)));
        sequencer.add_step(Box::new(steps::MaterializeSource));
        sequencer.add_step(Box::new(steps::VerifyEntry));
        sequencer.add_step(Box::new(steps::RegisterStartup));
        sequencer.add_step(Box::new(steps::ExportArchive));
        sequencer
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(|| SystemMonitor::new(true));
        self
    }

    pub fn add_step(&mut self, step: Box<dyn BuildStep>) {
        self.steps.push(step);
    }

    pub async fn execute(&self, config: BuildConfig) -> Result<Vec<StepResult>> {
        let mut ctx = BuildContext::new(config);
        self.execute_with_context(&mut ctx).await
    }

    pub async fn execute_with_context(&self, ctx: &mut BuildContext) -> Result<Vec<StepResult>> {
        let mut results = Vec::new();
        tracing::info!("🚀 Building unit at {}", ctx.config.unit.root);

        for step in &self.steps {
            if !step.should_execute(ctx) {
                tracing::info!("⏭️ Skipping step: {}", step.name());
                continue;
            }

            let start_time = Instant::now();
            match step.run(ctx).await {
                Ok(detail) => {
                    let result = StepResult {
                        step_name: step.name().to_string(),
                        detail,
                        duration: start_time.elapsed(),
                    };
                    tracing::info!(
                        "✅ {} ({}, {:?})",
                        result.step_name,
                        result.detail,
                        result.duration
                    );
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!("❌ Step {} failed: {}", step.name(), e);
                    return Err(UnitError::StepFailed {
                        stage: step.name().to_string(),
                        source: Box::new(e),
                    });
                }
            }

            if let Some(monitor) = &self.monitor {
                monitor.log_stats(step.name());
            }
        }

        Ok(results)
    }

    pub fn summary(results: &[StepResult]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let total_duration: std::time::Duration = results.iter().map(|r| r.duration).sum();
        summary.insert("total_steps".to_string(), serde_json::Value::from(results.len()));
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::from(total_duration.as_millis() as u64),
        );
        summary.insert(
            "executed_steps".to_string(),
            serde_json::Value::Array(
                results
                    .iter()
                    .map(|r| serde_json::Value::String(r.step_name.clone()))
                    .collect(),
            ),
        );

        summary
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
