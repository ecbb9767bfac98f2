use clap::Parser;
use shortbox::config::{BuildArgs, Command, LaunchArgs, RootArgs};
use shortbox::utils::{logger, validation::Validate};
use shortbox::{BuildConfig, CliConfig, CommandInstaller, Launcher, Sequencer, UnitError};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);

    let outcome = match cli.command {
        Command::Build(args) => build(args).await,
        Command::Launch(args) => launch(args).await,
        Command::Show(args) => show(args),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(
                "❌ {} (Severity: {:?})",
                e,
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}

fn load_build_config(args: &BuildArgs) -> Result<BuildConfig, UnitError> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading build configuration from: {}", path);
            BuildConfig::from_file(path)?
        }
        None => BuildConfig::default(),
    };

    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

async fn build(args: BuildArgs) -> Result<i32, UnitError> {
    let config = load_build_config(&args)?;

    let installer = CommandInstaller::new(&config.installer).with_working_dir(config.root());
    let sequencer = Sequencer::standard(Arc::new(installer)).with_monitoring(args.monitor);

    let results = sequencer.execute(config.clone()).await?;
    let summary = Sequencer::summary(&results);
    tracing::debug!("Build summary: {}", serde_json::to_string(&summary)?);

    println!("✅ Unit built at {}", config.unit.root);
    println!(
        "▶️ Startup: {} {}",
        config.startup.interpreter, config.startup.entry
    );
    if let Some(archive) = &config.unit.archive {
        println!("📦 Archive: {}", archive);
    }
    Ok(0)
}

async fn launch(args: LaunchArgs) -> Result<i32, UnitError> {
    let launcher = Launcher::from_root(&args.target.root)?;
    let status = launcher.launch(&args.args).await?;

    // a signal-terminated child has no code
    Ok(status.code().unwrap_or(1))
}

fn show(args: RootArgs) -> Result<i32, UnitError> {
    let launcher = Launcher::from_root(&args.root)?;
    let command = launcher.command();

    println!("{}", command.describe());
    println!("  root:          {}", launcher.root().display());
    println!("  built in:      {}", command.working_dir.display());
    println!("  registered at: {}", command.registered_at);
    Ok(0)
}
