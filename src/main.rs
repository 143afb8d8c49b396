use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use artifact_deriver::cli::{Cli, OutputFormat, VerbosityLevel};
use artifact_deriver::config::{Config, ConfigManager};
use artifact_deriver::engine::{
    DerivationEngine, DerivationPhase, DerivationProgress, ProgressCallback,
};
use artifact_deriver::output::Output;
use artifact_deriver::repository::InMemoryRepository;

const LOG_ENV: &str = "ARTIFACT_DERIVER_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every document was processed successfully.
async fn run(cli: Cli) -> Result<bool> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(&cli)
        .await
        .context("failed to load configuration")?;
    let verbosity = verbosity(&config);
    init_tracing(verbosity);

    let discovery =
        ConfigManager::file_discovery(&config).context("invalid file discovery settings")?;
    let registry = ConfigManager::deriver_registry(&config).context("invalid deriver settings")?;
    if !registry.extended_types().is_empty() {
        info!(extended = ?registry.extended_types(), "extended document types registered");
    }

    let engine = DerivationEngine::new(
        Arc::new(registry),
        Arc::new(InMemoryRepository::new()),
        ConfigManager::engine_config(&config),
    );

    let format = OutputFormat::from(config.output.format);
    let progress = (config.derivation.show_progress && format != OutputFormat::Json)
        .then(progress_printer);

    let results = engine
        .run_with_progress(&cli.path, &discovery, progress)
        .await
        .with_context(|| format!("failed to process {}", cli.path.display()))?;

    let report = Output::new(format, verbosity)
        .format_results(&results)
        .context("failed to render results")?;
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", report)?;
    if !report.ends_with('\n') {
        writeln!(stdout)?;
    }

    info!(
        documents = results.total_documents,
        repository_size = engine.repository().len(),
        "run complete"
    );
    Ok(!results.has_failures())
}

fn verbosity(config: &Config) -> VerbosityLevel {
    if config.output.quiet {
        VerbosityLevel::Quiet
    } else if config.output.verbose {
        VerbosityLevel::Verbose
    } else {
        VerbosityLevel::Normal
    }
}

fn init_tracing(verbosity: VerbosityLevel) {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Verbose => "artifact_deriver=debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn progress_printer() -> ProgressCallback {
    Arc::new(|progress: DerivationProgress| {
        let phase = match progress.phase {
            DerivationPhase::Discovery => "discovering",
            DerivationPhase::Derivation => "deriving",
            DerivationPhase::Persistence => "persisting",
            DerivationPhase::Linking => "linking",
            DerivationPhase::Complete => "done",
        };
        match &progress.current_file {
            Some(file) => eprintln!(
                "[{}/{}] {} {}",
                progress.completed,
                progress.total,
                phase,
                file.display()
            ),
            None => eprintln!("[{}/{}] {}", progress.completed, progress.total, phase),
        }
    })
}
