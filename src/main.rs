use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use md2speech::backend::{EdgeTtsBackend, FfmpegMuxer};
use md2speech::cache::SynthesisCache;
use md2speech::cancel::CancellationToken;
use md2speech::cli::Cli;
use md2speech::config::Config;
use md2speech::output::{TerminalProgress, print_plan, print_summary};
use md2speech::pipeline::{Pipeline, PipelineConfig, read_document};
use owo_colors::OwoColorize;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    log::debug!("{}", md2speech::version_string());

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    // Check the input before anything touches the filesystem.
    let text = read_document(&cli.input)?;
    let cache = SynthesisCache::new(config.cache.resolved_dir());

    if cli.dry_run {
        let pipeline = build_pipeline(&config, cache, CancellationToken::new());
        print_plan(&pipeline.plan(&text));
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut pipeline = build_pipeline(&config, cache, cancel);
    if !cli.quiet {
        pipeline = pipeline.with_observer(Arc::new(TerminalProgress::new()));
    }

    let output = cli.output.clone();
    let report = tokio::task::spawn_blocking(move || pipeline.run(&text, &output))
        .await
        .context("Synthesis task panicked")??;

    if !cli.quiet {
        print_summary(&report);
    }
    Ok(())
}

/// Initialise `log` output; `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/md2speech/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

fn build_pipeline(config: &Config, cache: SynthesisCache, cancel: CancellationToken) -> Pipeline {
    let backend = EdgeTtsBackend::system(&config.synthesis).with_cancellation(cancel.clone());
    let muxer = FfmpegMuxer::system(&config.mux).with_cancellation(cancel.clone());
    Pipeline::new(
        PipelineConfig::from_config(config),
        Arc::new(backend),
        Arc::new(muxer),
        cache,
    )
    .with_cancellation(cancel)
}

/// Cancel the run on the first Ctrl-C; running tools are killed.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("{}", "Interrupted, stopping workers...".yellow());
                cancel.cancel();
            }
            Err(e) => log::warn!("Failed to listen for Ctrl-C: {e}"),
        }
    });
}
