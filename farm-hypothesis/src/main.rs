use anyhow::{Context, Result};
use clap::Parser;
use farm_hypothesis::{run, Cli, Config, Reporter, TerminalReporter};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log to stderr; `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load config and apply CLI overrides
    let mut config = Config::load_from(cli.config.as_deref())?;
    cli.apply_to_config(&mut config);
    config.validate().context("Invalid configuration")?;
    debug!(?config, "Configuration");

    let output = run(&config).context("Comparison failed")?;

    if !cli.quiet {
        let reporter = if cli.no_color {
            TerminalReporter::without_colors(config.analysis.alpha)
        } else {
            TerminalReporter::new(config.analysis.alpha)
        };
        reporter.report(&output.reports)?;
    }

    Ok(())
}
