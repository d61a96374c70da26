//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use trackalt_core::pipeline::{EnrichConfig, EnrichResult, ProgressReporter};
use trackalt_shared::{
    AppConfig, FetchConfig, InjectionMode, config_file_path, init_config, load_config,
    load_config_from, resolve_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// trackalt: add elevation data to GPS track files.
#[derive(Parser)]
#[command(
    name = "trackalt",
    version,
    about = "Enrich GPX track files with elevations from an online lookup service.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where the altitude is written on each trackpoint.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ModeArg {
    /// `ele="..."` attribute.
    Attribute,
    /// `<ele>...</ele>` child element.
    Element,
}

impl From<ModeArg> for InjectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Attribute => InjectionMode::Attribute,
            ModeArg::Element => InjectionMode::Element,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Add elevations to every trackpoint of a GPX file.
    Enrich(EnrichArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `trackalt enrich`. Flags override the config file.
#[derive(clap::Args)]
pub(crate) struct EnrichArgs {
    /// Track file to enrich.
    pub input: PathBuf,

    /// Output file (defaults to `<stem>_ele.gpx` beside the input).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Points report file (defaults to `<stem>_ele.json` beside the input).
    #[arg(long)]
    pub points_out: Option<PathBuf>,

    /// Do not write the points report.
    #[arg(long)]
    pub no_points: bool,

    /// Store altitude as an attribute or a child element.
    #[arg(long)]
    pub mode: Option<ModeArg>,

    /// Service credential (defaults to the env var named in the config).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Maximum points per request.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Attempts per batch before giving up.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Base retry delay in milliseconds.
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Pause between batches in milliseconds.
    #[arg(long)]
    pub batch_pause_ms: Option<u64>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Config file to use instead of `~/.trackalt/trackalt.toml`.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trackalt=info",
        1 => "trackalt=debug",
        _ => "trackalt=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich(args) => cmd_enrich(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich(args: EnrichArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, &args);

    // Credential is checked before any file or network work.
    let api_key = resolve_api_key(args.api_key.as_deref(), &config)?;
    let fetch = FetchConfig::from_config(&config.elevation, api_key)?;

    let enrich_config = EnrichConfig {
        input: args.input,
        output: args.out,
        points_output: args.points_out,
        skip_points: args.no_points || !config.output.write_points,
        mode: config.output.mode,
        suffix: config.output.suffix.clone(),
        fetch,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        input = %enrich_config.input.display(),
        mode = %enrich_config.mode,
        batch_size = enrich_config.fetch.batch_size,
        "enriching track"
    );

    let reporter = CliProgress::new();
    let result = trackalt_core::pipeline::enrich(&enrich_config, &reporter).await;
    if result.is_err() {
        reporter.spinner.finish_and_clear();
    }
    let result = result?;

    print_summary(&result);
    Ok(())
}

/// Apply command-line flags on top of the loaded config.
fn apply_overrides(config: &mut AppConfig, args: &EnrichArgs) {
    let elevation = &mut config.elevation;
    if let Some(size) = args.batch_size {
        elevation.batch_size = size;
    }
    if let Some(attempts) = args.max_attempts {
        elevation.max_attempts = attempts;
    }
    if let Some(ms) = args.retry_delay_ms {
        elevation.retry_base_delay_ms = ms;
    }
    if let Some(ms) = args.batch_pause_ms {
        elevation.batch_pause_ms = ms;
    }
    if let Some(secs) = args.timeout_secs {
        elevation.request_timeout_secs = secs;
    }
    if let Some(mode) = args.mode {
        config.output.mode = mode.into();
    }
}

fn print_summary(result: &EnrichResult) {
    println!();
    println!("  Track enriched!");
    println!("  Points:   {}", result.points_total);
    println!("  Updated:  {}", result.nodes_updated);
    if result.missing_elevations > 0 {
        println!("  No data:  {}", result.missing_elevations);
    }
    println!("  Output:   {}", result.output_path.display());
    if let Some(path) = &result.points_path {
        println!("  Report:   {}", path.display());
    }
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &EnrichResult) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", config_file_path()?.display());
    println!("{toml_str}");
    Ok(())
}
