//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use servicedata_csv::ServicesCsv;
use servicedata_shared::{
    DataProvider, ExportConfig, LoadedConfig, SummaryEntry, TracingEvents, init_config,
    load_config,
};
use servicedata_site::{export_site_data, verify_export};
use servicedata_summary::ServicesSummary;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// servicedata — turn the services CSV into site data.
#[derive(Parser)]
#[command(
    name = "servicedata",
    version,
    about = "Parse the services CSV and export records and summaries for the static site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to servicedata.toml (defaults to ./servicedata.toml).
    #[arg(short, long, global = true, env = "SERVICEDATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the parsed records as JSON.
    Records,

    /// Print the service / CMS type counts.
    Summary {
        /// Print an aligned text table instead of JSON.
        #[arg(long)]
        table: bool,
    },

    /// Write the data files, manifest and passthrough copy.
    Build {
        /// Export directory (overrides [export].data_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check an existing export against its manifest.
    Verify {
        /// Export directory (overrides [export].data_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default servicedata.toml in the current directory.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// `EnvFilter` directives for a `-v` count. Only this workspace's crates
/// get more verbose; dependencies stay at their defaults.
fn filter_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "servicedata=info,servicedata_csv=warn,servicedata_summary=warn,servicedata_runs=info,servicedata_site=info,servicedata_shared=warn",
        1 => "servicedata=debug,servicedata_csv=debug,servicedata_summary=debug,servicedata_runs=debug,servicedata_site=debug,servicedata_shared=debug",
        _ => "servicedata=trace,servicedata_csv=trace,servicedata_summary=trace,servicedata_runs=trace,servicedata_site=trace,servicedata_shared=trace",
    }
}

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `records` / `summary` output stays pipeable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = filter_directives(cli.verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config {
            action: ConfigAction::Init,
        } => cmd_config_init(),
        command => {
            let loaded = load_config(cli.config.as_deref())?;
            match command {
                Command::Records => cmd_records(&loaded),
                Command::Summary { table } => cmd_summary(&loaded, table),
                Command::Build { out } => cmd_build(&loaded, out),
                Command::Verify { out } => cmd_verify(&loaded, out),
                Command::Config { .. } => cmd_config_show(&loaded),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_records(loaded: &LoadedConfig) -> Result<()> {
    let path = loaded.config.source.csv_path(&loaded.base_dir);
    print_provider(&ServicesCsv::new(path))
}

fn cmd_summary(loaded: &LoadedConfig, table: bool) -> Result<()> {
    let path = loaded.config.source.csv_path(&loaded.base_dir);
    let provider = ServicesSummary::new(path);

    if table {
        print!("{}", render_table(&provider.summarize()?));
        Ok(())
    } else {
        print_provider(&provider)
    }
}

/// Print a provider's output as pretty JSON.
fn print_provider<P: DataProvider>(provider: &P) -> Result<()> {
    let items = provider.provide()?;
    debug!(provider = provider.name(), items = items.len(), "provider output");
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

/// Export config with the `--out` override applied.
fn export_config(loaded: &LoadedConfig, out: Option<PathBuf>) -> ExportConfig {
    let mut config = loaded.export_config();
    if let Some(out) = out {
        config.export_dir = out;
    }
    config
}

fn cmd_build(loaded: &LoadedConfig, out: Option<PathBuf>) -> Result<()> {
    let config = export_config(loaded, out);

    info!(
        source = %config.csv_path.display(),
        out = %config.export_dir.display(),
        "exporting site data"
    );

    let result = export_site_data(&config, &TracingEvents)?;
    let manifest = &result.manifest;

    println!();
    if result.source_missing() {
        println!("  Source CSV not found; wrote empty data files.");
    } else {
        println!("  Site data exported.");
    }
    println!("  Build:    {}", manifest.build_id);
    println!("  Records:  {}", manifest.record_count);
    println!("  Summary:  {} entries", manifest.summary_count);
    for file in &manifest.files {
        println!("  Wrote:    {}", result.export_dir.join(&file.filename).display());
    }
    if let (Some(_), Some(target)) = (&manifest.passthrough, &config.passthrough_target) {
        println!("  Copied:   {}", target.display());
    }
    if let Some(runs) = &manifest.runs {
        println!(
            "  Runs:     {} councils, {} failing ({} reports)",
            runs.council_count, runs.failing_count, runs.reports_read
        );
    }
    println!("  Manifest: {}", result.manifest_path.display());
    println!();

    Ok(())
}

fn cmd_verify(loaded: &LoadedConfig, out: Option<PathBuf>) -> Result<()> {
    let config = export_config(loaded, out);
    let report = verify_export(&config)?;

    println!(
        "Export {} is intact ({} records, {} summary entries).",
        report.manifest.build_id, report.manifest.record_count, report.manifest.summary_count
    );
    if report.stale {
        println!("Source CSV has changed since this export; run `servicedata build`.");
    }
    if report.passthrough_unchecked {
        println!("Passthrough copy not checked: passthrough is disabled in the current config.");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let cwd = std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    let path = init_config(&cwd)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(loaded: &LoadedConfig) -> Result<()> {
    match &loaded.path {
        Some(path) => println!("# from {}", path.display()),
        None => println!("# defaults (no servicedata.toml found)"),
    }
    println!("{}", toml::to_string_pretty(&loaded.config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Render the summary as aligned columns, service name shown once per group.
fn render_table(summary: &[SummaryEntry]) -> String {
    const HEADERS: [&str; 3] = ["SERVICE", "CMS", "COUNT"];

    let name_width = summary
        .iter()
        .map(|e| e.service_name.chars().count())
        .chain([HEADERS[0].len()])
        .max()
        .unwrap_or_default();
    let cms_width = summary
        .iter()
        .map(|e| e.cms_type.chars().count())
        .chain([HEADERS[1].len()])
        .max()
        .unwrap_or_default();

    let mut out = format!(
        "{:<name_width$}  {:<cms_width$}  {}\n",
        HEADERS[0], HEADERS[1], HEADERS[2]
    );

    let mut previous: Option<&str> = None;
    for entry in summary {
        let name = if previous == Some(entry.service_name.as_str()) {
            ""
        } else {
            entry.service_name.as_str()
        };
        out.push_str(&format!(
            "{:<name_width$}  {:<cms_width$}  {:>5}\n",
            name, entry.cms_type, entry.count
        ));
        previous = Some(entry.service_name.as_str());
    }

    out
}
