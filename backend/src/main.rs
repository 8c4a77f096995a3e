//! Installboard CLI - installation progress dashboard backend
//!
//! ```bash
//! installboard serve                      # Start HTTP server (port 3000)
//! installboard report progress.csv        # Print dashboard JSON
//! installboard report progress.csv --dedupe none -o dashboard.json
//! installboard parse progress.csv         # Raw rows as JSON (debug)
//! installboard check-config config.json   # Validate a config file
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG`.

use clap::{Parser, Subcommand};
use installboard::config::{parse_delimiter, DEFAULT_PORT, ENV_CONFIG};
use installboard::metrics::pipeline::format_delimiter;
use installboard::{
    dashboard_from_file, parse_csv_file_auto, DashboardResponse, DedupePolicy, PipelineConfig,
    PipelineError,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "installboard")]
#[command(about = "Installation progress metrics from a CSV upload", long_about = None)]
struct Cli {
    /// Pipeline config file (JSON)
    #[arg(long, global = true, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Compute the dashboard for a CSV file and print it as JSON
    Report {
        /// Input CSV file
        input: PathBuf,

        /// Duplicate hospital handling: first-wins or none
        #[arg(long)]
        dedupe: Option<DedupePolicy>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a pipeline config file
    CheckConfig {
        /// Config JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port, cli.config.as_deref()).await,

        Commands::Report {
            input,
            dedupe,
            delimiter,
            output,
        } => cmd_report(
            &input,
            cli.config.as_deref(),
            dedupe,
            delimiter.as_deref(),
            output.as_deref(),
        ),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter.as_deref(), output.as_deref()),

        Commands::CheckConfig { file } => cmd_check_config(&file),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "installboard={lvl},tower_http={lvl}",
            lvl = default_level
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Config file (if any) + env, then CLI flags.
fn resolve_config(
    config_path: Option<&Path>,
    dedupe: Option<DedupePolicy>,
    delimiter: Option<&str>,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::load(config_path)?;
    if let Some(dedupe) = dedupe {
        config.dedupe = dedupe;
    }
    if let Some(d) = delimiter {
        config.delimiter = Some(parse_delimiter(d)?);
    }
    Ok(config)
}

async fn cmd_serve(port: u16, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path, None, None)?;
    installboard::server::start_server(port, config).await?;
    Ok(())
}

fn cmd_report(
    input: &Path,
    config_path: Option<&Path>,
    dedupe: Option<DedupePolicy>,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path, dedupe, delimiter)?;
    eprintln!("📄 Processing: {}", input.display());

    let dashboard = match dashboard_from_file(input, &config) {
        Ok(d) => d,
        Err(e) => {
            if let PipelineError::Metrics(_) = e {
                eprintln!("   Expected columns: {}", config.column_map.required().join(", "));
            }
            return Err(e.into());
        }
    };

    eprintln!("   Encoding: {}", dashboard.source.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(dashboard.source.delimiter));
    eprintln!("   Rows: {}", dashboard.source.row_count);
    if dashboard.duplicates_removed > 0 {
        eprintln!(
            "   Duplicates dropped: {} ({})",
            dashboard.duplicates_removed, dashboard.dedupe
        );
    }

    let totals = &dashboard.totals;
    eprintln!("\n📌 Overall Progress");
    eprintln!("   Total Required:  {}", totals.total_required);
    eprintln!("   Total Installed: {}", totals.total_installed);
    eprintln!("   Remaining:       {}", totals.total_remaining);
    eprintln!("   % Completed:     {}%", totals.overall_completion);

    eprintln!("\n🗂️  Completion by Cluster");
    for cluster in &dashboard.clusters {
        eprintln!(
            "   {:<24} {:>8} / {:<8} {:>6.2}%",
            cluster.cluster, cluster.tanks_installed, cluster.tanks_required, cluster.percent_completed
        );
    }

    let json = serde_json::to_string_pretty(&DashboardResponse::ready(dashboard))?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let forced = delimiter.map(parse_delimiter).transpose()?;
    let result = parse_csv_file_auto(input, forced)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if forced.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_check_config(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", file.display());

    let config = PipelineConfig::from_file(file)?;
    eprintln!("   Dedupe: {}", config.dedupe);
    eprintln!("   Columns: {}", config.column_map.required().join(", "));
    eprintln!(
        "   Delimiter: {}",
        config
            .delimiter
            .map(format_delimiter)
            .unwrap_or_else(|| "auto".to_string())
    );
    eprintln!("✅ Config is valid");
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
