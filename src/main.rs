use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trip_tradeoff::advisor::http::HttpReasoningClient;
use trip_tradeoff::advisor::ReasoningService;
use trip_tradeoff::audience::AudienceViews;
use trip_tradeoff::config::{ConfigOverrides, EngineConfig};
use trip_tradeoff::context::sample::sample_round_trip;
use trip_tradeoff::context::TripContext;
use trip_tradeoff::drivers::CostDriverReport;
use trip_tradeoff::engine::TradeoffEngine;
use trip_tradeoff::output::json::{render_json, render_views_json};
use trip_tradeoff::output::table::{
    render_alternatives_table, render_approver_view, render_compliance_table,
    render_drivers_table, render_proposals_table, render_traveler_view,
};
use trip_tradeoff::output::ViewSelection;
use trip_tradeoff::resolver::ResolvedResult;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Traveler,
    Approver,
    Compliance,
    All,
}

impl From<ViewArg> for ViewSelection {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Traveler => ViewSelection::Traveler,
            ViewArg::Approver => ViewSelection::Approver,
            ViewArg::Compliance => ViewSelection::Compliance,
            ViewArg::All => ViewSelection::All,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "trip-tradeoff",
    about = "Cheaper flight alternatives and trade-off advice for a booked trip"
)]
struct Cli {
    /// Trip snapshot as JSON; the built-in sample trip is used when omitted.
    #[arg(short, long)]
    trip: Option<PathBuf>,
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long = "reasoning-endpoint")]
    reasoning_endpoint: Option<String>,
    #[arg(long = "no-reasoning")]
    no_reasoning: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline and print one or all audience views.
    Resolve {
        #[arg(long, value_enum, default_value_t = ViewArg::Traveler)]
        view: ViewArg,
    },
    /// Break the premium over the cheapest fares down by cause.
    Drivers,
    /// Show the scored and curated alternatives without advice.
    Alternatives,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(EngineConfig::default_path);
    let mut config = EngineConfig::load(Some(config_path.as_path()))?;
    config.apply_overrides(ConfigOverrides {
        reasoning_endpoint: cli.reasoning_endpoint.clone(),
        disable_reasoning: cli.no_reasoning,
    });

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }

    let config = Arc::new(config);
    let trip = load_trip(cli.trip.as_deref())?;
    let engine = TradeoffEngine::new(config.clone(), reasoning_service(&config));

    match cli.command {
        Commands::Resolve { view } => {
            let (output, views) = engine.run_views(&trip).await?;
            info!(
                "trip {} resolved with narrative from {}",
                output.trip_id, output.source
            );
            print_views(&views, view.into(), cli.output)?;
        }
        Commands::Drivers => {
            let report = engine.analyze_drivers(&trip)?;
            print_drivers(&report, cli.output)?;
        }
        Commands::Alternatives => {
            let resolved = engine.resolve(&trip)?;
            print_alternatives(&resolved, cli.output)?;
        }
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &EngineConfig,
    config_path: &Path,
) -> Result<()> {
    if init {
        EngineConfig::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_trip(path: Option<&Path>) -> Result<TripContext> {
    let Some(path) = path else {
        info!("no trip file given, using the built-in sample trip");
        return Ok(sample_round_trip());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading trip file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing trip file: {}", path.display()))
}

fn reasoning_service(config: &EngineConfig) -> Option<Arc<dyn ReasoningService>> {
    if !config.reasoning.enabled {
        return None;
    }
    match HttpReasoningClient::from_config(&config.reasoning) {
        Ok(client) => {
            info!("reasoning service at {}", client.name());
            let service: Arc<dyn ReasoningService> = Arc::new(client);
            Some(service)
        }
        Err(err) => {
            warn!("reasoning disabled: {err:#}");
            None
        }
    }
}

fn print_views(
    views: &AudienceViews,
    selection: ViewSelection,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", render_views_json(views, selection)?),
        OutputFormat::Table => {
            let rendered = match selection {
                ViewSelection::Traveler => render_traveler_view(&views.traveler),
                ViewSelection::Approver => render_approver_view(&views.approver),
                ViewSelection::Compliance => render_compliance_table(&views.compliance),
                ViewSelection::All => [
                    render_traveler_view(&views.traveler),
                    render_approver_view(&views.approver),
                    render_compliance_table(&views.compliance),
                ]
                .join("\n\n"),
            };
            println!("{rendered}");
        }
    }
    Ok(())
}

fn print_drivers(report: &CostDriverReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_drivers_table(report)),
        OutputFormat::Json => println!("{}", render_json(report)?),
    }
    Ok(())
}

fn print_alternatives(resolved: &ResolvedResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_alternatives_table(resolved));
            if !resolved.trip_window.is_empty() {
                println!("{}", render_proposals_table(&resolved.trip_window));
            }
            if !resolved.different_month.is_empty() {
                println!("{}", render_proposals_table(&resolved.different_month));
            }
        }
        OutputFormat::Json => println!("{}", render_json(resolved)?),
    }
    Ok(())
}
