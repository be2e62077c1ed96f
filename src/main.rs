//! CLI entry point for the eco missions tool.
//!
//! Provides subcommands for serving the mission store, ingesting new
//! missions into it, migrating a whole export into a local store, printing
//! statistics, exporting missions and querying the geocoder.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use eco_missions::{
    config::Settings,
    fetch::BasicClient,
    fixups::FixupTables,
    infra::{eco::EcoClient, nominatim::NominatimClient},
    mission::Location,
    output::{export_missions, print_summary},
    parser::read_legs_from_path,
    pipeline::{ErrorPolicy, IngestReport, Pipeline, PipelineOptions},
    resolve::round_trip_distance,
    server,
    services::Geocoder,
    store::MissionStore,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "eco_missions")]
#[command(about = "A tool to account for the CO2 cost of missions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the pipeline subcommands.
#[derive(clap::Args)]
struct PipelineArgs {
    /// CSV export of the raw mission view
    #[arg(long, default_value = "missions.csv")]
    legs: PathBuf,

    /// Path to transport IDs fixups
    #[arg(long, default_value = "fixups.tid.json")]
    fixups_tid: PathBuf,

    /// Path to destination fixups
    #[arg(long, default_value = "fixups.dest.json")]
    fixups_dest: PathBuf,

    /// What to do with missions that cannot be classified or resolved
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Strict)]
    policy: ErrorPolicy,

    /// Log the raw rows of a specific mission ID
    #[arg(long)]
    id: Option<i32>,

    /// Enable verbose mode
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the mission store over HTTP
    Serve {
        /// [host]:port address to listen on
        #[arg(long, default_value = ":80")]
        addr: String,

        /// Path to the mission store
        #[arg(long, default_value = "eco.db")]
        db: PathBuf,
    },
    /// Ingest missions newer than the server's last ID and upload them
    Ingest {
        /// [host]:port address of the mission server
        #[arg(long, default_value = ":80")]
        addr: String,

        /// Do not upload missions to the server
        #[arg(long, default_value_t = false)]
        dry: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Process every mission of an export straight into a local store
    Migrate {
        /// Path to the mission store
        #[arg(long, default_value = "eco.db")]
        db: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Print statistics of the mission server
    Stats {
        /// [host]:port address of the mission server
        #[arg(long, default_value = ":80")]
        addr: String,

        /// Display cities stats
        #[arg(long, default_value_t = false)]
        cities: bool,

        /// Display countries stats
        #[arg(long, default_value_t = false)]
        countries: bool,
    },
    /// Export every stored mission as tab-separated values
    Export {
        /// Path to the mission store
        #[arg(long, default_value = "eco.db")]
        db: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "missions.tsv")]
        output: PathBuf,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Look up a place and its round trip distance from the origin
    Locate {
        /// Free-text place query
        #[arg(required = true)]
        query: Vec<String>,

        /// Preferred languages of the answer
        #[arg(long, value_delimiter = ',', default_value = "fr,en")]
        lang: Vec<String>,

        /// Ask for address details
        #[arg(long, default_value_t = false)]
        addr_details: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env()?;
    let _file_guard = init_logging(&settings.log_file_path)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr, db } => {
            server::serve(&addr, &db).await?;
        }
        Commands::Ingest {
            addr,
            dry,
            pipeline,
        } => {
            let eco = EcoClient::new(BasicClient::new(), &addr)?;
            let last_id = eco
                .last_id()
                .await
                .context("Could not retrieve last mission id")?;
            info!(last_id, server = %eco.base_url(), "Last mission id");

            let report = run_pipeline(&settings, &pipeline, last_id).await?;

            if dry {
                info!(addr = %addr, "Dry mode enabled: no upload to the mission server");
            } else if !report.missions.is_empty() {
                eco.update_db(&report.missions)
                    .await
                    .context("Could not upload new missions")?;
            }

            check_report(&report)?;
        }
        Commands::Migrate { db, pipeline } => {
            let mut store = MissionStore::open_path(&db)?;
            let report = run_pipeline(&settings, &pipeline, 0).await?;

            let n = store.store_batch(&report.missions)?;
            info!(missions = n, last_id = store.last_id(), db = %db.display(), "Missions stored");

            check_report(&report)?;
        }
        Commands::Stats {
            addr,
            cities,
            countries,
        } => {
            let eco = EcoClient::new(BasicClient::new(), &addr)?;
            info!(server = %eco.base_url(), "Querying stats");
            let summary = eco.stats().await.context("Could not query stats")?;
            print_summary(&summary, cities, countries);
        }
        Commands::Export { db, output, gzip } => {
            let store = MissionStore::open_path(&db)?;
            let missions = store.missions()?;
            export_missions(&output, &missions, gzip)?;
        }
        Commands::Locate {
            query,
            lang,
            addr_details,
        } => {
            locate(&settings, &query.join(" "), lang, addr_details).await?;
        }
    }

    Ok(())
}

/// Colored stderr output plus a JSON daily-rolling log file.
fn init_logging(log_file_path: &str) -> Result<WorkerGuard> {
    let log_dir = Path::new(log_file_path)
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("eco_missions.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Reads the raw export and runs it through the pipeline, skipping ids up to `after_id`.
async fn run_pipeline(settings: &Settings, args: &PipelineArgs, after_id: i32) -> Result<IngestReport> {
    let fixups = FixupTables::load(&args.fixups_tid, &args.fixups_dest)
        .context("Could not load fixup tables")?;
    info!(
        transport = fixups.transport.len(),
        destination = fixups.destination.len(),
        "Fixup tables loaded"
    );

    let rows = read_legs_from_path(&args.legs)
        .with_context(|| format!("Could not read raw missions from {}", args.legs.display()))?;

    let geocoder = NominatimClient::from_config(&settings.geocoder)?
        .address_details(true)
        .accept_languages(["fr", "en"]);

    let options = PipelineOptions {
        after_id,
        policy: args.policy,
        trace_id: args.id,
        verbose: args.verbose,
    };
    let pipeline = Pipeline::new(&fixups, &geocoder, settings.origin.clone(), options);

    Ok(pipeline.run(rows, Utc::now()).await?)
}

/// Fails the run when a mission could not be classified or resolved.
fn check_report(report: &IngestReport) -> Result<()> {
    if report.all_good() {
        return Ok(());
    }

    report.log_counts();
    for failure in &report.failures {
        warn!(kind = ?failure.kind(), "{failure}");
    }
    error!(
        invalid = report.invalid(),
        failures = report.failures.len(),
        "Could not handle at least one mission, check the fixup tables"
    );
    bail!("{} mission(s) could not be processed", report.failures.len())
}

#[tracing::instrument(skip(settings, languages))]
async fn locate(settings: &Settings, query: &str, languages: Vec<String>, addr_details: bool) -> Result<()> {
    let geocoder = NominatimClient::from_config(&settings.geocoder)?
        .address_details(addr_details)
        .accept_languages(languages);

    let places = geocoder.search(query).await?;
    let Some(place) = places.first() else {
        bail!("No place found for {query:?}");
    };

    let lat: f64 = place
        .lat
        .parse()
        .with_context(|| format!("Invalid latitude {:?}", place.lat))?;
    let lng: f64 = place
        .lng
        .parse()
        .with_context(|| format!("Invalid longitude {:?}", place.lng))?;
    let dest = Location::new(place.display_name.clone(), lat, lng);
    let distance = round_trip_distance(&settings.origin, &dest);

    info!(
        name = %place.display_name,
        lat,
        lng,
        origin = %settings.origin.name,
        round_trip_km = distance as i64 / 1000,
        "Place found"
    );
    for (i, place) in places.iter().enumerate() {
        debug!(index = i, place = ?place, "Candidate");
    }

    Ok(())
}
