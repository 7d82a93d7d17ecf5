use clap::Parser;
use lib::{
    ConnectionDescriptor, InputPaths, PipelineConfig, PipelineError, SimpleLogger,
    TextChartRenderer, run_pipeline,
};
use log::debug;
use std::path::PathBuf;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// airlines source file (OpenFlights airlines.dat layout)
    #[arg(long)]
    airlines: PathBuf,

    /// airports source file (OpenFlights airports.dat layout)
    #[arg(long)]
    airports: PathBuf,

    /// routes source file (OpenFlights routes.dat layout)
    #[arg(long)]
    routes: PathBuf,

    /// Treat the first line of every source file as a header row
    #[arg(long, default_value_t = false)]
    has_headers: bool,

    /// Directory holding the relational store
    #[arg(long, default_value = ".")]
    db_host: String,

    /// Store user name
    #[arg(long, default_value = "root")]
    db_user: String,

    /// Store password
    #[arg(long, env = "FLIGHTS_DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,

    /// Store database name
    #[arg(long, default_value = "flight_data")]
    db_name: String,

    /// Skip the reporting step
    #[arg(long, default_value_t = false)]
    no_report: bool,

    /// Directory for report files and Parquet snapshots (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> Result<(), PipelineError> {
    let total_start = Instant::now();
    log::set_logger(&LOGGER)?;

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    println!("RouteEnricher! OpenFlights route enrichment pipeline");
    debug!(
        "Inputs: {} | {} | {}",
        args.airlines.display(),
        args.airports.display(),
        args.routes.display()
    );

    let store = ConnectionDescriptor {
        host: args.db_host,
        user: args.db_user,
        password: args.db_password,
        database: args.db_name,
    };
    debug!("Store: {}", store.redacted_url());

    let config = PipelineConfig {
        inputs: InputPaths {
            airlines: args.airlines,
            airports: args.airports,
            routes: args.routes,
        },
        has_headers: args.has_headers,
        store,
        report: !args.no_report,
        output_dir: args.output,
    };

    let summary = run_pipeline(&config, &mut TextChartRenderer)?;
    debug!(
        "Cleaned {} airlines, {} airports, {} routes ({} with distances)",
        summary.airlines, summary.airports, summary.routes, summary.enriched_routes
    );

    println!(
        "ETL process completed successfully in {:.2?}",
        total_start.elapsed()
    );
    Ok(())
}
