use crate::error::Result;
use crate::extract::load_sources;
use crate::geodesy::GeodesicDistance;
use crate::load::{SqliteSink, TableSink, replace, write_parquet};
use crate::report::{ChartRenderer, Reports, render_reports};
use crate::structs::{Airline, Airport, EnrichedRoute, PipelineConfig, TableRow};
use crate::transform::{EnrichedTables, enrich};
use log::{debug, info};
use std::fs;
use std::time::Instant;

/// Row counts and reports of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub airlines: usize,
    pub airports: usize,
    pub routes: usize,
    pub enriched_routes: usize,
    pub reports: Option<Reports>,
}

/// Runs the whole job against the store named in `config.store`.
///
/// The store is only opened once loading and enrichment have succeeded, and
/// the connection is closed when this function returns.
pub fn run_pipeline(
    config: &PipelineConfig,
    renderer: &mut dyn ChartRenderer,
) -> Result<RunSummary> {
    let tables = prepare(config)?;
    let mut sink = SqliteSink::open(&config.store)?;
    finish(config, tables, &mut sink, renderer)
}

/// Loader, then Enricher, then Sink and Reporter, against any sink.
///
/// # Errors
///
/// A load failure aborts before anything is written. A persistence failure
/// aborts the run; tables already replaced before it are not rolled back.
pub fn execute(
    config: &PipelineConfig,
    sink: &mut dyn TableSink,
    renderer: &mut dyn ChartRenderer,
) -> Result<RunSummary> {
    let tables = prepare(config)?;
    finish(config, tables, sink, renderer)
}

fn prepare(config: &PipelineConfig) -> Result<EnrichedTables> {
    let load_start = Instant::now();
    let sources = load_sources(&config.inputs, config.has_headers)?;
    debug!("Load took {:.2?}", load_start.elapsed());

    let transform_start = Instant::now();
    let tables = enrich(sources, &GeodesicDistance::wgs84());
    debug!("Enrichment took {:.2?}", transform_start.elapsed());
    Ok(tables)
}

fn finish(
    config: &PipelineConfig,
    tables: EnrichedTables,
    sink: &mut dyn TableSink,
    renderer: &mut dyn ChartRenderer,
) -> Result<RunSummary> {
    let persist_start = Instant::now();
    persist(&tables, sink)?;
    debug!("Persistence took {:.2?}", persist_start.elapsed());

    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir)?;
        write_parquet(&tables.airlines, &dir.join(format!("{}.parquet", Airline::TABLE)))?;
        write_parquet(&tables.airports, &dir.join(format!("{}.parquet", Airport::TABLE)))?;
        write_parquet(
            &tables.enriched_routes,
            &dir.join(format!("{}.parquet", EnrichedRoute::TABLE)),
        )?;
        info!("Wrote Parquet snapshots to {}", dir.display());
    }

    let reports = if config.report {
        // Reports read the cleaned routes before the coordinate filter.
        let reports = Reports::build(&tables.routes);
        render_reports(&reports, renderer)?;
        if let Some(dir) = &config.output_dir {
            reports.write_files(dir)?;
            info!("Wrote reports to {}", dir.display());
        }
        Some(reports)
    } else {
        debug!("Reporting disabled");
        None
    };

    Ok(RunSummary {
        airlines: tables.airlines.len(),
        airports: tables.airports.len(),
        routes: tables.routes.len(),
        enriched_routes: tables.enriched_routes.len(),
        reports,
    })
}

fn persist(tables: &EnrichedTables, sink: &mut dyn TableSink) -> Result<()> {
    replace(sink, &tables.airlines)?;
    replace(sink, &tables.airports)?;
    replace(sink, &tables.enriched_routes)?;
    info!(
        "Persisted {} airlines, {} airports, {} routes",
        tables.airlines.len(),
        tables.airports.len(),
        tables.enriched_routes.len()
    );
    Ok(())
}
