use crate::error::Result;
use crate::load::{write_csv, write_json};
use crate::structs::Route;
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Number of rows kept by the ranked reports.
pub const REPORT_LIMIT: usize = 10;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopCount {
    pub stops: i64,
    pub routes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnderservedRoute {
    pub source_airport: String,
    pub destination_airport: String,
    pub airlines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirportRouteCount {
    pub airport: String,
    pub routes: usize,
}

/// Counts routes per stop count, ascending by stop count. Routes without a
/// stop count are left out.
pub fn stop_distribution(routes: &[Route]) -> Vec<StopCount> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for stops in routes.iter().filter_map(|r| r.stops) {
        *counts.entry(stops).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(stops, routes)| StopCount { stops, routes })
        .collect()
}

/// Source/destination pairs operated by exactly one distinct airline.
///
/// Pairs are visited in ascending (source, destination) order and the first
/// `limit` matching pairs are returned.
pub fn underserved_routes(routes: &[Route], limit: usize) -> Vec<UnderservedRoute> {
    let mut pairs: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for route in routes {
        if let (Some(airline), Some(src), Some(dst)) = (
            route.airline.as_deref(),
            route.source_airport.as_deref(),
            route.destination_airport.as_deref(),
        ) {
            pairs.entry((src, dst)).or_default().insert(airline);
        }
    }

    pairs
        .into_iter()
        .filter(|(_, airlines)| airlines.len() == 1)
        .take(limit)
        .map(|((src, dst), airlines)| UnderservedRoute {
            source_airport: src.to_string(),
            destination_airport: dst.to_string(),
            airlines: airlines.len(),
        })
        .collect()
}

/// Airports with the most outbound routes, descending. Ties keep the order
/// in which the airports first appear.
pub fn top_source_airports(routes: &[Route], limit: usize) -> Vec<AirportRouteCount> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<AirportRouteCount> = Vec::new();
    for code in routes.iter().filter_map(|r| r.source_airport.as_deref()) {
        match position.get(code) {
            Some(&i) => counts[i].routes += 1,
            None => {
                position.insert(code, counts.len());
                counts.push(AirportRouteCount {
                    airport: code.to_string(),
                    routes: 1,
                });
            }
        }
    }
    counts.sort_by(|a, b| b.routes.cmp(&a.routes));
    counts.truncate(limit);
    counts
}

/// The three descriptive reports over the cleaned routes table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reports {
    pub stops: Vec<StopCount>,
    pub underserved: Vec<UnderservedRoute>,
    pub top_airports: Vec<AirportRouteCount>,
}

impl Reports {
    pub fn build(routes: &[Route]) -> Self {
        Self {
            stops: stop_distribution(routes),
            underserved: underserved_routes(routes, REPORT_LIMIT),
            top_airports: top_source_airports(routes, REPORT_LIMIT),
        }
    }

    pub fn charts(&self) -> Vec<ChartSeries> {
        vec![
            ChartSeries {
                kind: ChartKind::Bar,
                title: "Number of Routes by Stop Count".to_string(),
                x_label: "Number of Stops".to_string(),
                y_label: "Number of Routes".to_string(),
                points: self
                    .stops
                    .iter()
                    .map(|s| (s.stops.to_string(), s.routes as f64))
                    .collect(),
            },
            ChartSeries {
                kind: ChartKind::HorizontalBar,
                title: "Top Underserved Routes".to_string(),
                x_label: "Number of Airlines".to_string(),
                y_label: "Routes (Source to Destination)".to_string(),
                points: self
                    .underserved
                    .iter()
                    .map(|u| {
                        (
                            format!("{} to {}", u.source_airport, u.destination_airport),
                            u.airlines as f64,
                        )
                    })
                    .collect(),
            },
            ChartSeries {
                kind: ChartKind::Heatmap,
                title: "Top Airports by Number of Routes".to_string(),
                x_label: "Airports".to_string(),
                y_label: "Route Frequency".to_string(),
                points: self
                    .top_airports
                    .iter()
                    .map(|a| (a.airport.clone(), a.routes as f64))
                    .collect(),
            },
        ]
    }

    /// Writes each report as `<name>.csv` and `<name>.json` under `dir`.
    pub fn write_files(&self, dir: &Path) -> Result<()> {
        write_report(&self.stops, dir, "stops_distribution")?;
        write_report(&self.underserved, dir, "underserved_routes")?;
        write_report(&self.top_airports, dir, "top_airports")?;
        Ok(())
    }
}

fn write_report<T: Serialize>(rows: &[T], dir: &Path, name: &str) -> Result<()> {
    let csv_path = dir.join(format!("{name}.csv"));
    let json_path = dir.join(format!("{name}.json"));
    write_csv(rows, &csv_path)?;
    write_json(rows, &json_path)?;
    debug!("  - {} / {}", csv_path.display(), json_path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Heatmap,
}

/// A labeled numeric series handed to a charting surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(String, f64)>,
}

/// Visualization surface the reports are drawn on.
pub trait ChartRenderer {
    fn render(&mut self, chart: &ChartSeries) -> Result<()>;
}

/// Draws charts as horizontal text bars through the logger.
#[derive(Debug, Default)]
pub struct TextChartRenderer;

impl ChartRenderer for TextChartRenderer {
    fn render(&mut self, chart: &ChartSeries) -> Result<()> {
        info!("{} ({:?})", chart.title, chart.kind);
        if chart.points.is_empty() {
            info!("  (no data)");
            return Ok(());
        }
        let label_width = chart.points.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let max = chart
            .points
            .iter()
            .map(|(_, v)| *v)
            .fold(0.0_f64, f64::max);
        for (label, value) in &chart.points {
            info!(
                "  {:>width$} | {} {}",
                label,
                "#".repeat(bar_length(*value, max)),
                value,
                width = label_width
            );
        }
        info!("  x: {} / y: {}", chart.x_label, chart.y_label);
        Ok(())
    }
}

fn bar_length(value: f64, max: f64) -> usize {
    if max <= 0.0 || !value.is_finite() {
        return 0;
    }
    ((value / max) * BAR_WIDTH as f64).round().max(0.0) as usize
}

/// Hands every report chart to `renderer`.
pub fn render_reports(reports: &Reports, renderer: &mut dyn ChartRenderer) -> Result<()> {
    for chart in reports.charts() {
        renderer.render(&chart)?;
    }
    Ok(())
}
