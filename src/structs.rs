use log::{Level, Log, Metadata, Record as LogRecord};
use serde::Serialize;
use std::path::PathBuf;

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &LogRecord) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error | Level::Warn => eprintln!("[{}] {}", record.level(), record.args()),
            _ => println!("[{}] {}", record.level(), record.args()),
        }
    }

    fn flush(&self) {}
}

/// Storage type of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Text,
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Integer,
    }
}

const fn real(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Real,
    }
}

/// A single table cell. `None` is the absence marker for a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
}

/// A record that can be written out as a row of a named relation.
///
/// `cells` must yield one cell per entry of `COLUMNS`, in the same order and
/// with a matching `ColumnType`.
pub trait TableRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];

    fn cells(&self) -> Vec<Cell>;
}

/// Airline record with the legacy OpenFlights column set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airline {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub callsign: Option<String>,
    pub country: Option<String>,
    pub active: Option<String>,
}

impl TableRow for Airline {
    const TABLE: &'static str = "airlines";
    const COLUMNS: &'static [Column] = &[
        integer("Airline ID"),
        text("Name"),
        text("Alias"),
        text("IATA"),
        text("ICAO"),
        text("Callsign"),
        text("Country"),
        text("Active"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(self.id),
            Cell::Text(self.name.clone()),
            Cell::Text(self.alias.clone()),
            Cell::Text(self.iata.clone()),
            Cell::Text(self.icao.clone()),
            Cell::Text(self.callsign.clone()),
            Cell::Text(self.country.clone()),
            Cell::Text(self.active.clone()),
        ]
    }
}

/// Airport record with the legacy OpenFlights column set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<i64>,
    pub timezone: Option<f64>,
    pub dst: Option<String>,
    pub tz_database: Option<String>,
    pub kind: Option<String>,
    pub source: Option<String>,
}

impl Airport {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

impl TableRow for Airport {
    const TABLE: &'static str = "airports";
    const COLUMNS: &'static [Column] = &[
        integer("Airport ID"),
        text("Name"),
        text("City"),
        text("Country"),
        text("IATA"),
        text("ICAO"),
        real("Latitude"),
        real("Longitude"),
        integer("Altitude"),
        real("Timezone"),
        text("DST"),
        text("Tz database time zone"),
        text("Type"),
        text("Source"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(self.id),
            Cell::Text(self.name.clone()),
            Cell::Text(self.city.clone()),
            Cell::Text(self.country.clone()),
            Cell::Text(self.iata.clone()),
            Cell::Text(self.icao.clone()),
            Cell::Real(self.latitude),
            Cell::Real(self.longitude),
            Cell::Integer(self.altitude),
            Cell::Real(self.timezone),
            Cell::Text(self.dst.clone()),
            Cell::Text(self.tz_database.clone()),
            Cell::Text(self.kind.clone()),
            Cell::Text(self.source.clone()),
        ]
    }
}

/// Route record with the legacy OpenFlights column set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub airline: Option<String>,
    pub airline_id: Option<i64>,
    pub source_airport: Option<String>,
    pub source_airport_id: Option<i64>,
    pub destination_airport: Option<String>,
    pub destination_airport_id: Option<i64>,
    pub codeshare: Option<String>,
    pub stops: Option<i64>,
    pub equipment: Option<String>,
}

const ROUTE_COLUMNS: [Column; 9] = [
    text("Airline"),
    integer("Airline ID"),
    text("Source airport"),
    integer("Source airport ID"),
    text("Destination airport"),
    integer("Destination airport ID"),
    text("Codeshare"),
    integer("Stops"),
    text("Equipment"),
];

impl TableRow for Route {
    const TABLE: &'static str = "routes";
    const COLUMNS: &'static [Column] = &ROUTE_COLUMNS;

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.airline.clone()),
            Cell::Integer(self.airline_id),
            Cell::Text(self.source_airport.clone()),
            Cell::Integer(self.source_airport_id),
            Cell::Text(self.destination_airport.clone()),
            Cell::Integer(self.destination_airport_id),
            Cell::Text(self.codeshare.clone()),
            Cell::Integer(self.stops),
            Cell::Text(self.equipment.clone()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Route after the coordinate join. Either side is `None` when the join
/// found no airport with coordinates for that code.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRoute {
    pub route: Route,
    pub source: Option<Coordinates>,
    pub destination: Option<Coordinates>,
}

/// Route whose both endpoints resolved to coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub route: Route,
    pub source: Coordinates,
    pub destination: Coordinates,
}

/// Route with resolved endpoints and its geodesic length.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRoute {
    pub route: Route,
    pub source: Coordinates,
    pub destination: Coordinates,
    pub distance_km: f64,
}

impl TableRow for EnrichedRoute {
    const TABLE: &'static str = "routes";
    const COLUMNS: &'static [Column] = &[
        ROUTE_COLUMNS[0],
        ROUTE_COLUMNS[1],
        ROUTE_COLUMNS[2],
        ROUTE_COLUMNS[3],
        ROUTE_COLUMNS[4],
        ROUTE_COLUMNS[5],
        ROUTE_COLUMNS[6],
        ROUTE_COLUMNS[7],
        ROUTE_COLUMNS[8],
        real("Distance_km"),
    ];

    fn cells(&self) -> Vec<Cell> {
        let mut cells = self.route.cells();
        cells.push(Cell::Real(Some(self.distance_km)));
        cells
    }
}

/// Paths of the three delimited source files.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub airlines: PathBuf,
    pub airports: PathBuf,
    pub routes: PathBuf,
}

/// Where the relational store lives and who connects to it.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionDescriptor {
    /// Connection string with user and password form-url-encoded, so
    /// characters such as `@`, `:` or `/` in a credential cannot break it.
    pub fn connection_url(&self) -> String {
        format!(
            "sqlite://{}:{}@{}/{}",
            escape(&self.user),
            escape(&self.password),
            self.host,
            self.database
        )
    }

    /// Connection string safe to print.
    pub fn redacted_url(&self) -> String {
        format!(
            "sqlite://{}:***@{}/{}",
            escape(&self.user),
            self.host,
            self.database
        )
    }

    /// Location of the store file for this descriptor.
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.host).join(format!("{}.sqlite3", self.database))
    }
}

impl Default for ConnectionDescriptor {
    fn default() -> Self {
        Self {
            host: ".".to_string(),
            user: "root".to_string(),
            password: String::new(),
            database: "flight_data".to_string(),
        }
    }
}

fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub has_headers: bool,
    pub store: ConnectionDescriptor,
    pub report: bool,
    pub output_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(inputs: InputPaths) -> Self {
        Self {
            inputs,
            has_headers: false,
            store: ConnectionDescriptor::default(),
            report: true,
            output_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(password: &str) -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: "db".to_string(),
            user: "root".to_string(),
            password: password.to_string(),
            database: "flight_data".to_string(),
        }
    }

    #[test]
    fn connection_url_escapes_credential() {
        let url = descriptor("Nour@2002").connection_url();
        assert_eq!(url, "sqlite://root:Nour%402002@db/flight_data");

        let url = descriptor("a b:/c").connection_url();
        assert_eq!(url, "sqlite://root:a+b%3A%2Fc@db/flight_data");
    }

    #[test]
    fn redacted_url_hides_password() {
        let url = descriptor("secret").redacted_url();
        assert!(!url.contains("secret"));
        assert_eq!(url, "sqlite://root:***@db/flight_data");
    }

    #[test]
    fn store_path_joins_host_and_database() {
        assert_eq!(
            descriptor("").store_path(),
            PathBuf::from("db").join("flight_data.sqlite3")
        );
    }

    #[test]
    fn enriched_route_cells_match_columns() {
        let route = EnrichedRoute {
            route: Route {
                airline: Some("2B".to_string()),
                airline_id: Some(410),
                source_airport: Some("AER".to_string()),
                source_airport_id: Some(2965),
                destination_airport: Some("KZN".to_string()),
                destination_airport_id: Some(2990),
                codeshare: Some("N".to_string()),
                stops: Some(0),
                equipment: Some("CR2".to_string()),
            },
            source: Coordinates {
                latitude: 43.4,
                longitude: 39.9,
            },
            destination: Coordinates {
                latitude: 55.6,
                longitude: 49.3,
            },
            distance_km: 1506.8,
        };

        let cells = route.cells();
        assert_eq!(cells.len(), EnrichedRoute::COLUMNS.len());
        assert_eq!(EnrichedRoute::COLUMNS[9].name, "Distance_km");
        assert_eq!(cells[9], Cell::Real(Some(1506.8)));
        for (cell, column) in cells.iter().zip(EnrichedRoute::COLUMNS) {
            let kind = match cell {
                Cell::Text(_) => ColumnType::Text,
                Cell::Integer(_) => ColumnType::Integer,
                Cell::Real(_) => ColumnType::Real,
            };
            assert_eq!(kind, column.kind, "column {}", column.name);
        }
    }
}
