use crate::error::{PipelineError, Result};
use crate::structs::{Airline, Airport, Column, InputPaths, Route, TableRow};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use std::{fs::File, io::Read, path::Path};

/// Missing-value marker used by the OpenFlights dumps.
pub const NULL_SENTINEL: &str = "\\N";

/// The three source tables as loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub airlines: Vec<Airline>,
    pub airports: Vec<Airport>,
    pub routes: Vec<Route>,
}

/// A record type that can be decoded from one delimited source row.
pub trait FromFields: TableRow + Sized {
    fn from_fields(fields: &Fields<'_>) -> std::result::Result<Self, String>;
}

/// Typed view over one raw row. Every accessor maps the null sentinel (and
/// an empty cell) to `None`.
pub struct Fields<'a> {
    record: &'a StringRecord,
    columns: &'static [Column],
}

/// Maps the null sentinel and blank cells to `None`. Any other value is
/// returned as is.
pub fn null_if_sentinel(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty() || value == NULL_SENTINEL {
        None
    } else {
        Some(raw)
    }
}

impl<'a> Fields<'a> {
    fn raw(&self, index: usize) -> Option<&'a str> {
        self.record.get(index).and_then(null_if_sentinel)
    }

    pub fn text(&self, index: usize) -> Option<String> {
        self.raw(index).map(str::to_string)
    }

    pub fn integer(&self, index: usize) -> std::result::Result<Option<i64>, String> {
        self.parse(index, "an integer")
    }

    /// Parses a finite number; `NaN` and infinities are rejected.
    pub fn real(&self, index: usize) -> std::result::Result<Option<f64>, String> {
        match self.parse::<f64>(index, "a number")? {
            Some(v) if !v.is_finite() => Err(format!(
                "column '{}' should be a finite number but holds {}",
                self.columns[index].name, v
            )),
            value => Ok(value),
        }
    }

    fn parse<T: std::str::FromStr>(
        &self,
        index: usize,
        expected: &str,
    ) -> std::result::Result<Option<T>, String> {
        match self.raw(index) {
            None => Ok(None),
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
                format!(
                    "column '{}' should be {} but holds {:?}",
                    self.columns[index].name, expected, value
                )
            }),
        }
    }
}

impl FromFields for Airline {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, String> {
        Ok(Airline {
            id: f.integer(0)?,
            name: f.text(1),
            alias: f.text(2),
            iata: f.text(3),
            icao: f.text(4),
            callsign: f.text(5),
            country: f.text(6),
            active: f.text(7),
        })
    }
}

impl FromFields for Airport {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, String> {
        Ok(Airport {
            id: f.integer(0)?,
            name: f.text(1),
            city: f.text(2),
            country: f.text(3),
            iata: f.text(4),
            icao: f.text(5),
            latitude: f.real(6)?,
            longitude: f.real(7)?,
            altitude: f.integer(8)?,
            timezone: f.real(9)?,
            dst: f.text(10),
            tz_database: f.text(11),
            kind: f.text(12),
            source: f.text(13),
        })
    }
}

impl FromFields for Route {
    fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, String> {
        Ok(Route {
            airline: f.text(0),
            airline_id: f.integer(1)?,
            source_airport: f.text(2),
            source_airport_id: f.integer(3)?,
            destination_airport: f.text(4),
            destination_airport_id: f.integer(5)?,
            codeshare: f.text(6),
            stops: f.integer(7)?,
            equipment: f.text(8),
        })
    }
}

/// Loads the airlines, airports and routes sources.
///
/// # Errors
/// Returns `PipelineError::Load` as soon as one source is unreadable or
/// malformed; nothing is returned for the other sources in that case.
pub fn load_sources(paths: &InputPaths, has_headers: bool) -> Result<SourceTables> {
    let airlines = load_table::<Airline>(&paths.airlines, has_headers)?;
    let airports = load_table::<Airport>(&paths.airports, has_headers)?;
    let routes = load_table::<Route>(&paths.routes, has_headers)?;
    info!(
        "Loaded {} airlines, {} airports, {} routes",
        airlines.len(),
        airports.len(),
        routes.len()
    );
    Ok(SourceTables {
        airlines,
        airports,
        routes,
    })
}

/// Reads one delimited source file into typed records.
///
/// # Arguments
/// * `path` - Path to the comma-delimited source file
/// * `has_headers` - Whether the first line is a header row to skip
///
/// # Errors
/// Returns `PipelineError::Load` if the file cannot be opened or read, a row
/// does not have exactly `T::COLUMNS.len()` fields, or a numeric column
/// holds a non-numeric value.
pub fn load_table<T: FromFields>(path: &Path, has_headers: bool) -> Result<Vec<T>> {
    debug!("Reading {} from {}", T::TABLE, path.display());
    let file = File::open(path).map_err(|e| PipelineError::load(path, e.to_string()))?;
    read_table(file, has_headers, path)
}

/// Same as [`load_table`] over any reader; `origin` is only used in errors.
pub fn read_table<T: FromFields, R: Read>(
    reader: R,
    has_headers: bool,
    origin: &Path,
) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(reader);

    let expected = T::COLUMNS.len();
    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(PipelineError::load(origin, e.to_string())),
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() != expected {
            return Err(PipelineError::load(
                origin,
                format!(
                    "line {}: expected {} columns for {}, found {}",
                    line,
                    expected,
                    T::TABLE,
                    record.len()
                ),
            ));
        }
        let fields = Fields {
            record: &record,
            columns: T::COLUMNS,
        };
        let row = T::from_fields(&fields)
            .map_err(|reason| PipelineError::load(origin, format!("line {line}: {reason}")))?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn origin() -> PathBuf {
        PathBuf::from("memory.dat")
    }

    #[test]
    fn sentinel_becomes_none() {
        assert_eq!(null_if_sentinel("\\N"), None);
        assert_eq!(null_if_sentinel(""), None);
        assert_eq!(null_if_sentinel("N"), Some("N"));
        assert_eq!(null_if_sentinel("Goroka"), Some("Goroka"));
        assert_eq!(null_if_sentinel("  "), None);
        assert_eq!(null_if_sentinel(" Port Moresby "), Some(" Port Moresby "));
    }

    #[test]
    fn text_cells_keep_surrounding_whitespace() {
        let data = "1,\" Alpha Air \",\\N,AA,AAL,ALPHA,Testland,Y\n";
        let airlines: Vec<Airline> = read_table(data.as_bytes(), false, &origin()).unwrap();
        assert_eq!(airlines[0].name.as_deref(), Some(" Alpha Air "));
    }

    #[test]
    fn non_finite_coordinates_are_a_load_error() {
        for (lat, lon) in [("NaN", "0"), ("0", "inf"), ("-infinity", "1.5")] {
            let data = format!("1,A,B,C,AAA,AAAA,{lat},{lon},0,0,U,X,airport,Src\n");
            let err = read_table::<Airport, _>(data.as_bytes(), false, &origin()).unwrap_err();
            assert!(matches!(err, PipelineError::Load { .. }), "{lat},{lon}");
            assert!(err.to_string().contains("finite"), "{err}");
        }
    }

    #[test]
    fn reads_openflights_airport_row() {
        let data = "1,\"Goroka Airport\",\"Goroka\",\"Papua New Guinea\",\"GKA\",\"AYGA\",-6.081689834590001,145.391998291,5282,10,\"U\",\"Pacific/Port_Moresby\",\"airport\",\"OurAirports\"\n";
        let airports: Vec<Airport> = read_table(data.as_bytes(), false, &origin()).unwrap();
        assert_eq!(airports.len(), 1);
        let goroka = &airports[0];
        assert_eq!(goroka.id, Some(1));
        assert_eq!(goroka.iata.as_deref(), Some("GKA"));
        assert_eq!(goroka.latitude, Some(-6.081689834590001));
        assert_eq!(goroka.altitude, Some(5282));
        assert_eq!(goroka.tz_database.as_deref(), Some("Pacific/Port_Moresby"));
    }

    #[test]
    fn reads_route_with_null_ids_and_codeshare() {
        let data = "2B,410,AER,2965,KZN,2990,,0,CR2\nZM,\\N,FRU,2912,OSS,\\N,Y,0,734\n";
        let routes: Vec<Route> = read_table(data.as_bytes(), false, &origin()).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].codeshare, None);
        assert_eq!(routes[0].stops, Some(0));
        assert_eq!(routes[1].airline_id, None);
        assert_eq!(routes[1].destination_airport_id, None);
        assert_eq!(routes[1].codeshare.as_deref(), Some("Y"));
    }

    #[test]
    fn header_row_is_skipped_when_requested() {
        let data = "a,b,c,d,e,f,g,h\n-1,\"Unknown\",\\N,\"-\",\"N/A\",\\N,\\N,\"Y\"\n";
        let airlines: Vec<Airline> = read_table(data.as_bytes(), true, &origin()).unwrap();
        assert_eq!(airlines.len(), 1);
        assert_eq!(airlines[0].id, Some(-1));
        assert_eq!(airlines[0].alias, None);
        assert_eq!(airlines[0].country, None);
    }

    #[test]
    fn column_count_mismatch_is_a_load_error() {
        let data = "2B,410,AER,2965,KZN,2990,,0,CR2\n2B,410,AER\n";
        let err = read_table::<Route, _>(data.as_bytes(), false, &origin()).unwrap_err();
        match err {
            PipelineError::Load { path, reason } => {
                assert_eq!(path, origin());
                assert!(reason.contains("line 2"), "{reason}");
                assert!(reason.contains("expected 9"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_latitude_is_a_load_error() {
        let data = "1,A,B,C,AAA,AAAA,north,1.0,0,0,U,X,airport,Src\n";
        let err = read_table::<Airport, _>(data.as_bytes(), false, &origin()).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert!(err.to_string().contains("Latitude"));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_table::<Airline>(Path::new("/nonexistent/airlines.dat"), false)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }
}
