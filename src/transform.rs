use crate::extract::SourceTables;
use crate::geodesy::GeodesicDistance;
use crate::structs::{
    Airline, Airport, Coordinates, EnrichedRoute, JoinedRoute, ResolvedRoute, Route,
};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Codeshare value assigned when the source leaves the flag empty.
pub const DEFAULT_CODESHARE: &str = "N";

/// Output of the enrichment stage.
///
/// `routes` is the cleaned routes table before the coordinate join; it feeds
/// the reports. `enriched_routes` is the subset with both endpoints located
/// and a distance, which is what gets persisted.
#[derive(Debug, Clone, Default)]
pub struct EnrichedTables {
    pub airlines: Vec<Airline>,
    pub airports: Vec<Airport>,
    pub routes: Vec<Route>,
    pub enriched_routes: Vec<EnrichedRoute>,
}

/// Cleans the three source tables and enriches routes with coordinates and
/// geodesic distance.
///
/// # Arguments
///
/// * `sources` - Tables produced by the loader, nulls already reified
/// * `geodesic` - Distance solver used for every surviving route
///
/// # Returns
///
/// Returns the cleaned airlines and airports, the cleaned routes (pre-join)
/// and the enriched routes. Rows dropped along the way are only counted in
/// the debug log; no per-row failure is surfaced as an error.
pub fn enrich(sources: SourceTables, geodesic: &GeodesicDistance) -> EnrichedTables {
    let airlines = filter_airlines(sources.airlines);
    let airports = filter_airports(sources.airports);
    let routes = fill_codeshare(filter_routes(sources.routes));

    let index = CoordinateIndex::from_airports(&airports);
    let joined = join_coordinates(routes.clone(), &index);
    let resolved = complete_coordinates(joined);
    let enriched_routes = attach_distances(resolved, geodesic);

    info!(
        "Enriched {} of {} cleaned routes with distances",
        enriched_routes.len(),
        routes.len()
    );

    EnrichedTables {
        airlines,
        airports,
        routes,
        enriched_routes,
    }
}

fn log_dropped(table: &str, reason: &str, before: usize, after: usize) {
    if before > after {
        debug!("Dropped {} {} rows: {}", before - after, table, reason);
    }
}

/// Drops airlines without a name or a country.
pub fn filter_airlines(airlines: Vec<Airline>) -> Vec<Airline> {
    let before = airlines.len();
    let kept: Vec<Airline> = airlines
        .into_iter()
        .filter(|a| a.name.is_some() && a.country.is_some())
        .collect();
    log_dropped("airlines", "missing name or country", before, kept.len());
    kept
}

/// Drops airports without both latitude and longitude. A non-finite
/// coordinate counts as missing.
pub fn filter_airports(airports: Vec<Airport>) -> Vec<Airport> {
    let before = airports.len();
    let kept: Vec<Airport> = airports
        .into_iter()
        .filter(|a| {
            a.latitude.is_some_and(f64::is_finite) && a.longitude.is_some_and(f64::is_finite)
        })
        .collect();
    log_dropped("airports", "missing coordinates", before, kept.len());
    kept
}

/// Drops routes missing the airline, source airport or destination airport.
pub fn filter_routes(routes: Vec<Route>) -> Vec<Route> {
    let before = routes.len();
    let kept: Vec<Route> = routes
        .into_iter()
        .filter(|r| {
            r.airline.is_some() && r.source_airport.is_some() && r.destination_airport.is_some()
        })
        .collect();
    log_dropped(
        "routes",
        "missing airline or endpoint code",
        before,
        kept.len(),
    );
    kept
}

/// Sets an absent codeshare flag to [`DEFAULT_CODESHARE`]; present values are
/// left untouched.
pub fn fill_codeshare(routes: Vec<Route>) -> Vec<Route> {
    routes
        .into_iter()
        .map(|mut route| {
            if route.codeshare.is_none() {
                route.codeshare = Some(DEFAULT_CODESHARE.to_string());
            }
            route
        })
        .collect()
}

/// Airport coordinates keyed by IATA code.
///
/// When several airports share a code, the first one in table order wins.
#[derive(Debug, Default)]
pub struct CoordinateIndex {
    by_code: HashMap<String, Coordinates>,
}

impl CoordinateIndex {
    pub fn from_airports(airports: &[Airport]) -> Self {
        let mut by_code = HashMap::with_capacity(airports.len());
        for airport in airports {
            if let (Some(code), Some(coords)) = (&airport.iata, airport.coordinates()) {
                by_code.entry(code.clone()).or_insert(coords);
            }
        }
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<Coordinates> {
        self.by_code.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Route endpoint a join is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

impl Endpoint {
    fn code(self, route: &Route) -> Option<&str> {
        match self {
            Endpoint::Source => route.source_airport.as_deref(),
            Endpoint::Destination => route.destination_airport.as_deref(),
        }
    }
}

/// Left-join lookup for one endpoint; a missing code or unknown airport is
/// `None` rather than an error.
pub fn lookup_endpoint(
    route: &Route,
    endpoint: Endpoint,
    index: &CoordinateIndex,
) -> Option<Coordinates> {
    endpoint.code(route).and_then(|code| index.get(code))
}

/// Attaches source and destination coordinates to every route. Routes are
/// never dropped here.
pub fn join_coordinates(routes: Vec<Route>, index: &CoordinateIndex) -> Vec<JoinedRoute> {
    routes
        .into_iter()
        .map(|route| {
            let source = lookup_endpoint(&route, Endpoint::Source, index);
            let destination = lookup_endpoint(&route, Endpoint::Destination, index);
            JoinedRoute {
                route,
                source,
                destination,
            }
        })
        .collect()
}

/// Keeps only routes whose both endpoints resolved to coordinates.
pub fn complete_coordinates(joined: Vec<JoinedRoute>) -> Vec<ResolvedRoute> {
    let before = joined.len();
    let resolved: Vec<ResolvedRoute> = joined
        .into_iter()
        .filter_map(|j| {
            Some(ResolvedRoute {
                source: j.source?,
                destination: j.destination?,
                route: j.route,
            })
        })
        .collect();
    log_dropped("routes", "unresolved endpoint coordinates", before, resolved.len());
    resolved
}

/// Computes the geodesic distance of every resolved route.
///
/// Routes whose distance comes out non-finite (coordinates outside the valid
/// range) are dropped with a warning.
pub fn attach_distances(
    routes: Vec<ResolvedRoute>,
    geodesic: &GeodesicDistance,
) -> Vec<EnrichedRoute> {
    routes
        .into_iter()
        .filter_map(|r| {
            let distance_km = geodesic.kilometres(r.source, r.destination);
            if !distance_km.is_finite() || distance_km < 0.0 {
                warn!(
                    "Skipping route {:?} -> {:?}: distance is not a finite value",
                    r.route.source_airport, r.route.destination_airport
                );
                return None;
            }
            Some(EnrichedRoute {
                route: r.route,
                source: r.source,
                destination: r.destination,
                distance_km,
            })
        })
        .collect()
}
