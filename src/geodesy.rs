use crate::structs::Coordinates;
use geographiclib_rs::{Geodesic, InverseGeodesic};

/// Solves the inverse geodesic problem on the WGS-84 ellipsoid.
///
/// Uses Karney's algorithm, which converges for every pair of points
/// (including nearly antipodal ones) and is accurate to a few nanometres.
pub struct GeodesicDistance {
    ellipsoid: Geodesic,
}

impl GeodesicDistance {
    pub fn wgs84() -> Self {
        Self {
            ellipsoid: Geodesic::wgs84(),
        }
    }

    /// Returns the length in kilometres of the shortest path between `a` and `b`.
    ///
    /// The result is symmetric bit-for-bit: the endpoints are put in a
    /// canonical order before solving. Identical points give exactly `0.0`.
    /// Non-finite coordinates or a latitude outside [-90, 90] give `NaN`,
    /// which callers must filter.
    pub fn kilometres(&self, a: Coordinates, b: Coordinates) -> f64 {
        if !is_valid(a) || !is_valid(b) {
            return f64::NAN;
        }
        if a == b {
            return 0.0;
        }
        let (p, q) = if (a.latitude, a.longitude) <= (b.latitude, b.longitude) {
            (a, b)
        } else {
            (b, a)
        };
        let metres: f64 = self
            .ellipsoid
            .inverse(p.latitude, p.longitude, q.latitude, q.longitude);
        metres.abs() / 1000.0
    }
}

fn is_valid(c: Coordinates) -> bool {
    c.latitude.is_finite() && c.longitude.is_finite() && (-90.0..=90.0).contains(&c.latitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude,
        }
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = GeodesicDistance::wgs84().kilometres(at(0.0, 0.0), at(0.0, 1.0));
        // a * pi / 180 on the WGS-84 equator
        assert!((d - 111.319_49).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn self_distance_is_exactly_zero() {
        let geod = GeodesicDistance::wgs84();
        assert_eq!(geod.kilometres(at(51.47, -0.4543), at(51.47, -0.4543)), 0.0);
        assert_eq!(geod.kilometres(at(0.0, 0.0), at(0.0, 0.0)), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let geod = GeodesicDistance::wgs84();
        let pairs = [
            (at(51.4706, -0.461941), at(40.639801, -73.7789)),
            (at(-33.946098, 151.177002), at(1.35019, 103.994003)),
            (at(64.13, -21.94), at(-54.84, -68.29)),
            (at(0.0, 0.0), at(0.5, 179.7)),
        ];
        for (a, b) in pairs {
            assert_eq!(geod.kilometres(a, b), geod.kilometres(b, a));
        }
    }

    #[test]
    fn invalid_latitude_is_nan() {
        let geod = GeodesicDistance::wgs84();
        assert!(geod.kilometres(at(91.0, 0.0), at(0.0, 0.0)).is_nan());
        assert!(geod.kilometres(at(f64::NAN, 0.0), at(0.0, 0.0)).is_nan());
    }

    #[test]
    fn london_to_new_york_is_about_5555_km() {
        let d = GeodesicDistance::wgs84().kilometres(
            at(51.4706, -0.461941),
            at(40.639801, -73.7789),
        );
        assert!((5530.0..5580.0).contains(&d), "got {d}");
        assert!(d.is_finite() && d >= 0.0);
    }
}
