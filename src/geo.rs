//! Great-circle distances.

/// A point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Mean Earth radius in metres.
pub const EARTH_RADIUS: f64 = 6.371e6;

/// Distance in metres between two points on a spherical Earth, using the
/// haversine formula.
pub fn haversine(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = hsin(d_lat) + lat1.cos() * lat2.cos() * hsin(d_lng);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS * c
}

fn hsin(theta: f64) -> f64 {
    let s = (0.5 * theta).sin();
    s * s
}

#[cfg(test)]
mod tests {
    use super::*;

    // km-level precision
    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1000.0
    }

    #[test]
    fn test_haversine_known_distances() {
        let clermont = Point::new(45.7774551, 3.0819427);
        let cases = [
            (Point::default(), Point::default(), 0.0),
            (Point::new(50.0, 5.0), Point::new(58.0, 3.0), 899_000.0),
            (Point::new(50.0359, 5.4253), Point::new(58.3838, 3.0412), 940_000.0),
            (
                Point::new(38.898556, -77.037852),
                Point::new(38.897147, -77.043934),
                549.0,
            ),
            (clermont, Point::new(48.8566101, 2.3514992), 346_000.0),
            (clermont, Point::new(46.2334715, 6.0555674), 235_000.0),
            (clermont, Point::new(45.6963425, 4.73594802991681), 129_000.0),
        ];
        for (a, b, want) in cases {
            let got = haversine(a, b);
            assert!(approx_eq(got, want), "haversine({a:?}, {b:?}) = {got}, want {want}");
        }
    }

    #[test]
    fn test_haversine_same_point_is_exactly_zero() {
        let clermont = Point::new(45.7774551, 3.0819427);
        assert_eq!(haversine(clermont, clermont), 0.0);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = Point::new(45.7774551, 3.0819427);
        let b = Point::new(48.8566101, 2.3514992);
        assert!((haversine(a, b) - haversine(b, a)).abs() < 1e-6);
    }
}
