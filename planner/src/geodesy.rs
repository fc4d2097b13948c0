use shared::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const MAX_FIT_ZOOM: f64 = 17.0;
const MIN_FIT_ZOOM: f64 = 2.0;

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Axis-aligned box around a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    pub fn of(path: &[Coordinate]) -> Option<Self> {
        let (first, rest) = path.split_first()?;
        let mut bounds = Self {
            south_west: *first,
            north_east: *first,
        };
        for point in rest {
            bounds.south_west.lat = bounds.south_west.lat.min(point.lat);
            bounds.south_west.lon = bounds.south_west.lon.min(point.lon);
            bounds.north_east.lat = bounds.north_east.lat.max(point.lat);
            bounds.north_east.lon = bounds.north_east.lon.max(point.lon);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Coordinate {
        self.south_west.interpolate(self.north_east, 0.5)
    }

    /// Web-mercator zoom level at which the box roughly fills the view.
    pub fn zoom_to_fit(&self) -> f64 {
        let span = (self.north_east.lat - self.south_west.lat)
            .max(self.north_east.lon - self.south_west.lon);
        if span <= f64::EPSILON {
            return MAX_FIT_ZOOM;
        }
        (360.0 / span).log2().floor().clamp(MIN_FIT_ZOOM, MAX_FIT_ZOOM)
    }
}
