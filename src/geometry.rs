use geojson::{Feature, Geometry, Value};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Mean Earth radius in kilometers, same sphere as the track distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A map coordinate as the drawing layer reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A search rectangle in degrees, always with `west <= east` and `south <= north`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl SearchBounds {
    /// Bounds spanned by two opposite corners, given in any order.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            west: a.lng.min(b.lng),
            south: a.lat.min(b.lat),
            east: a.lng.max(b.lng),
            north: a.lat.max(b.lat),
        }
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south, self.east)
    }

    /// Equirectangular approximation of the enclosed area in km².
    ///
    /// Good enough for the few hundred km² the drawing tool allows; it gets
    /// worse towards the poles.
    pub fn area_km2(&self) -> f64 {
        let south = self.south.to_radians();
        let north = self.north.to_radians();
        let d_lat = north - south;
        let d_lon = (self.east - self.west).to_radians();

        let avg_lat = (south + north) / 2.0;
        let width = EARTH_RADIUS_KM * d_lon * avg_lat.cos();
        let height = EARTH_RADIUS_KM * d_lat;

        (width * height).abs()
    }

    /// Closed ring sw -> nw -> ne -> se -> sw as [lng, lat] positions.
    pub fn ring(&self) -> Vec<Vec<f64>> {
        [
            self.south_west(),
            self.north_west(),
            self.north_east(),
            self.south_east(),
            self.south_west(),
        ]
        .iter()
        .map(position)
        .collect()
    }
}

/// Area in km² of the rectangle spanned by two corners.
pub fn rectangle_area_km2(a: LatLng, b: LatLng) -> f64 {
    SearchBounds::from_corners(a, b).area_km2()
}

/// GeoJSON Polygon feature covering the bounds.
pub fn bounds_to_polygon(bounds: &SearchBounds) -> Feature {
    feature(Value::Polygon(vec![bounds.ring()]))
}

/// `POINT(lng lat)`
pub fn point_to_wkt(point: LatLng) -> String {
    format!("POINT({} {})", point.lng, point.lat)
}

/// GeoJSON LineString feature through the path's vertices, in order.
pub fn path_to_line_string(path: &[LatLng]) -> Feature {
    feature(Value::LineString(path.iter().map(position).collect()))
}

fn position(ll: &LatLng) -> Vec<f64> {
    vec![ll.lng, ll.lat]
}

fn feature(value: Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(Map::new()),
        foreign_members: None,
    }
}
