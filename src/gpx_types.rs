use serde::Serialize;

/// A single `<trkpt>` with valid coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
        }
    }

    pub fn with_ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }
}

/// A GPX track segment (<trkseg>). Point order is significant.
#[derive(Debug, Default, Clone)]
pub struct Segment {
    pub points: Vec<TrackPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Default, Clone)]
pub struct Track {
    pub name: Option<String>,
    pub segments: Vec<Segment>,
}

impl Track {
    /// True when no segment holds a point; such tracks are dropped on output.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.points.is_empty())
    }
}

/// Tracks of a parsed document, in document order.
///
/// Only lives for the duration of one minify/analyze call.
#[derive(Debug, Default, Clone)]
pub struct TrackDocument {
    pub tracks: Vec<Track>,
    /// `<trkpt>` elements dropped for a missing or unparsable lat/lon.
    pub skipped_points: usize,
}

impl TrackDocument {
    /// All retained points in document order, across segment and track boundaries.
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.tracks
            .iter()
            .flat_map(|t| &t.segments)
            .flat_map(|s| &s.points)
    }

    pub fn point_count(&self) -> usize {
        self.points().count()
    }
}

/// Axis-aligned bounding box of the retained points, in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl TrackBounds {
    pub fn from_point(pt: &TrackPoint) -> Self {
        Self {
            min_lat: pt.lat,
            max_lat: pt.lat,
            min_lon: pt.lon,
            max_lon: pt.lon,
        }
    }

    pub fn extend(&mut self, pt: &TrackPoint) {
        self.min_lat = self.min_lat.min(pt.lat);
        self.max_lat = self.max_lat.max(pt.lat);
        self.min_lon = self.min_lon.min(pt.lon);
        self.max_lon = self.max_lon.max(pt.lon);
    }
}

/// Aggregated metrics of one document.
///
/// `bounds` is all zeros when `point_count` is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub point_count: usize,
    /// Meters, rounded.
    pub distance: f64,
    /// Meters, rounded. Descents do not count.
    pub elevation_gain: f64,
    pub bounds: TrackBounds,
    pub skipped_points: usize,
}

impl AnalysisResult {
    pub fn has_points(&self) -> bool {
        self.point_count > 0
    }
}
