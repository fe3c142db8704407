use crate::gpx_types::*;

/// Mean Earth radius in meters.
///
/// A spherical model is ~0.3% off the ellipsoid, which is fine for comparing
/// outdoor routes.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Running totals over a sequence of points.
#[derive(Debug, Default)]
pub struct TrackStats {
    point_count: usize,
    distance: f64,
    elevation_gain: f64,
    bounds: Option<TrackBounds>,
    last: Option<TrackPoint>,
}

impl TrackStats {
    pub fn push(&mut self, pt: &TrackPoint) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(pt),
            None => self.bounds = Some(TrackBounds::from_point(pt)),
        }

        if let Some(prev) = self.last {
            self.distance += haversine_distance(prev.lat, prev.lon, pt.lat, pt.lon);

            if let (Some(prev_ele), Some(ele)) = (prev.ele, pt.ele) {
                let diff = ele - prev_ele;
                if diff > 0.0 {
                    self.elevation_gain += diff;
                }
            }
        }

        self.last = Some(*pt);
        self.point_count += 1;
    }

    /// Gain so far in meters, unrounded.
    pub fn elevation_gain(&self) -> f64 {
        self.elevation_gain
    }

    pub fn finish(self, skipped_points: usize) -> AnalysisResult {
        AnalysisResult {
            point_count: self.point_count,
            distance: self.distance.round(),
            elevation_gain: self.elevation_gain.round(),
            // No points: report zeros, callers check point_count.
            bounds: self.bounds.unwrap_or_default(),
            skipped_points,
        }
    }
}

/// Compute point count, distance, elevation gain and bounds of a document.
///
/// Points are walked in document order and the previous point carries over
/// segment and track boundaries, so the gap between two segments is part of
/// the distance.
pub fn analyze(doc: &TrackDocument) -> AnalysisResult {
    let mut stats = TrackStats::default();
    for pt in doc.points() {
        stats.push(pt);
    }
    stats.finish(doc.skipped_points)
}
