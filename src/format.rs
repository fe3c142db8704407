//! Human-readable values for the upload summary.

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() + 0.0)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Adding `0.0` turns the `-0.0` that rounding tiny negatives yields into `0`.
pub fn format_elevation(meters: f64) -> String {
    format!("{} m", meters.round() + 0.0)
}
