pub mod analyzer;
pub mod error;
pub mod format;
pub mod geometry;
pub mod gpx_types;
pub mod minifier;
pub mod options;
pub mod parser;
pub mod writer;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::geometry::{LatLng, SearchBounds};
use crate::options::MinifyOptions;

/// Minify a GPX string and analyze its tracks.
///
/// Returns `{ minifiedContent, analysis }`, where `analysis` also carries
/// `originalSize`, `minifiedSize` and `reductionPercent`.
#[wasm_bindgen(js_name = minifyGpx)]
pub fn minify_gpx(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let report = minifier::minify_gpx(gpx_string, &opts)?.into_report(gpx_string.len());
    to_js(&report)
}

/// Analyze a GPX string without building the minified document.
#[wasm_bindgen(js_name = analyzeGpx)]
pub fn analyze_gpx(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    to_js(&minifier::analyze_gpx(gpx_string)?)
}

/// Estimated fraction of the file that minification would remove.
#[wasm_bindgen(js_name = estimateReduction)]
pub fn estimate_reduction(gpx_string: &str) -> f64 {
    minifier::estimate_reduction(gpx_string)
}

/// Area in km² of the rectangle spanned by two `{lat, lng}` corners.
#[wasm_bindgen(js_name = rectangleAreaKm2)]
pub fn rectangle_area_km2(corner_a: JsValue, corner_b: JsValue) -> Result<f64, JsValue> {
    console_error_panic_hook::set_once();

    let a: LatLng = from_js(corner_a)?;
    let b: LatLng = from_js(corner_b)?;
    Ok(geometry::rectangle_area_km2(a, b))
}

/// `{ west, south, east, north }` of the rectangle spanned by two corners.
#[wasm_bindgen(js_name = cornersToBounds)]
pub fn corners_to_bounds(corner_a: JsValue, corner_b: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let a: LatLng = from_js(corner_a)?;
    let b: LatLng = from_js(corner_b)?;
    to_js(&SearchBounds::from_corners(a, b))
}

/// GeoJSON Polygon feature for `{ west, south, east, north }` bounds.
#[wasm_bindgen(js_name = boundsToGeoJson)]
pub fn bounds_to_geojson(bounds: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let bounds: SearchBounds = from_js(bounds)?;
    to_js(&geometry::bounds_to_polygon(&bounds))
}

#[wasm_bindgen(js_name = latLngToWkt)]
pub fn lat_lng_to_wkt(lat_lng: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let point: LatLng = from_js(lat_lng)?;
    Ok(geometry::point_to_wkt(point))
}

/// GeoJSON LineString feature for an array of `{lat, lng}`.
#[wasm_bindgen(js_name = polylineToGeoJson)]
pub fn polyline_to_geojson(lat_lngs: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let path: Vec<LatLng> = from_js(lat_lngs)?;
    to_js(&geometry::path_to_line_string(&path))
}

#[wasm_bindgen(js_name = formatFileSize)]
pub fn format_file_size(bytes: f64) -> String {
    format::format_file_size(bytes.max(0.0) as u64)
}

#[wasm_bindgen(js_name = formatDistance)]
pub fn format_distance(meters: f64) -> String {
    format::format_distance(meters)
}

#[wasm_bindgen(js_name = formatElevation)]
pub fn format_elevation(meters: f64) -> String {
    format::format_elevation(meters)
}

/// Route `tracing` output to the browser console. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = enableLogging)]
pub fn enable_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(tracing_wasm::set_as_global_default);
}

fn parse_options(options: JsValue) -> Result<MinifyOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(MinifyOptions::default())
    } else {
        from_js(options)
    }
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Serialize with plain objects for maps, so GeoJSON properties and the
/// flattened analysis reach JS as objects rather than `Map`s.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
