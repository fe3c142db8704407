use serde::Serialize;

use crate::analyzer::analyze;
use crate::error::Result;
use crate::gpx_types::AnalysisResult;
use crate::options::MinifyOptions;
use crate::parser::parse_gpx;
use crate::writer::write_gpx;

/// Reduced GPX document plus the metrics of the input.
#[derive(Debug, Clone)]
pub struct MinifiedGpx {
    pub content: String,
    pub analysis: AnalysisResult,
}

impl MinifiedGpx {
    pub fn into_report(self, original_size: usize) -> GpxReport {
        let sizes = SizeReport::new(original_size, self.content.len());
        GpxReport {
            minified_content: self.content,
            analysis: GpxAnalysis {
                analysis: self.analysis,
                sizes,
            },
        }
    }
}

/// Byte sizes before and after minification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReport {
    pub original_size: usize,
    pub minified_size: usize,
    pub reduction_percent: f64,
}

impl SizeReport {
    pub fn new(original_size: usize, minified_size: usize) -> Self {
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            (original_size as f64 - minified_size as f64) / original_size as f64 * 100.0
        };
        Self {
            original_size,
            minified_size,
            reduction_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GpxAnalysis {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    #[serde(flatten)]
    pub sizes: SizeReport,
}

/// What the upload form gets back: the file to send and what to show.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxReport {
    pub minified_content: String,
    pub analysis: GpxAnalysis,
}

/// Parse a GPX document, analyze it and rebuild it with only the data route
/// comparison needs.
pub fn minify_gpx(xml: &str, opts: &MinifyOptions) -> Result<MinifiedGpx> {
    tracing::debug!("Minifying GPX content: {} bytes", xml.len());

    let doc = parse_gpx(xml)?;
    let analysis = analyze(&doc);
    let content = write_gpx(&doc, opts)?;

    tracing::info!(
        "GPX minified: {} bytes -> {} bytes, {} points preserved, {} skipped",
        xml.len(),
        content.len(),
        analysis.point_count,
        analysis.skipped_points
    );

    Ok(MinifiedGpx { content, analysis })
}

/// Analyze a GPX document without building the reduced output.
pub fn analyze_gpx(xml: &str) -> Result<AnalysisResult> {
    let doc = parse_gpx(xml)?;
    Ok(analyze(&doc))
}

const DROPPED_ELEMENTS: &[&str] = &["time", "extensions", "hr", "cad", "cadence", "speed"];

/// Rough bytes per element removed by minification.
const BYTES_PER_DROPPED_ELEMENT: usize = 50;

/// Estimate the fraction (0..=1) of `xml` that minification would remove,
/// without parsing it.
pub fn estimate_reduction(xml: &str) -> f64 {
    if xml.is_empty() {
        return 0.0;
    }

    let dropped = xml
        .match_indices("</")
        .filter_map(|(idx, _)| {
            let rest = &xml[idx + 2..];
            let tag = &rest[..rest.find('>')?];
            let local = tag.rsplit(':').next().unwrap_or(tag).trim();
            Some(local)
        })
        .filter(|local| DROPPED_ELEMENTS.contains(local))
        .count();

    let estimate = (dropped * BYTES_PER_DROPPED_ELEMENT) as f64 / xml.len() as f64;
    tracing::debug!(
        "Estimated reduction: {:.1}% ({} removable elements)",
        estimate * 100.0,
        dropped
    );

    estimate.min(1.0)
}
