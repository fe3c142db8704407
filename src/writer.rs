use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;
use crate::gpx_types::*;
use crate::options::MinifyOptions;

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// Serialize the reduced form of a document: track names, segments and points
/// with lat/lon (and ele, if enabled) only.
///
/// Empty segments and empty tracks are left out. Tracks without a name are
/// called "Track N", N being the 1-based position of the track in the input.
pub fn write_gpx(doc: &TrackDocument, opts: &MinifyOptions) -> Result<String> {
    let mut writer = match opts.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    if opts.indent.is_none() {
        writer.get_mut().push(b'\n');
    }

    let mut root = BytesStart::new("gpx");
    root.push_attribute(("xmlns", GPX_NAMESPACE));
    root.push_attribute(("version", "1.1"));
    root.push_attribute(("creator", opts.creator.as_str()));
    writer.write_event(Event::Start(root))?;

    for (idx, track) in doc.tracks.iter().enumerate() {
        if !track.is_empty() {
            write_track(&mut writer, track, idx, opts)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("gpx")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

fn write_track(
    writer: &mut Writer<Vec<u8>>,
    track: &Track,
    idx: usize,
    opts: &MinifyOptions,
) -> io::Result<()> {
    let name = match &track.name {
        Some(name) => name.clone(),
        None => format!("Track {}", idx + 1),
    };

    writer.write_event(Event::Start(BytesStart::new("trk")))?;
    write_text_element(writer, "name", &name)?;

    for segment in track.segments.iter().filter(|s| !s.points.is_empty()) {
        writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
        for pt in &segment.points {
            write_point(writer, pt, opts.include_elevation)?;
        }
        writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("trk")))
}

fn write_point(
    writer: &mut Writer<Vec<u8>>,
    pt: &TrackPoint,
    include_elevation: bool,
) -> io::Result<()> {
    let mut start = BytesStart::new("trkpt");
    start.push_attribute(("lat", pt.lat.to_string().as_str()));
    start.push_attribute(("lon", pt.lon.to_string().as_str()));

    match (include_elevation, pt.ele) {
        (true, Some(ele)) => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "ele", &ele.to_string())?;
            writer.write_event(Event::End(BytesEnd::new("trkpt")))
        }
        _ => writer.write_event(Event::Empty(start)),
    }
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}
