use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesRef, BytesStart, BytesText, Event};

use crate::error::{GpxMinError, Result};
use crate::gpx_types::*;

/// Parse a GPX XML string into a TrackDocument.
///
/// Only `<trk>` content is kept: track names, segments, and the coordinates and
/// elevation of each `<trkpt>`. Points without a usable lat/lon are counted in
/// `skipped_points` and otherwise ignored. Anything that is not well-formed XML
/// with a `<gpx>` root fails with `MalformedInput`.
pub fn parse_gpx(xml: &str) -> Result<TrackDocument> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);

    let doc = loop {
        match next_event(&mut reader)? {
            Event::Start(e) => {
                expect_root(&e)?;
                break parse_root(&mut reader)?;
            }
            Event::Empty(e) => {
                expect_root(&e)?;
                break TrackDocument::default();
            }
            Event::Text(e) if !is_blank(&e) => {
                return Err(GpxMinError::malformed("text before the root element"));
            }
            Event::GeneralRef(_) => {
                return Err(GpxMinError::malformed("text before the root element"));
            }
            Event::Eof => {
                return Err(GpxMinError::malformed("document has no root element"));
            }
            _ => {}
        }
    };

    // Only whitespace, comments and processing instructions may follow the root.
    loop {
        match next_event(&mut reader)? {
            Event::Start(_) | Event::Empty(_) | Event::GeneralRef(_) => {
                return Err(GpxMinError::malformed("content after the root element"));
            }
            Event::Text(e) if !is_blank(&e) => {
                return Err(GpxMinError::malformed("content after the root element"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if doc.skipped_points > 0 {
        tracing::warn!(
            "Skipped {} track points without valid coordinates",
            doc.skipped_points
        );
    }
    tracing::debug!(
        "Parsed GPX: {} tracks, {} points",
        doc.tracks.len(),
        doc.point_count()
    );

    Ok(doc)
}

/// Read the next event, also checking what quick-xml leaves to the caller:
/// attribute values and entity references.
fn next_event<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>> {
    let event = reader.read_event().map_err(|e| xml_error(reader, e))?;
    match &event {
        Event::Start(e) | Event::Empty(e) => check_attributes(e)?,
        Event::GeneralRef(e) => {
            resolve_entity(e)?;
        }
        _ => {}
    }
    Ok(event)
}

fn expect_root(e: &BytesStart<'_>) -> Result<()> {
    if e.local_name().as_ref() == b"gpx" {
        Ok(())
    } else {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        Err(GpxMinError::malformed(format!(
            "expected <gpx> root element, found <{name}>"
        )))
    }
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(|b| b.is_ascii_whitespace())
}

fn xml_error(reader: &Reader<&[u8]>, e: quick_xml::Error) -> GpxMinError {
    GpxMinError::malformed(format!(
        "error at position {}: {e}",
        reader.buffer_position()
    ))
}

fn unexpected_eof(element: &str) -> GpxMinError {
    GpxMinError::malformed(format!("unexpected end of document inside <{element}>"))
}

fn check_attributes(e: &BytesStart<'_>) -> Result<()> {
    for attr_result in e.attributes() {
        attribute_value(&attr_result?.value)?;
    }
    Ok(())
}

/// Decode an attribute value. A raw `<` or an unknown entity is a document error.
fn attribute_value(raw: &[u8]) -> Result<Cow<'_, str>> {
    if raw.contains(&b'<') {
        return Err(GpxMinError::malformed("'<' in attribute value"));
    }
    let value = std::str::from_utf8(raw).map_err(|e| GpxMinError::malformed(e.to_string()))?;
    unescape(value).map_err(|e| GpxMinError::malformed(e.to_string()))
}

/// Character for a character reference or one of the predefined XML entities.
fn resolve_entity(e: &BytesRef<'_>) -> Result<char> {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        return Ok(ch);
    }
    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
    match name {
        "amp" => Ok('&'),
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "quot" => Ok('"'),
        "apos" => Ok('\''),
        _ => Err(GpxMinError::malformed(format!("undefined entity &{name};"))),
    }
}

/// Skip an element we don't keep, including all of its children.
fn skip_element<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'a>) -> Result<()> {
    let mut depth = 0usize;

    loop {
        match next_event(reader)? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                return Err(unexpected_eof(&name));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Parse the children of <gpx>. Waypoints, routes and metadata are dropped.
fn parse_root<'a>(reader: &mut Reader<&'a [u8]>) -> Result<TrackDocument> {
    let mut doc = TrackDocument::default();

    loop {
        match next_event(reader)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trk" => {
                    let track = parse_track(reader, &mut doc.skipped_points)?;
                    doc.tracks.push(track);
                }
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                // Still counts towards "Track N" numbering.
                if e.local_name().as_ref() == b"trk" {
                    doc.tracks.push(Track::default());
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("gpx")),
            _ => {}
        }
    }

    Ok(doc)
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>, skipped: &mut usize) -> Result<Track> {
    let mut track = Track::default();

    loop {
        match next_event(reader)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => {
                    let name = read_text_owned(reader, &e)?;
                    let name = name.trim();
                    if track.name.is_none() && !name.is_empty() {
                        track.name = Some(name.to_string());
                    }
                }
                b"trkseg" => track.segments.push(parse_segment(reader, skipped)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkseg" {
                    track.segments.push(Segment::default());
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("trk")),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>, skipped: &mut usize) -> Result<Segment> {
    let mut segment = Segment::default();

    loop {
        match next_event(reader)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => match parse_point(&e, reader)? {
                    Some(pt) => segment.points.push(pt),
                    None => *skipped += 1,
                },
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    match parse_lat_lon(&e)? {
                        Some((lat, lon)) => segment.points.push(TrackPoint::new(lat, lon)),
                        None => *skipped += 1,
                    }
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("trkseg")),
            _ => {}
        }
    }

    Ok(segment)
}

/// Parse lat/lon attributes from a point element's start tag.
///
/// Returns `None` when either is missing or not a finite number. Broken
/// attribute syntax is a document error, not a point error.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<Option<(f64, f64)>> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = parse_number(&attribute_value(&attr.value)?),
            b"lon" => lon = parse_number(&attribute_value(&attr.value)?),
            _ => {}
        }
    }

    Ok(lat.zip(lon))
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a <trkpt> and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<TrackPoint>> {
    let Some((lat, lon)) = parse_lat_lon(start)? else {
        skip_element(reader, start)?;
        return Ok(None);
    };

    let mut point = TrackPoint::new(lat, lon);
    let mut seen_ele = false;

    loop {
        match next_event(reader)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    if !seen_ele {
                        point.ele = parse_number(&text);
                        seen_ele = true;
                    }
                }
                // time, extensions, hr, cadence, ...
                _ => skip_element(reader, &e)?,
            },
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof("trkpt")),
            _ => {}
        }
    }

    Ok(Some(point))
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match next_event(reader)? {
            Event::Text(e) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(raw);
            }
            Event::CData(e) => {
                let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(s);
            }
            Event::GeneralRef(e) => text.push(resolve_entity(&e)?),
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => {
                let name = String::from_utf8_lossy(&end_name).into_owned();
                return Err(unexpected_eof(&name));
            }
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Morning Run</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><ele>10.0</ele></trkpt>
      <trkpt lat="35.001" lon="139.001"><ele>11.0</ele></trkpt>
      <trkpt lat="35.002" lon="139.002"/>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks.len(), 1);
        assert_eq!(doc.tracks[0].name.as_deref(), Some("Morning Run"));
        let points = &doc.tracks[0].segments[0].points;
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], TrackPoint::new(35.0, 139.0).with_ele(10.0));
        assert_eq!(points[2].ele, None);
        assert_eq!(doc.skipped_points, 0);
    }

    #[test]
    fn test_metadata_waypoints_and_routes_ignored() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">
  <metadata><name>Export</name><time>2025-01-01T00:00:00Z</time></metadata>
  <wpt lat="35.6762" lon="139.6503"><name>Tokyo</name></wpt>
  <rte><rtept lat="35.0" lon="139.0"/></rte>
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><time>2025-01-01T00:00:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks.len(), 1);
        assert_eq!(doc.tracks[0].name, None);
        assert_eq!(doc.point_count(), 1);
    }

    #[test]
    fn test_extensions_skipped() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0">
        <ele>12.5</ele>
        <extensions>
          <gpxtpx:TrackPointExtension xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <gpxtpx:hr>150</gpxtpx:hr>
            <gpxtpx:ele>999</gpxtpx:ele>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        let points = &doc.tracks[0].segments[0].points;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].ele, Some(12.5));
    }

    #[test]
    fn test_invalid_points_skipped_and_counted() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
      <trkpt lon="139.5"><ele>5</ele></trkpt>
      <trkpt lat="abc" lon="139.5"/>
      <trkpt lat="NaN" lon="139.5"/>
      <trkpt lat="35.1" lon="139.1"/>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.point_count(), 2);
        assert_eq!(doc.skipped_points, 3);
    }

    #[test]
    fn test_unparsable_elevation_is_absent() {
        let xml = r#"<gpx><trk><trkseg>
  <trkpt lat="1" lon="2"><ele>high</ele></trkpt>
  <trkpt lat="1" lon="2"><ele> -12.5 </ele></trkpt>
</trkseg></trk></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        let points = &doc.tracks[0].segments[0].points;
        assert_eq!(points[0].ele, None);
        assert_eq!(points[1].ele, Some(-12.5));
    }

    #[test]
    fn test_empty_segments_and_tracks_kept() {
        let xml = r#"<gpx><trk/><trk><trkseg/><trkseg></trkseg></trk></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks.len(), 2);
        assert_eq!(doc.tracks[1].segments.len(), 2);
        assert!(doc.tracks.iter().all(Track::is_empty));
    }

    #[test]
    fn test_blank_name_ignored() {
        let xml = r#"<gpx><trk><name>   </name><trkseg/></trk></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks[0].name, None);
    }

    #[test]
    fn test_name_entities_and_cdata() {
        let xml = r#"<gpx><trk><name>Caf&#233; &amp; <![CDATA[<Bar>]]></name></trk></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks[0].name.as_deref(), Some("Café & <Bar>"));
    }

    #[test]
    fn test_empty_root() {
        let doc = parse_gpx(r#"<?xml version="1.0"?><gpx version="1.1"/>"#).unwrap();
        assert!(doc.tracks.is_empty());
    }

    #[test]
    fn test_byte_order_mark() {
        let doc = parse_gpx("\u{feff}<gpx></gpx>").unwrap();
        assert!(doc.tracks.is_empty());
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = parse_gpx("").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let err = parse_gpx(r#"<kml><Document/></kml>"#).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("<kml>"));
    }

    #[test]
    fn test_plain_text_is_malformed() {
        assert!(parse_gpx("not a gpx file").unwrap_err().is_malformed());
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let xml = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"><ele>3</ele>"#;
        assert!(parse_gpx(xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_mismatched_end_tag_is_malformed() {
        let xml = r#"<gpx><trk><trkseg></trk></trkseg></gpx>"#;
        assert!(parse_gpx(xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_second_root_is_malformed() {
        let xml = r#"<gpx></gpx><gpx></gpx>"#;
        assert!(parse_gpx(xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_gpx10_elements_ignored() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/0" version="1.0">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0">
        <speed>5.5</speed>
        <course>180.0</course>
      </trkpt>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks[0].segments[0].points.len(), 2);
    }

    #[test]
    fn test_undefined_entity_is_malformed() {
        let xml = r#"<gpx><trk><name>x&foo;y</name></trk></gpx>"#;
        let err = parse_gpx(xml).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("&foo;"));
    }

    #[test]
    fn test_undefined_entity_in_skipped_element_is_malformed() {
        let xml = r#"<gpx><metadata><desc>a &nbsp; b</desc></metadata></gpx>"#;
        assert!(parse_gpx(xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_lt_in_attribute_is_malformed() {
        let xml = r#"<gpx><trk><trkseg><trkpt lat="1<" lon="2"/></trkseg></trk></gpx>"#;
        assert!(parse_gpx(xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_escaped_attribute_values() {
        let xml = r#"<gpx creator="A &amp; B"><trk><trkseg>
            <trkpt lat="&#49;.5" lon="2"/>
            <trkpt lat="1" lon="2" note="&bogus;"/>
        </trkseg></trk></gpx>"#;
        assert!(parse_gpx(xml).unwrap_err().is_malformed());

        let xml = r#"<gpx creator="A &amp; B"><trk><trkseg>
            <trkpt lat="&#49;.5" lon="2"/>
        </trkseg></trk></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks[0].segments[0].points[0], TrackPoint::new(1.5, 2.0));
    }
}
