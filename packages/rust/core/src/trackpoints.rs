//! Trackpoint collection: find every element carrying usable `lat`/`lon`.

use tracing::debug;

use trackalt_markup::{Document, MarkupNode, NodeId};
use trackalt_shared::{AltitudeKey, Coordinate, Result, TrackAltError};

/// Field names that mark a coordinate-bearing element.
const LAT_FIELD: &str = "lat";
const LON_FIELD: &str = "lon";

/// Handle to a coordinate-bearing element plus its original and parsed values.
///
/// Valid only for the [`Document`] it was collected from, within one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackpointRef {
    pub node: NodeId,
    pub lat_token: String,
    pub lon_token: String,
    pub lat: f64,
    pub lon: f64,
}

impl TrackpointRef {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    pub fn key(&self) -> AltitudeKey {
        AltitudeKey::new(&self.lat_token, &self.lon_token)
    }
}

/// Collect trackpoints in document order (pre-order traversal).
///
/// Elements whose `lat` or `lon` is missing, non-scalar, or not a finite
/// number are skipped silently. Fails with [`TrackAltError::NoTrackpoints`]
/// when nothing qualifies.
pub fn collect(doc: &Document) -> Result<Vec<TrackpointRef>> {
    let mut points = Vec::new();
    let mut skipped = 0usize;
    let mut stack = vec![doc.root()];

    while let Some(id) = stack.pop() {
        match doc.node(id) {
            MarkupNode::Element(el) => {
                match trackpoint(doc, id) {
                    Some(Ok(point)) => points.push(point),
                    Some(Err(())) => skipped += 1,
                    None => {}
                }
                // Reversed so the first child is visited next.
                stack.extend(el.fields().iter().rev().map(|f| f.node));
            }
            MarkupNode::Group(members) => stack.extend(members.iter().rev().copied()),
            MarkupNode::Scalar(_) => {}
        }
    }

    debug!(collected = points.len(), skipped, "trackpoint collection complete");

    if points.is_empty() {
        return Err(TrackAltError::NoTrackpoints);
    }
    Ok(points)
}

/// `None` if the element has no lat/lon pair, `Some(Err(()))` if the pair is unusable.
fn trackpoint(doc: &Document, id: NodeId) -> Option<std::result::Result<TrackpointRef, ()>> {
    let lat_token = doc.field_value(id, LAT_FIELD)?;
    let lon_token = doc.field_value(id, LON_FIELD)?;

    let parsed = parse_finite(lat_token).zip(parse_finite(lon_token));
    Some(match parsed {
        Some((lat, lon)) => Ok(TrackpointRef {
            node: id,
            lat_token: lat_token.to_string(),
            lon_token: lon_token.to_string(),
            lat,
            lon,
        }),
        None => Err(()),
    })
}

fn parse_finite(token: &str) -> Option<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackalt_markup::parse;

    fn tokens(points: &[TrackpointRef]) -> Vec<(&str, &str)> {
        points
            .iter()
            .map(|p| (p.lat_token.as_str(), p.lon_token.as_str()))
            .collect()
    }

    #[test]
    fn collects_in_document_order() {
        let doc = parse(
            r#"<gpx>
                <wpt lat="1" lon="1"/>
                <trk>
                  <trkseg>
                    <trkpt lat="2" lon="2"/>
                    <trkpt lat="3" lon="3"/>
                  </trkseg>
                  <trkseg>
                    <trkpt lat="4" lon="4"/>
                  </trkseg>
                </trk>
                <rte><rtept lat="5" lon="5"/></rte>
              </gpx>"#,
        )
        .unwrap();

        let points = collect(&doc).unwrap();
        let lats: Vec<f64> = points.iter().map(|p| p.lat).collect();
        assert_eq!(lats, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn keeps_original_tokens() {
        let doc = parse(r#"<gpx><trkpt lat="48.1000" lon=" 11.50"/></gpx>"#).unwrap();
        let points = collect(&doc).unwrap();
        assert_eq!(tokens(&points), [("48.1000", " 11.50")]);
        assert_eq!(points[0].coordinate(), Coordinate::new(48.1, 11.5));
    }

    #[test]
    fn skips_malformed_coordinates() {
        let doc = parse(
            r#"<gpx>
                <trkpt lat="abc" lon="1"/>
                <trkpt lat="1"/>
                <trkpt lat="NaN" lon="1"/>
                <trkpt lat="inf" lon="1"/>
                <trkpt lat="" lon="1"/>
                <trkpt lat="10.5" lon="20.5"/>
              </gpx>"#,
        )
        .unwrap();

        let points = collect(&doc).unwrap();
        assert_eq!(tokens(&points), [("10.5", "20.5")]);
    }

    #[test]
    fn accepts_child_element_coordinates() {
        let doc = parse("<gpx><pt><lat>1.5</lat><lon>2.5</lon></pt></gpx>").unwrap();
        let points = collect(&doc).unwrap();
        assert_eq!(tokens(&points), [("1.5", "2.5")]);
    }

    #[test]
    fn nested_coordinate_nodes_are_preorder() {
        let doc = parse(r#"<gpx lat="0" lon="0"><inner lat="1" lon="1"/></gpx>"#).unwrap();
        let points = collect(&doc).unwrap();
        assert_eq!(points[0].node, doc.root());
        assert_eq!(points[1].lat, 1.0);
    }

    #[test]
    fn interleaved_siblings_are_collected_by_group() {
        // Same-named siblings share one field, so the later <wpt> is visited
        // with the first one, ahead of <trk>.
        let doc = parse(
            r#"<gpx><wpt lat="1" lon="1"/><trk><trkpt lat="2" lon="2"/></trk><wpt lat="3" lon="3"/></gpx>"#,
        )
        .unwrap();
        let points = collect(&doc).unwrap();
        assert_eq!(tokens(&points), [("1", "1"), ("3", "3"), ("2", "2")]);
    }

    #[test]
    fn empty_track_is_an_error() {
        let doc = parse(r#"<gpx><trk><name>empty</name></trk></gpx>"#).unwrap();
        assert!(matches!(collect(&doc), Err(TrackAltError::NoTrackpoints)));
    }

    #[test]
    fn only_malformed_is_an_error() {
        let doc = parse(r#"<gpx><trkpt lat="x" lon="y"/></gpx>"#).unwrap();
        assert!(matches!(collect(&doc), Err(TrackAltError::NoTrackpoints)));
    }
}
