//! Write fetched altitudes back onto trackpoint nodes.

use std::collections::HashMap;

use tracing::debug;

use trackalt_markup::{Document, FieldKind};
use trackalt_shared::{AltitudeKey, AltitudeResult, InjectionMode};

use crate::trackpoints::TrackpointRef;

/// Field that holds the altitude, as attribute or child element.
pub const ELEVATION_FIELD: &str = "ele";

/// Merge `altitudes` into the document by token key and return how many
/// nodes received a value.
///
/// `altitudes[i]` belongs to `points[i]`. Points are matched through their
/// [`AltitudeKey`], so equal tokens share one altitude (the last one wins).
/// A key with no altitude is skipped. `None` removes any existing `ele` field.
/// Running this twice with the same input gives the same document.
pub fn inject(
    doc: &mut Document,
    points: &[TrackpointRef],
    altitudes: &[AltitudeResult],
    mode: InjectionMode,
) -> usize {
    let by_key: HashMap<AltitudeKey, AltitudeResult> = points
        .iter()
        .zip(altitudes)
        .map(|(point, altitude)| (point.key(), *altitude))
        .collect();

    let kind = match mode {
        InjectionMode::Attribute => FieldKind::Attribute,
        InjectionMode::Element => FieldKind::Child,
    };

    let mut updated = 0;
    let mut cleared = 0;
    let mut unmatched = 0;

    for point in points {
        let Some(altitude) = by_key.get(&point.key()) else {
            unmatched += 1;
            continue;
        };

        match altitude {
            Some(meters) => {
                if doc.set_scalar_field(point.node, ELEVATION_FIELD, kind, format_altitude(*meters)) {
                    updated += 1;
                }
            }
            None => {
                if doc.remove_field(point.node, ELEVATION_FIELD) {
                    cleared += 1;
                }
            }
        }
    }

    debug!(updated, cleared, unmatched, %mode, "altitudes injected");
    updated
}

/// `523.5` → `"523.5"`, `100.0` → `"100"`, never `"-0"`.
fn format_altitude(meters: f64) -> String {
    if meters == 0.0 {
        return "0".to_string();
    }
    format!("{meters}")
}
