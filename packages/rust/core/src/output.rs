//! Output naming, points report rendering and all-or-nothing file writes.

use std::path::{Path, PathBuf};

use tracing::debug;

use trackalt_shared::{AltitudeResult, PointRecord, PointsReport, Result, TrackAltError};

use crate::trackpoints::TrackpointRef;

/// Extension of the rewritten track file.
pub const TRACK_EXTENSION: &str = "gpx";

/// Extension of the points report.
pub const POINTS_EXTENSION: &str = "json";

/// `<dir>/<stem><suffix>.<extension>` next to `input`.
///
/// `track.gpx` with suffix `_ele` and extension `gpx` becomes `track_ele.gpx`.
pub fn derive_output_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());
    input.with_file_name(format!("{stem}{suffix}.{extension}"))
}

/// Pair each point with its altitude, in document order.
pub fn build_points_report(
    source: &Path,
    tool_version: &str,
    points: &[TrackpointRef],
    altitudes: &[AltitudeResult],
) -> PointsReport {
    let records = points
        .iter()
        .zip(altitudes)
        .map(|(point, ele)| PointRecord {
            lat: point.lat,
            lon: point.lon,
            ele: *ele,
        })
        .collect();

    let source = source
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    PointsReport::new(source, tool_version, records)
}

/// Render the report as pretty JSON with a trailing newline.
pub fn render_points_report(report: &PointsReport) -> Result<String> {
    let mut json = serde_json::to_string_pretty(report)
        .map_err(|e| TrackAltError::Serialize(format!("points report: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Contents written to a sibling temp file, waiting to be renamed into place.
///
/// Dropping a staged file without committing it removes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Write `contents` next to `target`. Missing parent directories are created.
    pub fn write(target: &Path, contents: &str) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| TrackAltError::io(&dir, e))?;

        let filename = target
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                TrackAltError::config(format!("output path has no file name: {}", target.display()))
            })?;

        let staged = Self {
            temp: dir.join(format!(".{filename}.{}.tmp", uuid::Uuid::now_v7())),
            target: target.to_path_buf(),
            committed: false,
        };
        std::fs::write(&staged.temp, contents).map_err(|e| TrackAltError::io(&staged.temp, e))?;
        Ok(staged)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target.
    pub fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.temp, &self.target).map_err(|e| TrackAltError::io(&self.target, e))?;
        self.committed = true;
        debug!(path = %self.target.display(), "wrote file");
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp);
        }
    }
}

/// Write every `(path, contents)` pair through sibling temp files and
/// renames, or none of them.
///
/// All files are staged before any is renamed. If a rename fails, targets
/// already renamed in this call are removed again.
pub fn write_all_or_nothing(files: &[(&Path, &str)]) -> Result<()> {
    let staged = files
        .iter()
        .map(|(path, contents)| StagedFile::write(path, contents))
        .collect::<Result<Vec<_>>>()?;

    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for file in staged {
        let target = file.target().to_path_buf();
        if let Err(e) = file.commit() {
            for path in &committed {
                let _ = std::fs::remove_file(path);
            }
            return Err(e);
        }
        committed.push(target);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use trackalt_markup::parse;

    use crate::trackpoints::collect;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trackalt-output-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn derives_sibling_paths() {
        let input = Path::new("/data/rides/morning.gpx");
        assert_eq!(
            derive_output_path(input, "_ele", TRACK_EXTENSION),
            PathBuf::from("/data/rides/morning_ele.gpx")
        );
        assert_eq!(
            derive_output_path(input, "_ele", POINTS_EXTENSION),
            PathBuf::from("/data/rides/morning_ele.json")
        );
    }

    #[test]
    fn derives_path_for_relative_input_without_extension() {
        assert_eq!(
            derive_output_path(Path::new("ride"), "_x", "gpx"),
            PathBuf::from("ride_x.gpx")
        );
    }

    #[test]
    fn report_keeps_order_and_nulls() {
        let doc = parse(r#"<gpx><trkpt lat="1.5" lon="2.5"/><trkpt lat="3" lon="4"/></gpx>"#).unwrap();
        let points = collect(&doc).unwrap();

        let report = build_points_report(Path::new("/tmp/in.gpx"), "0.1.0", &points, &[Some(12.5), None]);

        assert_eq!(report.source, "in.gpx");
        assert_eq!(report.points.len(), 2);
        assert_eq!(report.points[0], PointRecord { lat: 1.5, lon: 2.5, ele: Some(12.5) });
        assert_eq!(report.points[1].ele, None);

        let json = render_points_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["points"][1]["ele"], serde_json::Value::Null);
        assert_eq!(value["schema_version"], 1);
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn write_creates_parents_and_replaces() {
        let tmp = temp_dir();
        let target = tmp.join("nested").join("out.gpx");

        write_all_or_nothing(&[(target.as_path(), "first")]).unwrap();
        write_all_or_nothing(&[(target.as_path(), "second")]).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let tmp = temp_dir();
        // Renaming a file over a non-empty directory fails.
        let target = tmp.join("occupied");
        std::fs::create_dir_all(target.join("inner")).unwrap();

        assert!(matches!(
            write_all_or_nothing(&[(target.as_path(), "x")]),
            Err(TrackAltError::Io { .. })
        ));
        let temps = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(temps, 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_all_or_nothing_rolls_back_earlier_targets() {
        let tmp = temp_dir();
        let first = tmp.join("out.gpx");
        let second = tmp.join("out.json");
        std::fs::create_dir_all(second.join("inner")).unwrap();

        let result = write_all_or_nothing(&[(first.as_path(), "track"), (second.as_path(), "{}")]);

        assert!(matches!(result, Err(TrackAltError::Io { .. })));
        assert!(!first.exists());
        let temps = std::fs::read_dir(&tmp)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(temps, 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_all_or_nothing_writes_every_file() {
        let tmp = temp_dir();
        let first = tmp.join("a.gpx");
        let second = tmp.join("b").join("a.json");

        write_all_or_nothing(&[(first.as_path(), "track"), (second.as_path(), "{}")]).unwrap();

        assert_eq!(std::fs::read_to_string(&first).unwrap(), "track");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "{}");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
