//! End-to-end `enrich` pipeline: read → parse → collect → fetch → inject → write.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use trackalt_elevation::ElevationClient;
use trackalt_markup::{parse, serialize};
use trackalt_shared::{FetchConfig, InjectionMode, Result, TrackAltError};

use crate::inject::inject;
use crate::output::{
    POINTS_EXTENSION, TRACK_EXTENSION, build_points_report, derive_output_path,
    render_points_report, write_all_or_nothing,
};
use crate::trackpoints::collect;

/// Configuration for the `enrich` pipeline.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Track file to read.
    pub input: PathBuf,
    /// Rewritten track destination (defaults to `<stem><suffix>.gpx` beside the input).
    pub output: Option<PathBuf>,
    /// Points report destination (defaults to `<stem><suffix>.json` beside the input).
    pub points_output: Option<PathBuf>,
    /// Do not write the points report.
    pub skip_points: bool,
    pub mode: InjectionMode,
    /// File name suffix for derived output paths.
    pub suffix: String,
    /// Elevation lookup settings, credential included.
    pub fetch: FetchConfig,
    /// Tool version string recorded in the points report.
    pub tool_version: String,
}

impl EnrichConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.input, &self.suffix, TRACK_EXTENSION))
    }

    /// `None` when the report is skipped.
    pub fn points_path(&self) -> Option<PathBuf> {
        if self.skip_points {
            return None;
        }
        Some(
            self.points_output
                .clone()
                .unwrap_or_else(|| derive_output_path(&self.input, &self.suffix, POINTS_EXTENSION)),
        )
    }
}

/// Result of the `enrich` pipeline.
#[derive(Debug)]
pub struct EnrichResult {
    /// Where the rewritten track was written.
    pub output_path: PathBuf,
    /// Where the points report was written, if it was.
    pub points_path: Option<PathBuf>,
    /// Trackpoints collected from the document.
    pub points_total: usize,
    /// Nodes that received an altitude.
    pub nodes_updated: usize,
    /// Points the service had no altitude for.
    pub missing_elevations: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &EnrichResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &EnrichResult) {}
}

/// Run the full `enrich` pipeline.
///
/// 1. Build the lookup client (rejects bad settings before any I/O)
/// 2. Read and parse the track
/// 3. Collect trackpoints
/// 4. Fetch altitudes batch by batch
/// 5. Inject altitudes and render the document
/// 6. Write the rewritten track and the points report
///
/// Nothing is written unless every earlier step succeeded, and a failed
/// write leaves neither file behind.
#[instrument(skip_all, fields(input = %config.input.display(), mode = %config.mode))]
pub async fn enrich(config: &EnrichConfig, progress: &dyn ProgressReporter) -> Result<EnrichResult> {
    let start = Instant::now();
    let client = ElevationClient::new(config.fetch.clone())?;

    info!(input = %config.input.display(), "starting enrich pipeline");

    // --- Phase 1: Parse ---
    progress.phase("Parsing track");
    let source = read_source(&config.input)?;
    let mut doc = parse(&source)?;

    // --- Phase 2: Collect ---
    progress.phase("Collecting trackpoints");
    let points = collect(&doc)?;
    info!(count = points.len(), "trackpoints collected");

    // --- Phase 3: Fetch ---
    progress.phase("Fetching elevations");
    let coordinates: Vec<_> = points.iter().map(|p| p.coordinate()).collect();
    let altitudes = client.fetch_all(&coordinates).await?;
    let missing_elevations = altitudes.iter().filter(|a| a.is_none()).count();

    // --- Phase 4: Inject ---
    progress.phase("Writing elevations");
    let nodes_updated = inject(&mut doc, &points, &altitudes, config.mode);
    let rendered = serialize(&doc)?;

    let points_path = config.points_path();
    let report = match &points_path {
        Some(_) => {
            let report = build_points_report(&config.input, &config.tool_version, &points, &altitudes);
            Some(render_points_report(&report)?)
        }
        None => None,
    };

    // --- Phase 5: Write ---
    progress.phase("Saving output");
    let output_path = config.output_path();
    let mut files = vec![(output_path.as_path(), rendered.as_str())];
    if let (Some(path), Some(json)) = (&points_path, &report) {
        files.push((path.as_path(), json.as_str()));
    }
    write_all_or_nothing(&files)?;

    let result = EnrichResult {
        output_path,
        points_path,
        points_total: points.len(),
        nodes_updated,
        missing_elevations,
        elapsed: start.elapsed(),
    };

    info!(
        output = %result.output_path.display(),
        points = result.points_total,
        updated = result.nodes_updated,
        missing = result.missing_elevations,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "enrich pipeline complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Read the source as UTF-8; undecodable bytes are a parse failure.
fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => {
            TrackAltError::parse(format!("{} is not valid UTF-8", path.display()))
        }
        _ => TrackAltError::io(path, e),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
