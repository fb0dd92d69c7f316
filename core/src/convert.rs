use log::info;

use crate::error::{ConvertError, DecodeError};
use crate::frame::Frame;
use crate::metrics;
use crate::project::{project, Diagnostic, ProjectOptions};
use crate::reduce::{reduce, ActivitySummary};

#[derive(Debug, Clone)]
pub struct ConvertRequest<'a> {
    pub activity_id: &'a str,
    pub converter: &'a str,
    pub project: ProjectOptions,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub summary: ActivitySummary,
    /// Satt når frame-strømmen ble avkortet av en dekodefeil.
    pub diagnostic: Option<Diagnostic>,
    pub frames_projected: usize,
}

/// Full konvertering: projeksjon og reduksjon i ett.
pub fn convert<I>(frames: I, request: &ConvertRequest<'_>) -> Result<Conversion, ConvertError>
where
    I: IntoIterator<Item = Result<Frame, DecodeError>>,
{
    if request.activity_id.trim().is_empty() {
        return Err(ConvertError::InvalidActivityId(request.activity_id.to_string()));
    }

    let projection = project(frames, &request.project);
    let summary = reduce(&projection.frames, request.activity_id, request.converter)?;

    metrics::global().conversions_total.inc();
    info!(
        "activity {} converted: {} frames, {} records{}",
        summary.uuid,
        projection.frames.len(),
        summary.records.len(),
        if projection.is_truncated() { " (truncated)" } else { "" }
    );

    Ok(Conversion {
        frames_projected: projection.frames.len(),
        diagnostic: projection.diagnostic,
        summary,
    })
}
