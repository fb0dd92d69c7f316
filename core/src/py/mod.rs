// Python-binding (kun med `--features python`). Tynt lag over kjernen:
// inn/ut er JSON-strenger, feil blir ValueError.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::filter::MessageFilter;
use crate::project::{project, ProjectOptions};
use crate::reduce::reduce_json;
use crate::source::{from_str_dump, DecodeOptions};

/// Projiserer en frame-dump. `filter` er navn eller nummer som strenger.
/// En dekodefeil gir avkortet liste + advarsel i loggen, ikke exception.
#[pyfunction]
#[pyo3(signature = (dump, filter = None, nodef = true))]
fn project_frames_json(dump: &str, filter: Option<Vec<String>>, nodef: bool) -> PyResult<String> {
    let options = ProjectOptions {
        filter: filter
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect::<MessageFilter>(),
        suppress_definitions: nodef,
    };
    let projection = project(from_str_dump(dump, DecodeOptions::default()), &options);
    projection
        .to_json()
        .map_err(|e| PyValueError::new_err(format!("serialize error: {e}")))
}

#[pyfunction]
fn compute_activity_json(projected: &str, uuid: &str, converter: &str) -> PyResult<String> {
    let summary =
        reduce_json(projected, uuid, converter).map_err(|e| PyValueError::new_err(e.to_string()))?;
    summary
        .to_json()
        .map_err(|e| PyValueError::new_err(format!("serialize error: {e}")))
}

#[pymodule]
fn fitconvert_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(project_frames_json, m)?)?;
    m.add_function(wrap_pyfunction!(compute_activity_json, m)?)?;
    Ok(())
}
