//! Python bindings.
//!
//! Requests and results cross the boundary as JSON strings using the same
//! serde shapes as the Rust API, so the host never mirrors engine types.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::{DateTime, Utc};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::baseline::{compare, Baseline};
use crate::calendar::WorkingCalendar;
use crate::config::EngineConfig;
use crate::conflicts::{find_conflicts, Assignment, Interval};
use crate::engine::{ProjectRequest, ScheduleEngine};
use crate::gantt::GanttResponse;
use crate::logging::init_logging;
use crate::models::Schedule;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse<T: serde::de::DeserializeOwned>(json: &str) -> PyResult<T> {
    serde_json::from_str(json).map_err(value_error)
}

fn dump<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(value_error)
}

fn make_engine(config_json: Option<&str>) -> PyResult<ScheduleEngine> {
    let config: EngineConfig = match config_json {
        Some(json) => parse(json)?,
        None => EngineConfig::default(),
    };
    ScheduleEngine::new(config).map_err(value_error)
}

/// Plan one project.
///
/// # Arguments
/// * `request_json` - A ProjectRequest as JSON
/// * `config_json` - Optional EngineConfig as JSON
///
/// # Returns
/// * ProjectPlan as JSON
///
/// # Raises
/// * ValueError on malformed input, structural/cycle errors, infeasible
///   constraints or an exhausted calendar
#[pyfunction]
#[pyo3(signature = (request_json, config_json=None))]
fn plan_project(py: Python<'_>, request_json: &str, config_json: Option<&str>) -> PyResult<String> {
    let engine = make_engine(config_json)?;
    let request: ProjectRequest = parse(request_json)?;
    let plan = py
        .allow_threads(|| engine.plan(&request))
        .map_err(value_error)?;
    dump(&plan)
}

/// Plan one project and return the Gantt chart response shape.
#[pyfunction]
#[pyo3(signature = (request_json, config_json=None))]
fn plan_gantt(py: Python<'_>, request_json: &str, config_json: Option<&str>) -> PyResult<String> {
    let engine = make_engine(config_json)?;
    let request: ProjectRequest = parse(request_json)?;
    let plan = py
        .allow_threads(|| engine.plan(&request))
        .map_err(value_error)?;
    dump(&GanttResponse::from_plan(&request, &plan))
}

/// Plan several independent projects in parallel.
///
/// # Returns
/// * List with one entry per request, in order: a ProjectPlan JSON string,
///   or None when that project failed (see the matching error message)
/// * List of error messages (None for successful projects)
#[pyfunction]
#[pyo3(signature = (requests_json, config_json=None))]
fn plan_projects(
    py: Python<'_>,
    requests_json: &str,
    config_json: Option<&str>,
) -> PyResult<(Vec<Option<String>>, Vec<Option<String>>)> {
    let engine = make_engine(config_json)?;
    let requests: Vec<ProjectRequest> = parse(requests_json)?;
    let results = py.allow_threads(|| engine.plan_projects(&requests));

    let mut plans = Vec::with_capacity(results.len());
    let mut errors = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(plan) => {
                plans.push(Some(dump(&plan)?));
                errors.push(None);
            }
            Err(e) => {
                plans.push(None);
                errors.push(Some(e.to_string()));
            }
        }
    }
    Ok((plans, errors))
}

/// Capture a baseline from a Schedule JSON.
#[pyfunction]
fn capture_baseline(
    project_id: &str,
    captured_at: DateTime<Utc>,
    schedule_json: &str,
) -> PyResult<String> {
    let schedule: Schedule = parse(schedule_json)?;
    dump(&Baseline::capture(project_id, captured_at, &schedule))
}

/// Compare a Schedule JSON against a Baseline JSON.
#[pyfunction]
fn compare_baseline(baseline_json: &str, schedule_json: &str) -> PyResult<String> {
    let baseline: Baseline = parse(baseline_json)?;
    let schedule: Schedule = parse(schedule_json)?;
    dump(&compare(&baseline, &schedule))
}

/// Detect resource conflicts for explicit assignments.
#[pyfunction]
#[pyo3(signature = (assignments_json, calendar_json=None, window_json=None, minutes_per_unit=480))]
fn find_resource_conflicts(
    assignments_json: &str,
    calendar_json: Option<&str>,
    window_json: Option<&str>,
    minutes_per_unit: u32,
) -> PyResult<String> {
    let assignments: Vec<Assignment> = parse(assignments_json)?;
    let calendar: WorkingCalendar = match calendar_json {
        Some(json) => parse(json)?,
        None => WorkingCalendar::default(),
    };
    let window: Option<Interval<chrono::NaiveDate>> = window_json
        .map(parse::<Interval<chrono::NaiveDate>>)
        .transpose()?;
    let report = find_conflicts(&assignments, &calendar, window, minutes_per_unit, 0);
    dump(&report)
}

/// Install a stderr log subscriber for the engine's tracing events.
#[pyfunction]
#[pyo3(signature = (level=None))]
fn enable_logging(level: Option<&str>) {
    init_logging(level);
}

/// The gantt_engine Python module.
#[pymodule]
fn gantt_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(plan_project, m)?)?;
    m.add_function(wrap_pyfunction!(plan_gantt, m)?)?;
    m.add_function(wrap_pyfunction!(plan_projects, m)?)?;
    m.add_function(wrap_pyfunction!(capture_baseline, m)?)?;
    m.add_function(wrap_pyfunction!(compare_baseline, m)?)?;
    m.add_function(wrap_pyfunction!(find_resource_conflicts, m)?)?;
    m.add_function(wrap_pyfunction!(enable_logging, m)?)?;
    Ok(())
}
