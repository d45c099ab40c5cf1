//! Structured observability hooks for the run lifecycle.
//!
//! - Run-scoped tracing spans via the `RunSpan` RAII guard
//! - Emission functions for lifecycle events: start, unit outcome,
//!   termination, decision provenance, finish, abort
//!
//! Every event carries an `event = "..."` field so JSON log output can be
//! filtered without parsing messages.

use tracing::{info, warn};

/// RAII guard that enters a run-scoped span for the duration of a run.
///
/// ```ignore
/// let _span = RunSpan::enter("6f1c…", "MOL_001");
/// // every event below is tagged with run_id and subject_id
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str, subject_id: &str) -> Self {
        let span = tracing::info_span!("triage.run", run_id = %run_id, subject_id = %subject_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_started(subject_id: &str, total_units: usize, pipeline_digest: &str) {
    info!(
        event = "run.started",
        subject_id = %subject_id,
        total_units = total_units,
        pipeline_digest = %pipeline_digest,
    );
}

pub fn emit_unit_completed(unit: &str, status: &str, execution_time_ms: f64) {
    info!(
        event = "unit.completed",
        unit = %unit,
        status = %status,
        execution_time_ms = execution_time_ms,
    );
}

/// Emit event: a unit failed. `fatal` tells whether the run aborts.
pub fn emit_unit_failed(unit: &str, error: &str, execution_time_ms: f64, fatal: bool) {
    if fatal {
        tracing::error!(
            event = "unit.failed",
            unit = %unit,
            error = %error,
            execution_time_ms = execution_time_ms,
            fatal = true,
        );
    } else {
        warn!(
            event = "unit.failed",
            unit = %unit,
            error = %error,
            execution_time_ms = execution_time_ms,
            fatal = false,
        );
    }
}

pub fn emit_run_terminated(subject_id: &str, reason: &str, units_completed: usize) {
    warn!(
        event = "run.terminated",
        subject_id = %subject_id,
        reason = %reason,
        units_completed = units_completed,
    );
}

/// Emit event: audit trail linking a decision to the rule and evidence
/// that produced it.
pub fn emit_decision_provenance(
    subject_id: &str,
    category: &str,
    source: &str,
    result_names: &[&str],
) {
    info!(
        event = "decision.provenance",
        subject_id = %subject_id,
        category = %category,
        source = %source,
        num_results = result_names.len(),
        result_names = ?result_names,
    );
}

pub fn emit_run_finished(
    subject_id: &str,
    category: &str,
    executed_units: usize,
    failed_units: usize,
    duration_ms: f64,
    early_termination: bool,
) {
    info!(
        event = "run.finished",
        subject_id = %subject_id,
        category = %category,
        executed_units = executed_units,
        failed_units = failed_units,
        duration_ms = duration_ms,
        early_termination = early_termination,
    );
}

pub fn emit_run_aborted(subject_id: &str, error: &dyn std::fmt::Display) {
    tracing::error!(event = "run.aborted", subject_id = %subject_id, error = %error);
}
