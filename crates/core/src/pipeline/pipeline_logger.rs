use std::collections::HashMap;
use std::sync::Mutex;

use super::pipeline_state::PipelineState;

/// Cross-cutting observer for pipeline orchestration events.
///
/// Decouples the use case from specific output mechanisms so each caller
/// can observe stage timings and state changes without changing the
/// orchestration code. Shared across concurrent requests, hence `&self`.
pub trait PipelineLogger: Send + Sync {
    /// Record how long a named stage took for one request.
    fn timing(&self, stage: &str, duration_ms: f64);

    /// Record a state-machine edge.
    fn transition(&self, from: PipelineState, to: PipelineState);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&self, _stage: &str, _duration_ms: f64) {}
    fn transition(&self, _from: PipelineState, _to: PipelineState) {}
}

#[derive(Default)]
struct TimingRecord {
    timings: HashMap<String, Vec<f64>>,
    terminal: HashMap<PipelineState, usize>,
}

/// CLI-oriented logger that tracks per-stage durations and terminal states
/// and renders a summary when the run completes.
#[derive(Default)]
pub struct TimingPipelineLogger {
    record: Mutex<TimingRecord>,
}

impl TimingPipelineLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        let record = self.record.lock().ok()?;
        if record.timings.is_empty() && record.terminal.is_empty() {
            return None;
        }

        let requests: usize = record.terminal.values().sum();
        let mut lines = vec![format!("Pipeline summary ({requests} requests):")];

        let mut stages: Vec<_> = record.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &record.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:7.1}ms  total {total_ms:8.0}ms  ({} runs)",
                durations.len()
            ));
        }

        let mut outcomes: Vec<_> = record
            .terminal
            .iter()
            .map(|(state, n)| (state.to_string(), *n))
            .collect();
        outcomes.sort();
        for (state, n) in outcomes {
            lines.push(format!("  {state}: {n}"));
        }

        Some(lines.join("\n"))
    }

    /// Returns the timing data for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<Vec<f64>> {
        self.record.lock().ok()?.timings.get(stage).cloned()
    }

    /// How many runs ended in `state`.
    pub fn terminal_count(&self, state: PipelineState) -> usize {
        self.record
            .lock()
            .map(|r| r.terminal.get(&state).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl PipelineLogger for TimingPipelineLogger {
    fn timing(&self, stage: &str, duration_ms: f64) {
        if let Ok(mut record) = self.record.lock() {
            record
                .timings
                .entry(stage.to_string())
                .or_default()
                .push(duration_ms);
        }
    }

    fn transition(&self, _from: PipelineState, to: PipelineState) {
        if to.is_terminal() {
            if let Ok(mut record) = self.record.lock() {
                *record.terminal.entry(to).or_default() += 1;
            }
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
