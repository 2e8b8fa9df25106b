//! Bounded retry loop shared by every generated-content phase.
//!
//! Per attempt: generate → extract (repair included, or the phase's own
//! parser) → validate. Any failure
//! becomes a list of error strings that is appended, as feedback, to the
//! *base* prompt of the next attempt. Feedback never accumulates across
//! attempts. After `max_attempts` the phase fails with the last error list.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::generator::Generator;
use super::PhaseSpec;
use crate::error::{GenerateError, PipelineError};
use crate::telemetry::{self, fingerprint};

pub const MAX_ATTEMPTS: u32 = 2;

/// `[retry]` section. One bound for every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// Per-run knobs that are not part of the phase contract.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub retry: RetryConfig,
    /// Deadline for a single generator call.
    pub timeout: Duration,
    /// Where raw responses are written as `<prefix>_raw_attempt_<n>.txt`.
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_prefix: String,
}

impl RunOptions {
    pub fn new(retry: RetryConfig, timeout: Duration) -> Self {
        Self {
            retry,
            timeout,
            snapshot_dir: None,
            snapshot_prefix: "raw".to_string(),
        }
    }

    pub fn with_snapshots(mut self, dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self.snapshot_prefix = prefix.into();
        self
    }
}

/// State carried from one attempt to the next.
#[derive(Debug, Clone, Default)]
pub struct AttemptState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_errors: Vec<String>,
    /// Last raw response, kept for diagnostics only.
    pub last_raw: Option<String>,
}

impl AttemptState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn has_budget(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Prompt for the next attempt: the base prompt, plus the previous
    /// attempt's errors when there were any.
    pub fn prompt(&self, base: &str) -> String {
        if self.last_errors.is_empty() {
            return base.to_string();
        }
        feedback_prompt(base, &self.last_errors)
    }
}

pub fn feedback_prompt(base: &str, errors: &[String]) -> String {
    let list: Vec<String> = errors.iter().map(|e| format!("- {e}")).collect();
    format!(
        "{base}\n\n## ERRORS FROM PREVIOUS ATTEMPT\n\nFix these errors in your response:\n{}\n",
        list.join("\n")
    )
}

/// Drive `generator` until `spec` accepts a payload or the budget runs out.
pub async fn run_phase(
    generator: &dyn Generator,
    spec: &PhaseSpec,
    base_prompt: &str,
    opts: &RunOptions,
) -> Result<Value, PipelineError> {
    telemetry::ensure_described();
    let mut state = AttemptState::new(opts.retry.max_attempts);

    while state.has_budget() {
        state.attempt += 1;
        let prompt = state.prompt(base_prompt);
        counter!("generation_attempts_total", "phase" => spec.name.clone()).increment(1);
        info!(
            target: "generation",
            phase = %spec.name,
            attempt = state.attempt,
            max = state.max_attempts,
            prompt = %fingerprint(&prompt),
            "attempt"
        );

        let raw = match call_with_timeout(generator, &spec.name, &prompt, opts.timeout).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(target: "generation", phase = %spec.name, attempt = state.attempt, error = %e, "generator call failed");
                state.last_errors = vec![e.to_string()];
                continue;
            }
        };
        save_snapshot(opts, state.attempt, &raw);

        let payload = spec.extract(&raw);
        state.last_raw = Some(raw);
        let Some(payload) = payload else {
            warn!(target: "generation", phase = %spec.name, attempt = state.attempt, "no payload in response");
            state.last_errors = vec![spec.parse_failure_message()];
            continue;
        };

        let errors = spec.validate(&payload);
        if errors.is_empty() {
            info!(target: "generation", phase = %spec.name, attempt = state.attempt, "payload accepted");
            return Ok(payload);
        }
        for e in &errors {
            warn!(target: "generation", phase = %spec.name, attempt = state.attempt, violation = %e, "validation failed");
        }
        state.last_errors = errors;
    }

    counter!("generation_failures_total", "phase" => spec.name.clone()).increment(1);
    Err(PipelineError::PhaseExhausted {
        phase: spec.name.clone(),
        attempts: state.attempt,
        errors: state.last_errors,
    })
}

async fn call_with_timeout(
    generator: &dyn Generator,
    phase: &str,
    prompt: &str,
    timeout: Duration,
) -> Result<String, GenerateError> {
    match tokio::time::timeout(timeout, generator.generate(phase, prompt)).await {
        Ok(res) => res,
        Err(_) => Err(GenerateError::Timeout(timeout)),
    }
}

fn save_snapshot(opts: &RunOptions, attempt: u32, raw: &str) {
    let Some(dir) = &opts.snapshot_dir else {
        return;
    };
    let path = dir.join(format!("{}_raw_attempt_{attempt}.txt", opts.snapshot_prefix));
    if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::write(&path, raw)) {
        warn!(target: "generation", path = %path.display(), error = %e, "could not save raw response");
    }
}
