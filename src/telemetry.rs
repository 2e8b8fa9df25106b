//! Metric descriptions and logging setup.
//!
//! Counters go through the `metrics` facade; they are no-ops until the
//! embedding application installs a recorder.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "press_digest=info,warn";

/// One-time metrics registration (so series show up on first scrape).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Articles parsed from providers.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "dedup_removed_total",
            "Articles removed as URL or title duplicates."
        );
        describe_counter!(
            "relevance_kept_total",
            "Articles accepted by the relevance filter."
        );
        describe_counter!(
            "relevance_guard_rail_total",
            "Runs where the relevance filter was disabled by the guard rail."
        );
        describe_counter!(
            "history_suppressed_total",
            "Articles dropped because a recent edition already published them."
        );
        describe_counter!(
            "generation_attempts_total",
            "Generator attempts across all phases."
        );
        describe_counter!(
            "generation_failures_total",
            "Phases that exhausted their retry budget."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the collect phase last completed."
        );
    });
}

/// Install the global subscriber: compact fmt layer on stderr, filter from
/// `RUST_LOG` or [`DEFAULT_LOG_FILTER`]. Stdout stays free for the output
/// path the binary prints.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Short anonymized fingerprint for prompts/responses in logs.
/// Never log raw generated text; log this instead.
pub fn fingerprint(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
