//! Scoped timing around a composed call.
//!
//! 計測値はグローバル状態ではなく、呼び出しごとの値として受け渡す。

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Running stopwatch. Start it before submitting work, stop it after `get()`.
#[derive(Debug)]
pub struct Stopwatch {
    label: String,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Stopwatch {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop and log the elapsed time.
    pub fn stop(self) -> TimingReport {
        let elapsed = self.started.elapsed();
        tracing::info!("{} took {:?}", self.label, elapsed);
        TimingReport {
            label: self.label,
            started_at: self.started_at,
            elapsed,
        }
    }
}

/// Result of one stopped `Stopwatch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingReport {
    pub label: String,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl TimingReport {
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Time `f` and return its value with the report.
pub fn timed<R>(label: impl Into<String>, f: impl FnOnce() -> R) -> (R, TimingReport) {
    let watch = Stopwatch::start(label);
    let value = f();
    (value, watch.stop())
}
