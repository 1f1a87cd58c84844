//! Metrics describing the evolution of a mining run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason a mining run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// No remaining pair sits at exactly the target distance.
    NoQualifyingPairs,
    /// The configured iteration budget was exhausted.
    MaxIterationsReached,
}

/// Metrics captured for each mining iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// Sequential iteration number (1-indexed).
    pub iteration: usize,
    /// Working-set indices of the seed pair that produced the rule.
    pub seed_indices: (usize, usize),
    /// Number of wildcard positions in the emitted rule.
    pub wildcards: usize,
    /// Number of vectors absorbed by the rule, seeds included.
    pub matched: usize,
    /// Vectors left in the working set after the iteration.
    pub remaining: usize,
    /// Execution time for the iteration.
    pub elapsed_iteration: Duration,
    /// Total time elapsed since mining started.
    pub elapsed_total: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

/// Aggregate metrics produced by a mining session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MiningMetrics {
    /// Per-iteration snapshots accrued during mining.
    pub iterations: Vec<IterationMetrics>,
    /// Total duration of the mining session.
    pub total_duration: Duration,
    /// Reason mining terminated.
    pub stop_reason: StopReason,
}

impl MiningMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            iterations: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::NoQualifyingPairs,
        }
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
            return value;
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
