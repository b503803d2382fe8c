//! Probe traversal policies
//!
//! The locator and the version sniffer both walk an ordered list of probes,
//! but with different traversal rules: the locator launches every candidate
//! fetch at once and keeps all hits, while the sniffer checks auxiliary
//! sources one at a time and stops at the first match (a latency/courtesy
//! tradeoff, not a correctness requirement). Both behaviors are named
//! policies evaluated by one driver so neither is incidental control flow.

use futures_util::future::{join_all, BoxFuture};

/// How an ordered probe list is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePolicy {
    /// Launch every probe concurrently, await them jointly, keep all hits
    /// in input order. Individual misses are tolerated.
    ConcurrentAll,

    /// Run probes one at a time in input order and stop at the first hit.
    /// Later probes are never started once one succeeds.
    SequentialFirstMatch,
}

/// Evaluates an ordered set of probes under the given policy, returning the
/// hits in probe order (at most one hit for `SequentialFirstMatch`).
pub async fn evaluate<T>(policy: ProbePolicy, probes: Vec<BoxFuture<'_, Option<T>>>) -> Vec<T> {
    match policy {
        ProbePolicy::ConcurrentAll => join_all(probes).await.into_iter().flatten().collect(),
        ProbePolicy::SequentialFirstMatch => {
            for probe in probes {
                if let Some(hit) = probe.await {
                    return vec![hit];
                }
            }
            Vec::new()
        }
    }
}
