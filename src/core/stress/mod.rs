use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::QueueError;
use crate::core::queue::ConcurrentQueue;
use crate::core::report::StressReport;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(1); // process-wide counter for run IDs

/// Item pushed by the harness, unique within one run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tagged {
    pub producer: usize,
    pub seq: usize, // position in the producer's push order
}

/// Shape of a stress run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            items_per_producer: 10_000,
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.producers == 0 {
            return Err(QueueError::InvalidConfig("producers must be at least 1".into()));
        }
        if self.consumers == 0 {
            return Err(QueueError::InvalidConfig("consumers must be at least 1".into()));
        }
        if self.items_per_producer == 0 {
            return Err(QueueError::InvalidConfig("items_per_producer must be at least 1".into()));
        }
        self.producers
            .checked_mul(self.items_per_producer)
            .map(|_| ())
            .ok_or_else(|| QueueError::InvalidConfig("total item count overflows usize".into()))
    }

    pub fn total_items(&self) -> usize {
        self.producers * self.items_per_producer
    }
}

/// Run producers and consumers against one shared queue and check that every
/// pushed item was popped exactly once.
///
/// Each producer pushes `items_per_producer` items tagged with its index and
/// an increasing sequence number. Consumers poll until the shared count of
/// consumed items reaches the total, yielding whenever the queue is empty.
/// Besides exactly-once delivery, each consumer must see every producer's
/// items in increasing sequence order, since a FIFO queue cannot reorder two
/// pushes made by the same thread.
pub fn run_stress(config: &StressConfig) -> Result<StressReport, QueueError> {
    config.validate()?;
    let run_id = RUN_COUNTER.fetch_add(1, Ordering::SeqCst);
    let total = config.total_items();
    debug!(run_id, ?config, total, "starting stress run");

    let queue = ConcurrentQueue::new();
    let observed: ConcurrentQueue<Vec<Tagged>> = ConcurrentQueue::new();
    let pushed = AtomicUsize::new(0);
    let consumed = AtomicUsize::new(0);
    let started = Instant::now();

    thread::scope(|scope| {
        for producer in 0..config.producers {
            let queue = &queue;
            let pushed = &pushed;
            scope.spawn(move || {
                for seq in 0..config.items_per_producer {
                    queue.push(Tagged { producer, seq });
                    pushed.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        for consumer in 0..config.consumers {
            let queue = &queue;
            let observed = &observed;
            let consumed = &consumed;
            scope.spawn(move || {
                let mut seen = Vec::new();
                while consumed.load(Ordering::Acquire) < total {
                    match queue.pop() {
                        Some(item) => {
                            seen.push(item);
                            consumed.fetch_add(1, Ordering::AcqRel);
                        }
                        None => thread::yield_now(),
                    }
                }
                debug!(run_id, consumer, popped = seen.len(), "consumer finished");
                observed.push(seen);
            });
        }
    });

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let remaining = queue.len();
    let observed = observed.into_inner();

    let popped = observed.iter().map(Vec::len).sum();
    let fifo_violations = observed.iter().map(|seen| fifo_violations(seen)).sum();
    let (duplicates, missing) = delivery_faults(config, observed.iter().flatten());

    let report = StressReport {
        run_id,
        config: config.clone(),
        pushed: pushed.into_inner(),
        popped,
        duplicates,
        missing,
        fifo_violations,
        remaining,
        elapsed_ms,
        verified: duplicates == 0 && missing == 0 && fifo_violations == 0 && remaining == 0,
    };

    if report.verified {
        info!(run_id, popped, elapsed_ms, "stress run verified");
    } else {
        warn!(run_id, duplicates, missing, fifo_violations, remaining, "stress run failed verification");
    }
    Ok(report)
}

/// Count items whose sequence number does not exceed the last one seen from
/// the same producer.
fn fifo_violations(seen: &[Tagged]) -> usize {
    let mut last: HashMap<usize, usize> = HashMap::new();
    let mut violations = 0;
    for item in seen {
        if let Some(prev) = last.insert(item.producer, item.seq) {
            if item.seq <= prev {
                violations += 1;
            }
        }
    }
    violations
}

/// Returns (duplicates, missing) for the popped tags against the expected set.
fn delivery_faults<'a>(config: &StressConfig, popped: impl Iterator<Item = &'a Tagged>) -> (usize, usize) {
    let mut counts: HashMap<Tagged, usize> = HashMap::with_capacity(config.total_items());
    for item in popped {
        *counts.entry(*item).or_insert(0) += 1;
    }

    let mut duplicates = 0;
    let mut missing = 0;
    for producer in 0..config.producers {
        for seq in 0..config.items_per_producer {
            match counts.remove(&Tagged { producer, seq }) {
                Some(n) => duplicates += n - 1,
                None => missing += 1,
            }
        }
    }
    // anything left was never pushed
    duplicates += counts.values().sum::<usize>();
    (duplicates, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(producer: usize, seq: usize) -> Tagged {
        Tagged { producer, seq }
    }

    #[test]
    fn validate_rejects_zero_counts() {
        let config = StressConfig { producers: 0, ..StressConfig::default() };
        assert!(matches!(config.validate(), Err(QueueError::InvalidConfig(_))));

        let config = StressConfig { consumers: 0, ..StressConfig::default() };
        assert!(matches!(config.validate(), Err(QueueError::InvalidConfig(_))));

        let config = StressConfig { items_per_producer: 0, ..StressConfig::default() };
        assert!(matches!(config.validate(), Err(QueueError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_overflowing_total() {
        let config = StressConfig { producers: usize::MAX, consumers: 1, items_per_producer: 2 };
        assert!(matches!(config.validate(), Err(QueueError::InvalidConfig(_))));
    }

    #[test]
    fn fifo_violations_are_per_producer() {
        let seen = [tag(0, 0), tag(1, 0), tag(0, 2), tag(1, 1), tag(0, 1)];
        assert_eq!(fifo_violations(&seen), 1);
        assert_eq!(fifo_violations(&[tag(0, 0), tag(0, 0)]), 1);
        assert_eq!(fifo_violations(&[]), 0);
    }

    #[test]
    fn delivery_faults_counts_duplicates_and_missing() {
        let config = StressConfig { producers: 2, consumers: 1, items_per_producer: 2 };
        let popped = [tag(0, 0), tag(0, 0), tag(0, 1), tag(1, 1)];
        assert_eq!(delivery_faults(&config, popped.iter()), (1, 1));

        let exact = [tag(1, 0), tag(0, 1), tag(1, 1), tag(0, 0)];
        assert_eq!(delivery_faults(&config, exact.iter()), (0, 0));
    }

    #[test]
    fn delivery_faults_flags_unknown_tags() {
        let config = StressConfig { producers: 1, consumers: 1, items_per_producer: 1 };
        let popped = [tag(0, 0), tag(5, 0)];
        assert_eq!(delivery_faults(&config, popped.iter()), (1, 0));
    }

    #[test]
    fn config_fills_missing_fields_from_default() {
        let config: StressConfig = serde_json::from_str(r#"{"producers": 2}"#).unwrap();
        assert_eq!(config.producers, 2);
        assert_eq!(config.consumers, StressConfig::default().consumers);
    }
}
