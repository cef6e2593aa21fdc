// Copyright 2025 jonefeewang@gmail.com
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::message::{RecordId, TopicPartition};

use super::{BackOff, BackOffAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Exhausted,
}

/// Attempts made so far for one failed record.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempts: u32,
    first_failure: Instant,
    exhausted: bool,
}

impl RetryState {
    fn first(now: Instant) -> Self {
        Self {
            attempts: 1,
            first_failure: now,
            exhausted: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Tracks retry attempts per record identity across polls.
///
/// Every lookup-and-update happens under one lock, so a record cannot be judged
/// retryable and removed as recovered at the same time.
pub struct FailedRecordTracker {
    back_off: Arc<dyn BackOff>,
    failures: Mutex<HashMap<RecordId, RetryState>>,
}

impl FailedRecordTracker {
    pub fn new(back_off: Arc<dyn BackOff>) -> Self {
        Self {
            back_off,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure of `id` and decides whether it gets another delivery.
    ///
    /// Returns the decision together with the attempt number it was made for, both
    /// read under the same lock. Once a record is exhausted it stays exhausted until
    /// it is removed, even if the backoff would hand out another delay.
    pub fn record_failed(&self, id: &RecordId, retryable: bool) -> (RetryDecision, u32) {
        let now = Instant::now();
        let mut failures = self.failures.lock();

        // a failure at another offset of the same partition means the old one was passed
        failures.retain(|key, _| key.topic_partition != id.topic_partition || key == id);

        let state = failures
            .entry(id.clone())
            .and_modify(|state| state.attempts = state.attempts.saturating_add(1))
            .or_insert_with(|| RetryState::first(now));
        let attempt = state.attempts;

        if !retryable {
            state.exhausted = true;
        }
        if state.exhausted {
            return (RetryDecision::Exhausted, attempt);
        }

        let elapsed = now.duration_since(state.first_failure);
        let decision = match self.back_off.next_action(attempt, elapsed) {
            BackOffAction::Delay(delay) => {
                trace!(
                    record = %id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "record in retry"
                );
                RetryDecision::Retry(delay)
            }
            BackOffAction::Stop => {
                state.exhausted = true;
                RetryDecision::Exhausted
            }
        };
        (decision, attempt)
    }

    pub fn remove(&self, id: &RecordId) -> Option<RetryState> {
        self.failures.lock().remove(id)
    }

    /// Drops state for partitions this consumer no longer owns.
    pub fn partitions_revoked(&self, partitions: &[TopicPartition]) {
        self.failures
            .lock()
            .retain(|key, _| !partitions.contains(&key.topic_partition));
    }

    pub fn attempts(&self, id: &RecordId) -> Option<u32> {
        self.failures.lock().get(id).map(RetryState::attempts)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.failures.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl std::fmt::Debug for FailedRecordTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailedRecordTracker")
            .field("failures", &*self.failures.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::FixedBackOff;

    fn tracker(max_attempts: u32) -> FailedRecordTracker {
        FailedRecordTracker::new(Arc::new(FixedBackOff::from_millis(5, max_attempts)))
    }

    #[test]
    fn test_retry_until_exhausted() {
        let tracker = tracker(2);
        let id = RecordId::new("topic", 0, 1);

        assert_eq!(
            tracker.record_failed(&id, true),
            (RetryDecision::Retry(Duration::from_millis(5)), 1)
        );
        assert_eq!(
            tracker.record_failed(&id, true),
            (RetryDecision::Retry(Duration::from_millis(5)), 2)
        );
        assert_eq!(tracker.record_failed(&id, true), (RetryDecision::Exhausted, 3));
        assert_eq!(tracker.attempts(&id), Some(3));

        // stays exhausted until removed
        assert_eq!(tracker.record_failed(&id, true), (RetryDecision::Exhausted, 4));
        assert!(tracker.remove(&id).unwrap().is_exhausted());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_zero_attempts_exhausts_immediately() {
        let tracker = tracker(0);
        let id = RecordId::new("topic", 0, 0);
        assert_eq!(tracker.record_failed(&id, true), (RetryDecision::Exhausted, 1));
    }

    #[test]
    fn test_not_retryable_exhausts_immediately() {
        let tracker = tracker(10);
        let id = RecordId::new("topic", 0, 0);
        assert_eq!(tracker.record_failed(&id, false), (RetryDecision::Exhausted, 1));
        assert!(tracker.contains(&id));
    }

    #[test]
    fn test_new_offset_on_partition_replaces_state() {
        let tracker = tracker(10);
        let first = RecordId::new("topic", 0, 3);
        let second = RecordId::new("topic", 0, 4);
        let other_partition = RecordId::new("topic", 1, 3);

        tracker.record_failed(&first, true);
        tracker.record_failed(&first, true);
        tracker.record_failed(&other_partition, true);
        tracker.record_failed(&second, true);

        assert!(!tracker.contains(&first));
        assert_eq!(tracker.attempts(&second), Some(1));
        assert_eq!(tracker.attempts(&other_partition), Some(1));
    }

    #[test]
    fn test_partitions_revoked() {
        let tracker = tracker(10);
        tracker.record_failed(&RecordId::new("topic", 0, 3), true);
        tracker.record_failed(&RecordId::new("topic", 1, 3), true);

        tracker.partitions_revoked(&[TopicPartition::new("topic", 0)]);

        assert_eq!(tracker.len(), 1);
        assert!(tracker.contains(&RecordId::new("topic", 1, 3)));
    }
}
