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

//! Recovery of a batch in which the listener named the record that failed.
//!
//! Records before the failed one are committed, the failed record is retried
//! through the backoff until it is exhausted and handed to the recoverer, and
//! everything the processor cannot account for is passed to the fallback handler.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::message::{offsets_past, CommitOffsets, ConsumerRecords, TopicPartition};
use crate::service::ProcessorConfig;
use crate::utils::LazyMessage;
use crate::{AppError, AppResult};

use super::record_locator::{self, Located};
use super::{
    BackOff, BatchListenerFailed, CommitError, CommonErrorHandler, Consumer,
    ConsumerRecordRecoverer, ContainerProperties, FailedRecordTracker, RetryDecision,
    RetryListener,
};

/// Decides whether a commit failure is a transient race with a rebalance.
pub type ContentionClassifier = fn(&CommitError) -> bool;

/// Decides whether a listener failure is worth retrying at all.
pub type RetryableClassifier = Arc<dyn Fn(&AppError) -> bool + Send + Sync>;

// Everything one `handle` call works with.
struct BatchContext<'a> {
    thrown: &'a AppError,
    data: &'a ConsumerRecords,
    consumer: &'a mut dyn Consumer,
    container: &'a ContainerProperties,
    invoke_listener: &'a dyn Fn(),
}

pub struct FailedBatchProcessor {
    recoverer: Arc<dyn ConsumerRecordRecoverer>,
    fallback: Arc<dyn CommonErrorHandler>,
    tracker: FailedRecordTracker,
    retry_listeners: Vec<Arc<dyn RetryListener>>,
    is_contention: ContentionClassifier,
    is_retryable: RetryableClassifier,
    seek_after_error: bool,
    commit_recovered: bool,
    reset_state_on_recovery_failure: bool,
}

impl FailedBatchProcessor {
    pub fn new(
        recoverer: impl ConsumerRecordRecoverer + 'static,
        back_off: impl BackOff + 'static,
        fallback: impl CommonErrorHandler + 'static,
    ) -> Self {
        Self::with_parts(Arc::new(recoverer), Arc::new(back_off), Arc::new(fallback))
    }

    pub fn with_parts(
        recoverer: Arc<dyn ConsumerRecordRecoverer>,
        back_off: Arc<dyn BackOff>,
        fallback: Arc<dyn CommonErrorHandler>,
    ) -> Self {
        Self {
            recoverer,
            fallback,
            tracker: FailedRecordTracker::new(back_off),
            retry_listeners: Vec::new(),
            is_contention: CommitError::is_rebalance_in_progress,
            is_retryable: Arc::new(|err: &AppError| !matches!(err, AppError::Deserialization(_))),
            seek_after_error: true,
            commit_recovered: true,
            reset_state_on_recovery_failure: true,
        }
    }

    pub fn from_config(
        config: &ProcessorConfig,
        recoverer: Arc<dyn ConsumerRecordRecoverer>,
        fallback: Arc<dyn CommonErrorHandler>,
    ) -> Self {
        let mut processor = Self::with_parts(recoverer, config.backoff.build(), fallback);
        processor.seek_after_error = config.seek_after_error;
        processor.commit_recovered = config.commit_recovered;
        processor.reset_state_on_recovery_failure = config.reset_state_on_recovery_failure;
        processor
    }

    pub fn with_retry_listener(mut self, listener: Arc<dyn RetryListener>) -> Self {
        self.retry_listeners.push(listener);
        self
    }

    pub fn with_contention_classifier(mut self, classifier: ContentionClassifier) -> Self {
        self.is_contention = classifier;
        self
    }

    pub fn with_retryable_classifier(mut self, classifier: RetryableClassifier) -> Self {
        self.is_retryable = classifier;
        self
    }

    pub fn with_seek_after_error(mut self, seek_after_error: bool) -> Self {
        self.seek_after_error = seek_after_error;
        self
    }

    pub fn with_commit_recovered(mut self, commit_recovered: bool) -> Self {
        self.commit_recovered = commit_recovered;
        self
    }

    pub fn with_reset_state_on_recovery_failure(mut self, reset: bool) -> Self {
        self.reset_state_on_recovery_failure = reset;
        self
    }

    pub fn tracker(&self) -> &FailedRecordTracker {
        &self.tracker
    }

    pub fn partitions_revoked(&self, partitions: &[TopicPartition]) {
        self.tracker.partitions_revoked(partitions);
    }

    /// Handles a batch whose listener failed.
    ///
    /// Returns `Ok` once the failed record is recovered and committed,
    /// `AppError::RecordInRetry` when the batch has to be redelivered, or whatever the
    /// fallback handler returns when the failure cannot be handled record by record.
    pub fn handle(
        &self,
        thrown: &AppError,
        data: &ConsumerRecords,
        consumer: &mut dyn Consumer,
        container: &ContainerProperties,
        invoke_listener: &dyn Fn(),
    ) -> AppResult<()> {
        let mut ctx = BatchContext {
            thrown,
            data,
            consumer,
            container,
            invoke_listener,
        };

        let Some(failed) = thrown.batch_listener_failed() else {
            debug!(error = %thrown, "Expected a BatchListenerFailed error; re-delivering full batch");
            return self.fallback(&mut ctx);
        };

        match record_locator::locate(data, failed.report()) {
            Ok(located) => self.seek_or_recover(&mut ctx, failed, located),
            Err(not_found) => {
                warn!(
                    error = %failed,
                    topics = %container.topics_label(),
                    "{}",
                    LazyMessage::new(|| format!(
                        "{}; batch {}; delegating to fallback handler",
                        not_found,
                        data.summary()
                    ))
                );
                self.fallback(&mut ctx)
            }
        }
    }

    fn seek_or_recover(
        &self,
        ctx: &mut BatchContext<'_>,
        failed: &BatchListenerFailed,
        located: Located<'_>,
    ) -> AppResult<()> {
        let record = located.record;

        // everything before the failed record was processed
        let processed = offsets_past(
            ctx.data.iter().take(located.index),
            ctx.container.commit_metadata.as_deref(),
        );
        if !processed.is_empty() {
            if let Err(err) = self.commit(ctx, &processed) {
                return self.commit_failed(ctx, err, 0);
            }
        }

        let id = record.id();
        let retryable = (self.is_retryable)(failed.cause().unwrap_or(ctx.thrown));
        let (decision, attempt) = self.tracker.record_failed(&id, retryable);
        for listener in &self.retry_listeners {
            listener.failed_delivery(record, ctx.thrown, attempt);
        }

        match decision {
            RetryDecision::Retry(delay) => {
                debug!(
                    record = %id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Record in retry and not yet recovered"
                );
                self.seek_remaining(ctx, located.index);
                Err(AppError::record_in_retry(delay))
            }
            RetryDecision::Exhausted => self.recover(ctx, located),
        }
    }

    fn recover(&self, ctx: &mut BatchContext<'_>, located: Located<'_>) -> AppResult<()> {
        let record = located.record;
        let id = record.id();

        if let Err(failure) = self.recoverer.accept(record, ctx.thrown) {
            error!(record = %id, error = %failure, "Recovery of record failed");
            for listener in &self.retry_listeners {
                listener.recovery_failed(record, ctx.thrown, &failure);
            }
            if self.reset_state_on_recovery_failure {
                self.tracker.remove(&id);
            }
            self.seek_remaining(ctx, located.index);
            return Err(AppError::record_in_retry_caused_by(
                Duration::ZERO,
                AppError::RecoveryFailed {
                    record: id.to_string(),
                    message: failure.to_string(),
                },
            ));
        }

        for listener in &self.retry_listeners {
            listener.recovered(record, ctx.thrown);
        }

        if self.commit_recovered {
            let offsets = offsets_past(
                std::iter::once(record),
                ctx.container.commit_metadata.as_deref(),
            );
            if let Err(err) = self.commit(ctx, &offsets) {
                return self.commit_failed(ctx, err, located.index);
            }
        }

        // only now is it safe to forget the record
        self.tracker.remove(&id);
        debug!(record = %id, "recovered failed record");
        self.seek_remaining(ctx, located.index + 1);
        Ok(())
    }

    fn commit(&self, ctx: &mut BatchContext<'_>, offsets: &CommitOffsets) -> Result<(), CommitError> {
        trace!(offsets = ?offsets, "committing offsets");
        ctx.consumer
            .commit_sync(offsets, ctx.container.sync_commit_timeout())
    }

    /// A commit race with a rebalance means the batch must be redelivered from
    /// `redeliver_from`; any other commit error is the fallback's problem.
    fn commit_failed(
        &self,
        ctx: &mut BatchContext<'_>,
        err: CommitError,
        redeliver_from: usize,
    ) -> AppResult<()> {
        if (self.is_contention)(&err) {
            warn!(error = %err, "offset commit raced with a rebalance; batch will be redelivered");
            self.seek_remaining(ctx, redeliver_from);
            return Err(AppError::record_in_retry_caused_by(Duration::ZERO, err.into()));
        }

        let data = ctx.data;
        error!(
            error = %err,
            "{}",
            LazyMessage::new(|| format!(
                "offset commit failed for batch {}; delegating to fallback handler",
                data.summary()
            ))
        );
        self.fallback(ctx)
    }

    // Rewinds each partition to its first record at or after flat index `from`.
    fn seek_remaining(&self, ctx: &mut BatchContext<'_>, from: usize) {
        if !self.seek_after_error {
            return;
        }
        let mut seeks: Vec<(TopicPartition, i64)> = Vec::new();
        for record in ctx.data.iter().skip(from) {
            if !seeks
                .iter()
                .any(|(tp, _)| tp.topic == record.topic && tp.partition == record.partition)
            {
                seeks.push((record.topic_partition(), record.offset));
            }
        }
        for (tp, offset) in seeks {
            trace!(partition = %tp, offset, "seeking");
            ctx.consumer.seek(&tp, offset);
        }
    }

    fn fallback(&self, ctx: &mut BatchContext<'_>) -> AppResult<()> {
        self.fallback.handle_batch(
            ctx.thrown,
            ctx.data,
            &mut *ctx.consumer,
            ctx.container,
            ctx.invoke_listener,
        )
    }
}

impl std::fmt::Debug for FailedBatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailedBatchProcessor")
            .field("tracker", &self.tracker)
            .field("retry_listeners", &self.retry_listeners.len())
            .field("seek_after_error", &self.seek_after_error)
            .field("commit_recovered", &self.commit_recovered)
            .field(
                "reset_state_on_recovery_failure",
                &self.reset_state_on_recovery_failure,
            )
            .finish()
    }
}
