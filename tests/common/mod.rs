#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stonemq_listener::message::CommitOffsets;
use stonemq_listener::{
    AppError, AppResult, CommitError, CommonErrorHandler, Consumer, ConsumerRecord,
    ConsumerRecordRecoverer, ConsumerRecords, ContainerProperties, RecordId, RetryListener,
    TopicPartition,
};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Consumer double that records commits and seeks; every commit fails with
/// `commit_error` when it is set.
#[derive(Debug, Default)]
pub struct RecordingConsumer {
    pub commits: Vec<CommitOffsets>,
    pub commit_attempts: usize,
    pub seeks: Vec<(TopicPartition, i64)>,
    pub commit_error: Option<CommitError>,
}

impl RecordingConsumer {
    pub fn failing_commits(err: CommitError) -> Self {
        Self {
            commit_error: Some(err),
            ..Self::default()
        }
    }

    /// Committed offset per commit call, for single-partition batches.
    pub fn committed_offsets(&self, tp: &TopicPartition) -> Vec<i64> {
        self.commits
            .iter()
            .filter_map(|offsets| offsets.get(tp).map(|o| o.offset))
            .collect()
    }
}

impl Consumer for RecordingConsumer {
    fn commit_sync(&mut self, offsets: &CommitOffsets, _timeout: Duration) -> Result<(), CommitError> {
        self.commit_attempts += 1;
        if let Some(err) = &self.commit_error {
            return Err(err.clone());
        }
        self.commits.push(offsets.clone());
        Ok(())
    }

    fn seek(&mut self, tp: &TopicPartition, offset: i64) {
        self.seeks.push((tp.clone(), offset));
    }
}

pub fn fallback_failing_with(
    message: &'static str,
    calls: Arc<AtomicUsize>,
) -> impl CommonErrorHandler {
    move |_: &AppError,
          _: &ConsumerRecords,
          _: &mut dyn Consumer,
          _: &ContainerProperties,
          _: &dyn Fn()|
          -> AppResult<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::IllegalState(message.to_string()))
    }
}

pub fn recording_recoverer(recovered: Arc<Mutex<Vec<RecordId>>>) -> impl ConsumerRecordRecoverer {
    move |record: &ConsumerRecord, _: &AppError| -> AppResult<()> {
        recovered.lock().push(record.id());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CountingRetryListener {
    pub failed_attempts: Mutex<Vec<u32>>,
    pub recovered: AtomicUsize,
    pub recovery_failed: AtomicUsize,
}

impl RetryListener for CountingRetryListener {
    fn failed_delivery(&self, _record: &ConsumerRecord, _error: &AppError, attempt: u32) {
        self.failed_attempts.lock().push(attempt);
    }

    fn recovered(&self, _record: &ConsumerRecord, _error: &AppError) {
        self.recovered.fetch_add(1, Ordering::SeqCst);
    }

    fn recovery_failed(&self, _record: &ConsumerRecord, _original: &AppError, _failure: &AppError) {
        self.recovery_failed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn batch(topic: &str, partition: i32, offsets: &[i64]) -> ConsumerRecords {
    ConsumerRecords::new([(
        TopicPartition::new(topic, partition),
        offsets
            .iter()
            .map(|offset| ConsumerRecord::new(topic, partition, *offset))
            .collect(),
    )])
}

pub fn container() -> ContainerProperties {
    ContainerProperties::new(["topic"])
}

#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a subscriber at `level` installed for the current thread and
/// returns its result with everything that was logged.
pub fn capture_logs<T>(level: Level, f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(level)
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}
