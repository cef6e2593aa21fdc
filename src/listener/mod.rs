pub use backoff::{BackOff, BackOffAction, ExponentialBackOff, FixedBackOff};
pub use batch_failure::{BatchListenerFailed, FailureReport};
pub use consumer::{CommitError, Consumer, ContainerProperties};
pub use error_handler::{
    CommonErrorHandler, ConsumerRecordRecoverer, RetryListener, SeekToBatchStart,
};
pub use failed_batch_processor::{ContentionClassifier, FailedBatchProcessor, RetryableClassifier};
pub use failed_record_tracker::{FailedRecordTracker, RetryDecision, RetryState};
pub use record_locator::{locate, LocateError, Located};

mod backoff;
mod batch_failure;
mod consumer;
mod error_handler;
mod failed_batch_processor;
mod failed_record_tracker;
mod record_locator;
