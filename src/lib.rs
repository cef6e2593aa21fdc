pub mod listener;
pub mod message;
pub mod service;
mod utils;

pub use listener::{
    BackOff, BackOffAction, BatchListenerFailed, CommitError, CommonErrorHandler, Consumer,
    ConsumerRecordRecoverer, ContainerProperties, ExponentialBackOff, FailedBatchProcessor,
    FailureReport, FixedBackOff, RetryListener, SeekToBatchStart,
};
pub use message::{ConsumerRecord, ConsumerRecords, OffsetAndMetadata, RecordId, TopicPartition};
pub use service::{
    setup_local_tracing, setup_tracing, AppError, AppResult, ListenerConfig, ProcessorConfig,
};
pub use utils::LazyMessage;
