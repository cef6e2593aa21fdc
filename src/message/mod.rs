pub use offset::{offsets_past, CommitOffsets, OffsetAndMetadata};
pub use record::{ConsumerRecord, ConsumerRecords};
pub use topic_partition::{RecordId, TopicPartition};

mod offset;
mod record;
mod topic_partition;
