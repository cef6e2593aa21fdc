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

use std::fmt::Write;

use bytes::Bytes;

use super::{RecordId, TopicPartition};

/// A record as handed to a listener. Key and value are opaque to the recovery logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl ConsumerRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            timestamp: -1,
            key: None,
            value: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }

    pub fn id(&self) -> RecordId {
        RecordId::new(self.topic.clone(), self.partition, self.offset)
    }
}

/// Records returned by one poll, grouped by partition.
///
/// Partitions keep their insertion order; iterating the batch yields records in the
/// order the listener saw them, which is what flat failure indexes refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerRecords {
    partitions: Vec<(TopicPartition, Vec<ConsumerRecord>)>,
}

impl ConsumerRecords {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(partitions: impl IntoIterator<Item = (TopicPartition, Vec<ConsumerRecord>)>) -> Self {
        let mut records = Self::empty();
        for (tp, batch) in partitions {
            records.append(tp, batch);
        }
        records
    }

    /// Appends records for a partition, merging with records already present for it.
    pub fn append(&mut self, tp: TopicPartition, batch: Vec<ConsumerRecord>) {
        match self.partitions.iter_mut().find(|(existing, _)| *existing == tp) {
            Some((_, records)) => records.extend(batch),
            None => self.partitions.push((tp, batch)),
        }
    }

    pub fn count(&self) -> usize {
        self.partitions.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn partitions(&self) -> impl Iterator<Item = &TopicPartition> {
        self.partitions.iter().map(|(tp, _)| tp)
    }

    pub fn records(&self, tp: &TopicPartition) -> &[ConsumerRecord] {
        self.partitions
            .iter()
            .find(|(existing, _)| existing == tp)
            .map(|(_, records)| records.as_slice())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsumerRecord> {
        self.partitions.iter().flat_map(|(_, records)| records.iter())
    }

    /// Compact `topic-partition@first..=last` listing, used in diagnostics.
    pub fn summary(&self) -> String {
        let mut out = String::from("[");
        for (i, (tp, records)) in self.partitions.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match (records.first(), records.last()) {
                (Some(first), Some(last)) => {
                    let _ = write!(out, "{}@{}..={}", tp, first.offset, last.offset);
                }
                _ => {
                    let _ = write!(out, "{}@<empty>", tp);
                }
            }
        }
        out.push(']');
        out
    }
}

impl<'a> IntoIterator for &'a ConsumerRecords {
    type Item = &'a ConsumerRecord;
    type IntoIter = Box<dyn Iterator<Item = &'a ConsumerRecord> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(topic: &str, partition: i32, offsets: &[i64]) -> (TopicPartition, Vec<ConsumerRecord>) {
        (
            TopicPartition::new(topic, partition),
            offsets
                .iter()
                .map(|o| ConsumerRecord::new(topic, partition, *o))
                .collect(),
        )
    }

    #[test]
    fn test_iteration_follows_partition_insertion_order() {
        let batch = ConsumerRecords::new([records("t", 1, &[10, 11]), records("t", 0, &[5])]);
        let order: Vec<(i32, i64)> = batch.iter().map(|r| (r.partition, r.offset)).collect();
        assert_eq!(order, vec![(1, 10), (1, 11), (0, 5)]);
        assert_eq!(batch.count(), 3);
    }

    #[test]
    fn test_append_merges_same_partition() {
        let mut batch = ConsumerRecords::new([records("t", 0, &[1])]);
        let (tp, more) = records("t", 0, &[2, 3]);
        batch.append(tp.clone(), more);
        assert_eq!(batch.partitions().count(), 1);
        assert_eq!(batch.records(&tp).len(), 3);
    }

    #[test]
    fn test_summary() {
        let batch = ConsumerRecords::new([records("t", 0, &[0, 1]), records("u", 3, &[])]);
        assert_eq!(batch.summary(), "[t-0@0..=1, u-3@<empty>]");
        assert!(ConsumerRecords::empty().is_empty());
    }
}
