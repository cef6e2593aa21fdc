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

use super::{ConsumerRecord, TopicPartition};

/// Commit payload for one partition. `offset` is the next offset to consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetAndMetadata {
    pub offset: i64,
    pub metadata: String,
}

impl OffsetAndMetadata {
    pub fn new(offset: i64, metadata: Option<&str>) -> Self {
        Self {
            offset,
            metadata: metadata.unwrap_or_default().to_string(),
        }
    }
}

pub type CommitOffsets = HashMap<TopicPartition, OffsetAndMetadata>;

/// Offsets that commit everything up to and including the given records; the highest
/// offset per partition wins.
pub fn offsets_past<'a>(
    records: impl IntoIterator<Item = &'a ConsumerRecord>,
    metadata: Option<&str>,
) -> CommitOffsets {
    let mut offsets = CommitOffsets::new();
    for record in records {
        let next = record.offset + 1;
        offsets
            .entry(record.topic_partition())
            .and_modify(|existing: &mut OffsetAndMetadata| {
                if next > existing.offset {
                    existing.offset = next;
                }
            })
            .or_insert_with(|| OffsetAndMetadata::new(next, metadata));
    }
    offsets
}
