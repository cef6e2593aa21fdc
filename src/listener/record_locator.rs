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

use crate::message::{ConsumerRecord, ConsumerRecords, RecordId};

use super::FailureReport;

/// A failed record found in the batch, with its position in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located<'a> {
    pub index: usize,
    pub record: &'a ConsumerRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("Record not found in batch, index {index} out of bounds (0, {})", last_index(.count))]
    IndexOutOfBounds { index: usize, count: usize },

    #[error("Record not found in batch: {record}")]
    RecordNotFound { record: RecordId },
}

fn last_index(count: &usize) -> i64 {
    *count as i64 - 1
}

/// Finds the record a failure report refers to.
pub fn locate<'a>(
    batch: &'a ConsumerRecords,
    report: &FailureReport,
) -> Result<Located<'a>, LocateError> {
    match report {
        FailureReport::Index(index) => batch
            .iter()
            .nth(*index)
            .map(|record| Located {
                index: *index,
                record,
            })
            .ok_or(LocateError::IndexOutOfBounds {
                index: *index,
                count: batch.count(),
            }),
        FailureReport::Record(id) => find_record(batch, id).ok_or_else(|| {
            LocateError::RecordNotFound {
                record: id.clone(),
            }
        }),
    }
}

// The returned index is a position in the whole flattened batch, not within the topic.
fn find_record<'a>(batch: &'a ConsumerRecords, id: &RecordId) -> Option<Located<'a>> {
    batch
        .iter()
        .enumerate()
        .find(|(_, record)| {
            record.topic == id.topic()
                && record.partition == id.partition()
                && record.offset == id.offset
        })
        .map(|(index, record)| Located { index, record })
}
