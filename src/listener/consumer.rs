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

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::{CommitOffsets, TopicPartition};

/// Errors a consumer client can report for a synchronous commit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("rebalance in progress: {0}")]
    RebalanceInProgress(String),

    #[error("commit cannot be completed, group has rebalanced: {0}")]
    CommitFailed(String),

    #[error("commit timed out: {0}")]
    Timeout(String),

    #[error("consumer fenced: {0}")]
    Fenced(String),

    #[error("commit error: {0}")]
    Other(String),
}

impl CommitError {
    /// A rebalance racing with the commit; the commit may succeed once the
    /// group settles, so the batch is redelivered rather than given up on.
    pub fn is_rebalance_in_progress(&self) -> bool {
        matches!(self, CommitError::RebalanceInProgress(_))
    }
}

/// The consumer operations failed-batch handling needs.
pub trait Consumer {
    fn commit_sync(&mut self, offsets: &CommitOffsets, timeout: Duration) -> Result<(), CommitError>;

    /// Positions the next fetch of `tp` at `offset`.
    fn seek(&mut self, tp: &TopicPartition, offset: i64);
}

/// Container settings visible to error handlers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContainerProperties {
    pub topics: Vec<String>,
    pub group_id: Option<String>,
    pub sync_commit_timeout_ms: u64,
    /// Attached to every offset committed by the error handler.
    pub commit_metadata: Option<String>,
}

impl Default for ContainerProperties {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            group_id: None,
            sync_commit_timeout_ms: 60_000,
            commit_metadata: None,
        }
    }
}

impl ContainerProperties {
    pub fn new<T: Into<String>>(topics: impl IntoIterator<Item = T>) -> Self {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn sync_commit_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_commit_timeout_ms)
    }

    pub fn topics_label(&self) -> String {
        self.topics.join(",")
    }
}
