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

use std::fmt::{Display, Formatter};

use crate::message::{ConsumerRecord, RecordId};
use crate::AppError;

/// Which record of a batch failed, as reported by the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReport {
    /// Position in the flattened batch.
    Index(usize),
    /// Explicit reference to the failed record.
    Record(RecordId),
}

impl Display for FailureReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReport::Index(index) => write!(f, "index {}", index),
            FailureReport::Record(id) => write!(f, "record {}", id),
        }
    }
}

/// Raised by a batch listener to name the record that failed.
#[derive(Debug, thiserror::Error)]
#[error("{message} ({report})")]
pub struct BatchListenerFailed {
    message: String,
    report: FailureReport,
    #[source]
    cause: Option<Box<AppError>>,
}

impl BatchListenerFailed {
    pub fn new(message: impl Into<String>, report: FailureReport) -> Self {
        Self {
            message: message.into(),
            report,
            cause: None,
        }
    }

    pub fn at_index(message: impl Into<String>, index: usize) -> Self {
        Self::new(message, FailureReport::Index(index))
    }

    pub fn for_record(message: impl Into<String>, record: &ConsumerRecord) -> Self {
        Self::new(message, FailureReport::Record(record.id()))
    }

    pub fn with_cause(mut self, cause: AppError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn report(&self) -> &FailureReport {
        &self.report
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }
}
