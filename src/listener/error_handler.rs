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

use tracing::{debug, warn};

use crate::message::{ConsumerRecord, ConsumerRecords};
use crate::{AppError, AppResult};

use super::{Consumer, ContainerProperties};

/// Invoked with a record whose retries are exhausted, typically to skip it or
/// publish it to a dead-letter topic.
pub trait ConsumerRecordRecoverer: Send + Sync {
    fn accept(&self, record: &ConsumerRecord, error: &AppError) -> AppResult<()>;
}

impl<F> ConsumerRecordRecoverer for F
where
    F: Fn(&ConsumerRecord, &AppError) -> AppResult<()> + Send + Sync,
{
    fn accept(&self, record: &ConsumerRecord, error: &AppError) -> AppResult<()> {
        self(record, error)
    }
}

/// Handles a failed batch as a whole. Used as the fallback when the failed record
/// cannot be dealt with individually; whatever it returns is passed to the container.
pub trait CommonErrorHandler: Send + Sync {
    fn handle_batch(
        &self,
        thrown: &AppError,
        data: &ConsumerRecords,
        consumer: &mut dyn Consumer,
        container: &ContainerProperties,
        invoke_listener: &dyn Fn(),
    ) -> AppResult<()>;
}

impl<F> CommonErrorHandler for F
where
    F: Fn(&AppError, &ConsumerRecords, &mut dyn Consumer, &ContainerProperties, &dyn Fn()) -> AppResult<()>
        + Send
        + Sync,
{
    fn handle_batch(
        &self,
        thrown: &AppError,
        data: &ConsumerRecords,
        consumer: &mut dyn Consumer,
        container: &ContainerProperties,
        invoke_listener: &dyn Fn(),
    ) -> AppResult<()> {
        self(thrown, data, consumer, container, invoke_listener)
    }
}

/// Observer of retry progress. All methods default to doing nothing.
pub trait RetryListener: Send + Sync {
    fn failed_delivery(&self, _record: &ConsumerRecord, _error: &AppError, _attempt: u32) {}

    fn recovered(&self, _record: &ConsumerRecord, _error: &AppError) {}

    fn recovery_failed(&self, _record: &ConsumerRecord, _original: &AppError, _failure: &AppError) {}
}

/// Fallback that rewinds every partition of the batch to its first record, so the
/// next poll delivers the whole batch again.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekToBatchStart {
    /// Return `Ok` after seeking instead of reporting the failure to the container.
    pub swallow: bool,
}

impl CommonErrorHandler for SeekToBatchStart {
    fn handle_batch(
        &self,
        thrown: &AppError,
        data: &ConsumerRecords,
        consumer: &mut dyn Consumer,
        container: &ContainerProperties,
        _invoke_listener: &dyn Fn(),
    ) -> AppResult<()> {
        for tp in data.partitions() {
            if let Some(first) = data.records(tp).first() {
                debug!(partition = %tp, offset = first.offset, "seeking to start of failed batch");
                consumer.seek(tp, first.offset);
            }
        }
        warn!(
            topics = %container.topics_label(),
            records = data.count(),
            "batch will be redelivered: {}",
            thrown
        );
        if self.swallow {
            Ok(())
        } else {
            Err(AppError::IllegalState(format!("fallback: {}", thrown)))
        }
    }
}
