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

use std::error::Error as _;
use std::time::Duration;

use crate::listener::{BatchListenerFailed, CommitError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// general errors
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("config file error: {0}")]
    ConfigFileError(#[from] config::ConfigError),

    /// listener errors
    #[error("listener failed: {message}")]
    ListenerExecutionFailed {
        message: String,
        #[source]
        source: Box<AppError>,
    },

    #[error(transparent)]
    BatchListenerFailed(Box<BatchListenerFailed>),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Control-flow signal for the container: redeliver the batch after `delay`.
    /// The message is matched on by callers and must not change.
    #[error("Record in retry and not yet recovered")]
    RecordInRetry {
        delay: Duration,
        #[source]
        source: Option<Box<AppError>>,
    },

    #[error("recovery failed for {record}: {message}")]
    RecoveryFailed { record: String, message: String },

    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),
}

impl AppError {
    pub fn record_in_retry(delay: Duration) -> Self {
        AppError::RecordInRetry {
            delay,
            source: None,
        }
    }

    pub fn record_in_retry_caused_by(delay: Duration, cause: AppError) -> Self {
        AppError::RecordInRetry {
            delay,
            source: Some(Box::new(cause)),
        }
    }

    pub fn is_record_in_retry(&self) -> bool {
        matches!(self, AppError::RecordInRetry { .. })
    }

    /// Walks the source chain looking for the failure raised by a batch listener.
    pub fn batch_listener_failed(&self) -> Option<&BatchListenerFailed> {
        let mut current: Option<&AppError> = Some(self);
        while let Some(err) = current {
            match err {
                AppError::BatchListenerFailed(failed) => return Some(failed),
                AppError::ListenerExecutionFailed { source, .. } => current = Some(source),
                _ => {
                    current = err.source().and_then(|s| {
                        s.downcast_ref::<AppError>()
                            .or_else(|| s.downcast_ref::<Box<AppError>>().map(|b| b.as_ref()))
                    })
                }
            }
        }
        None
    }
}

impl From<BatchListenerFailed> for AppError {
    fn from(value: BatchListenerFailed) -> Self {
        AppError::BatchListenerFailed(Box::new(value))
    }
}
