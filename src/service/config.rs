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

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::listener::{BackOff, ContainerProperties, ExponentialBackOff, FixedBackOff};

use super::{AppError, AppResult};

pub const ENV_PREFIX: &str = "STONEMQ_LISTENER";

/// Backoff applied to a failed record, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackOffConfig {
    Fixed {
        #[serde(default)]
        interval_ms: u64,
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
    },
    Exponential {
        initial_interval_ms: u64,
        multiplier: f64,
        max_interval_ms: u64,
        /// No limit when absent.
        max_elapsed_ms: Option<u64>,
    },
}

fn default_max_attempts() -> u32 {
    9
}

impl Default for BackOffConfig {
    fn default() -> Self {
        BackOffConfig::Fixed {
            interval_ms: 0,
            max_attempts: default_max_attempts(),
        }
    }
}

impl BackOffConfig {
    pub fn build(&self) -> Arc<dyn BackOff> {
        match *self {
            BackOffConfig::Fixed {
                interval_ms,
                max_attempts,
            } => Arc::new(FixedBackOff::from_millis(interval_ms, max_attempts)),
            BackOffConfig::Exponential {
                initial_interval_ms,
                multiplier,
                max_interval_ms,
                max_elapsed_ms,
            } => Arc::new(ExponentialBackOff {
                initial_interval: Duration::from_millis(initial_interval_ms),
                multiplier,
                max_interval: Duration::from_millis(max_interval_ms),
                max_elapsed: max_elapsed_ms.map_or(Duration::MAX, Duration::from_millis),
            }),
        }
    }

    fn validate(&self) -> AppResult<()> {
        if let BackOffConfig::Exponential {
            multiplier,
            initial_interval_ms,
            max_interval_ms,
            ..
        } = *self
        {
            if multiplier.is_nan() || multiplier < 1.0 {
                return Err(AppError::InvalidValue(format!(
                    "backoff multiplier must be at least 1.0, got {}",
                    multiplier
                )));
            }
            if max_interval_ms < initial_interval_ms {
                return Err(AppError::InvalidValue(format!(
                    "backoff max_interval_ms {} is below initial_interval_ms {}",
                    max_interval_ms, initial_interval_ms
                )));
            }
        }
        Ok(())
    }
}

/// Behaviour of the failed-batch processor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Rewind partitions so unprocessed records are redelivered.
    pub seek_after_error: bool,
    /// Commit the offset past a record once it has been recovered.
    pub commit_recovered: bool,
    /// Start counting attempts afresh when the recoverer itself fails.
    pub reset_state_on_recovery_failure: bool,
    pub backoff: BackOffConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            seek_after_error: true,
            commit_recovered: true,
            reset_state_on_recovery_failure: true,
            backoff: BackOffConfig::default(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub container: ContainerProperties,
    pub processor: ProcessorConfig,
}

impl ListenerConfig {
    /// Reads the config file at `path`; `STONEMQ_LISTENER__SECTION__KEY` environment
    /// variables override file values.
    pub fn set_up_config<P: AsRef<Path>>(path: P) -> AppResult<ListenerConfig> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            AppError::InvalidValue(format!(
                "config file path: {}",
                path.as_ref().to_string_lossy()
            ))
        })?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path_str))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let listener_config: ListenerConfig = config.try_deserialize()?;
        listener_config.processor.backoff.validate()?;

        Ok(listener_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ListenerConfig::default();
        assert!(config.processor.seek_after_error);
        assert!(config.processor.commit_recovered);
        assert_eq!(
            config.processor.backoff,
            BackOffConfig::Fixed {
                interval_ms: 0,
                max_attempts: 9
            }
        );
        assert_eq!(config.container.sync_commit_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_exponential_multiplier() {
        let backoff = BackOffConfig::Exponential {
            initial_interval_ms: 100,
            multiplier: 0.5,
            max_interval_ms: 1000,
            max_elapsed_ms: None,
        };
        assert!(matches!(backoff.validate(), Err(AppError::InvalidValue(_))));
    }
}
