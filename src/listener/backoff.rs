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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOffAction {
    /// Redeliver after waiting this long.
    Delay(Duration),
    /// Give up retrying; the record is to be recovered.
    Stop,
}

/// Retry policy for a failed record.
///
/// `attempt` is the number of failures seen so far for the record, starting at 1;
/// `elapsed` is the time since its first failure.
pub trait BackOff: Send + Sync {
    fn next_action(&self, attempt: u32, elapsed: Duration) -> BackOffAction;
}

impl<F> BackOff for F
where
    F: Fn(u32, Duration) -> BackOffAction + Send + Sync,
{
    fn next_action(&self, attempt: u32, elapsed: Duration) -> BackOffAction {
        self(attempt, elapsed)
    }
}

/// Same delay for up to `max_attempts` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackOff {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl FixedBackOff {
    pub const UNLIMITED_ATTEMPTS: u32 = u32::MAX;

    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_millis(interval_ms: u64, max_attempts: u32) -> Self {
        Self::new(Duration::from_millis(interval_ms), max_attempts)
    }
}

impl Default for FixedBackOff {
    fn default() -> Self {
        Self::from_millis(0, 9)
    }
}

impl BackOff for FixedBackOff {
    fn next_action(&self, attempt: u32, _elapsed: Duration) -> BackOffAction {
        if attempt <= self.max_attempts {
            BackOffAction::Delay(self.interval)
        } else {
            BackOffAction::Stop
        }
    }
}

/// Delay grows by `multiplier` per attempt, capped at `max_interval`. Stops once
/// the next delay would take the time since the first failure past `max_elapsed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackOff {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for ExponentialBackOff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(2_000),
            multiplier: 1.5,
            max_interval: Duration::from_millis(30_000),
            max_elapsed: Duration::MAX,
        }
    }
}

impl ExponentialBackOff {
    fn interval_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_interval.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

impl BackOff for ExponentialBackOff {
    fn next_action(&self, attempt: u32, elapsed: Duration) -> BackOffAction {
        let delay = self.interval_for(attempt);
        if elapsed.saturating_add(delay) > self.max_elapsed {
            return BackOffAction::Stop;
        }
        BackOffAction::Delay(delay)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 1, BackOffAction::Stop)]
    #[case(2, 1, BackOffAction::Delay(Duration::from_millis(2)))]
    #[case(2, 2, BackOffAction::Delay(Duration::from_millis(2)))]
    #[case(2, 3, BackOffAction::Stop)]
    fn test_fixed_back_off(
        #[case] max_attempts: u32,
        #[case] attempt: u32,
        #[case] expected: BackOffAction,
    ) {
        let back_off = FixedBackOff::from_millis(2, max_attempts);
        assert_eq!(back_off.next_action(attempt, Duration::ZERO), expected);
    }

    #[test]
    fn test_exponential_back_off_caps_interval() {
        let back_off = ExponentialBackOff {
            initial_interval: Duration::from_millis(100),
            multiplier: 2.0,
            max_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(10),
        };
        let delays: Vec<BackOffAction> = (1..=5)
            .map(|attempt| back_off.next_action(attempt, Duration::ZERO))
            .collect();
        assert_eq!(
            delays,
            [100, 200, 400, 500, 500]
                .into_iter()
                .map(|ms| BackOffAction::Delay(Duration::from_millis(ms)))
                .collect::<Vec<_>>()
        );
        assert_eq!(
            back_off.next_action(6, Duration::from_secs(10)),
            BackOffAction::Stop
        );
    }

    #[rstest]
    #[case(9_400, BackOffAction::Delay(Duration::from_millis(500)))]
    #[case(9_500, BackOffAction::Delay(Duration::from_millis(500)))]
    #[case(9_600, BackOffAction::Stop)]
    fn test_exponential_back_off_stops_before_max_elapsed(
        #[case] elapsed_ms: u64,
        #[case] expected: BackOffAction,
    ) {
        let back_off = ExponentialBackOff {
            initial_interval: Duration::from_millis(100),
            multiplier: 2.0,
            max_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(10),
        };
        assert_eq!(
            back_off.next_action(6, Duration::from_millis(elapsed_ms)),
            expected
        );
    }

    #[test]
    fn test_unbounded_exponential_back_off_never_stops() {
        let back_off = ExponentialBackOff::default();
        assert_eq!(
            back_off.next_action(u32::MAX, Duration::from_secs(365 * 24 * 3600)),
            BackOffAction::Delay(Duration::from_millis(30_000))
        );
    }

    #[test]
    fn test_closure_back_off() {
        let back_off = |attempt: u32, _: Duration| {
            if attempt < 2 {
                BackOffAction::Delay(Duration::from_millis(1))
            } else {
                BackOffAction::Stop
            }
        };
        assert!(matches!(back_off.next_action(1, Duration::ZERO), BackOffAction::Delay(_)));
        assert_eq!(back_off.next_action(2, Duration::ZERO), BackOffAction::Stop);
    }
}
