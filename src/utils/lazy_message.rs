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

use std::fmt::{self, Debug, Display, Formatter};

/// A log message that is only built when it is formatted.
///
/// `tracing` formats event arguments only when the event is enabled, so wrapping an
/// expensive diagnostic in `LazyMessage` keeps it from being materialized otherwise.
pub struct LazyMessage<F>(F);

impl<F> LazyMessage<F>
where
    F: Fn() -> String,
{
    pub fn new(supplier: F) -> Self {
        LazyMessage(supplier)
    }
}

impl<F> Display for LazyMessage<F>
where
    F: Fn() -> String,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&(self.0)())
    }
}

impl<F> Debug for LazyMessage<F>
where
    F: Fn() -> String,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
