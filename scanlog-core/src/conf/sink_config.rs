/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Parsing of configuration for document writes.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

use super::AppConfigDefaults;
use super::key;

/// Configuration of document writes.
#[derive(Debug, Deserialize, Serialize)]
pub struct SinkConfig {
    /// See [Self::max_retries()].
    retries: u32,
    /// See [Self::retry_backoff_millis()].
    backoffmillis: u64,
    /// See [Self::concurrency()].
    concurrency: usize,
}

impl AppConfigDefaults for SinkConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(key(prefix, "retries"), "3")?
            .set_default(key(prefix, "backoffmillis"), "250")?
            .set_default(key(prefix, "concurrency"), "1")
    }
}

impl SinkConfig {
    /// Number of times a transiently failed write is retried.
    pub fn max_retries(&self) -> u32 {
        self.retries
    }

    /// Delay before the first retry. Doubled for each following retry.
    pub fn retry_backoff_millis(&self) -> u64 {
        self.backoffmillis
    }

    /// Number of concurrent document writes. At least one.
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
