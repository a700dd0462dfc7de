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

//! Parsing of configuration for start and end event pairing.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

use super::AppConfigDefaults;
use super::key;

/// Configuration of start and end event pairing.
#[derive(Debug, Deserialize, Serialize)]
pub struct CorrelationConfig {
    /// See [Self::match_policy()].
    policy: String,
    /// See [Self::cross_file()].
    crossfile: bool,
}

impl AppConfigDefaults for CorrelationConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(key(prefix, "policy"), "latest")?
            .set_default(key(prefix, "crossfile"), "true")
    }
}

impl CorrelationConfig {
    /// Which of several pending starts with the same original identifier an
    /// end event is matched to: `earliest` or `latest`.
    pub fn match_policy(&self) -> &str {
        &self.policy
    }

    /// Return `true` if an end event may be matched with a start from an
    /// earlier file.
    pub fn cross_file(&self) -> bool {
        self.crossfile
    }
}
