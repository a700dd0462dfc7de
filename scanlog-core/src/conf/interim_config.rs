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

//! Parsing of configuration for the newline-delimited JSON artifact.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

use super::AppConfigDefaults;
use super::key;

/// Configuration of the optional newline-delimited JSON artifact.
#[derive(Debug, Deserialize, Serialize)]
pub struct InterimConfig {
    /// See [Self::path()].
    path: String,
}

impl AppConfigDefaults for InterimConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder.set_default(key(prefix, "path"), "")
    }
}

impl InterimConfig {
    /// Where to write every document as one JSON line before it is sent to
    /// the store. `None` disables the artifact.
    pub fn path(&self) -> Option<PathBuf> {
        Some(self.path.trim())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }
}
