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

//! Parsing of configuration for the destination document store.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

use super::AppConfigDefaults;
use super::key;
use super::split_list;

/// Configuration for the destination document store.
#[derive(Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend implementation
    implementation: String,
    /// Comma separated list of store base URLs.
    endpoints: String,
    /// Store username
    username: String,
    /// Store password
    password: String,
    /// Logical collection all documents are written to.
    collection: String,
    /// `overwrite` or `reject` existing documents with the same identity.
    writemode: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("implementation", &self.implementation)
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("password", &"*redacted*")
            .field("collection", &self.collection)
            .field("writemode", &self.writemode)
            .finish()
    }
}

impl AppConfigDefaults for BackendConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(key(prefix, "implementation"), "mem")?
            .set_default(key(prefix, "endpoints"), "")?
            .set_default(key(prefix, "username"), "")?
            .set_default(key(prefix, "password"), "")?
            .set_default(key(prefix, "collection"), "scanlog")?
            .set_default(key(prefix, "writemode"), "overwrite")
    }
}

impl BackendConfig {
    /// Backend implementation variant
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Comma separated list of base URLs.
    pub fn endpoints(&self) -> Vec<String> {
        split_list(&self.endpoints)
    }

    /// Store username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Store password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Logical collection all documents are written to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Write mode for documents that already exist.
    pub fn write_mode(&self) -> &str {
        &self.writemode
    }
}
