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

//! Parsing of configuration for XML event extraction.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

use super::AppConfigDefaults;
use super::key;
use super::split_list;

/// Configuration of how events are read from the XML scan logs.
#[derive(Debug, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// Tag of event elements. Empty means every child of the root element.
    eventtag: String,
    /// Attribute holding the source-provided identifier.
    idattribute: String,
    /// Attribute holding an explicit start or end role.
    roleattribute: String,
    /// Optional attribute where end events reference their start.
    refattribute: String,
    /// Comma separated role values that mark a start event.
    startvalues: String,
    /// Comma separated role values that mark an end event.
    endvalues: String,
    /// Child element marking the start of a compound scan record.
    startmarker: String,
    /// Child element marking the end of a compound scan record.
    endmarker: String,
    /// Extract files on parallel blocking threads.
    parallel: bool,
}

impl AppConfigDefaults for ExtractConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(key(prefix, "eventtag"), "")?
            .set_default(key(prefix, "idattribute"), "id")?
            .set_default(key(prefix, "roleattribute"), "role")?
            .set_default(key(prefix, "refattribute"), "")?
            .set_default(key(prefix, "startvalues"), "start,started,begin")?
            .set_default(key(prefix, "endvalues"), "end,ended,stop,stopped")?
            .set_default(key(prefix, "startmarker"), "started")?
            .set_default(key(prefix, "endmarker"), "ended")?
            .set_default(key(prefix, "parallel"), "false")
    }
}

impl ExtractConfig {
    /// Tag of event elements or `None` if all children of the root are events.
    pub fn event_tag(&self) -> Option<&str> {
        Some(self.eventtag.trim()).filter(|tag| !tag.is_empty())
    }

    /// Attribute holding the source-provided identifier.
    pub fn id_attribute(&self) -> &str {
        &self.idattribute
    }

    /// Attribute holding an explicit start or end role.
    pub fn role_attribute(&self) -> &str {
        &self.roleattribute
    }

    /// Attribute where end events reference their start, if configured.
    pub fn reference_attribute(&self) -> Option<&str> {
        Some(self.refattribute.trim()).filter(|attr| !attr.is_empty())
    }

    /// Role values that mark a start event.
    pub fn start_values(&self) -> Vec<String> {
        split_list(&self.startvalues)
    }

    /// Role values that mark an end event.
    pub fn end_values(&self) -> Vec<String> {
        split_list(&self.endvalues)
    }

    /// Child element marking the start of a compound scan record.
    pub fn start_marker(&self) -> &str {
        &self.startmarker
    }

    /// Child element marking the end of a compound scan record.
    pub fn end_marker(&self) -> &str {
        &self.endmarker
    }

    /// Return `true` if files should be extracted in parallel.
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}
