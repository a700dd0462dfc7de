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

//! Parsing of application configuration.

mod backend_config;
mod correlation_config;
mod extract_config;
mod interim_config;
mod sink_config;

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

pub use self::backend_config::BackendConfig;
pub use self::correlation_config::CorrelationConfig;
pub use self::extract_config::ExtractConfig;
pub use self::interim_config::InterimConfig;
pub use self::sink_config::SinkConfig;
use crate::migration::MigrationError;
use crate::migration::MigrationErrorKind;

/// Package version reported by Cargo at build time.
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static trait for tracking implementations.
trait AppConfigDefaults {
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError>;
}

/// Join a section prefix and a key into a configuration path.
fn key(prefix: &str, name: &str) -> String {
    prefix.to_string() + "." + name
}

/// Split a comma separated configuration value into trimmed, non-empty items.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/**
Application configration root.

The application name defaults to the Rust package name, but can be overridden
with the environment variable `APP_NAME`.

Configuration will be loaded from

1. the file `{application name}.json` in the current working directory.
2. environment variable overrides in the form
   `{APPLICATION_NAME}_SECTION_CONFIGKEYWITHOUTSPACES`
3. explicit overrides, like command line arguments, in the form
   `("section.configkey", "value")`.
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// Configuration of how events are read from the XML scan logs.
    pub extract: ExtractConfig,
    /// Configuration of start and end event pairing.
    pub correlation: CorrelationConfig,
    /// Configuration for the destination document store.
    pub backend: BackendConfig,
    /// Configuration of document writes.
    pub sink: SinkConfig,
    /// Configuration of the optional newline-delimited JSON artifact.
    pub interim: InterimConfig,

    /// Lower case application name. Ignored when loading configuration.
    #[serde(skip_deserializing)]
    app_name: String,
    /// Time of application startup in epoch microseconds
    #[serde(skip_deserializing)]
    startup_ts_micros: u64,
}

impl AppConfig {
    /// The application name defaults to the Rust package name, but can be
    /// overridden with the environment variable `APP_NAME`.
    fn read_app_name_lowercase(cargo_pkg_name: &str) -> String {
        std::env::var("APP_NAME")
            .map_err(|e| {
                log::debug!(
                    "Environment variable APP_NAME: {e:?} -> Default app name '{cargo_pkg_name}' will be used."
                );
            })
            .ok()
            .map(|value| value.to_lowercase())
            .unwrap_or(cargo_pkg_name.to_owned())
    }

    /// Lower case application name.
    pub fn app_name_lowercase(&self) -> &str {
        &self.app_name
    }

    /// SemVer application version derived fromt the Rust package version.
    pub fn app_version(&self) -> &'static str {
        CARGO_PKG_VERSION
    }

    /// Time of application startup in epoch microseconds
    pub fn startup_ts_micros(&self) -> u64 {
        self.startup_ts_micros
    }

    /** Creates a new instance pre-populated with defaults, an optional
    configurations file, environment variable overrides and finally the
    provided `overrides`.

    Use `env!("CARGO_PKG_NAME")` as `cargo_pkg_name`.
    */
    pub fn new(
        cargo_pkg_name: &str,
        startup_ts_micros: u64,
        overrides: &[(&str, String)],
    ) -> Result<Self, MigrationError> {
        Self::build(cargo_pkg_name, startup_ts_micros, overrides).map_err(|e| {
            MigrationErrorKind::Configuration.error_with_msg(format!("Invalid configuration: {e}"))
        })
    }

    fn build(
        cargo_pkg_name: &str,
        startup_ts_micros: u64,
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        let app_name = Self::read_app_name_lowercase(cargo_pkg_name);
        let config_filename = app_name.to_owned() + ".json";
        let config_env_prefix = &app_name.to_uppercase();
        let mut config_builder = Config::builder();
        config_builder = ExtractConfig::set_defaults(config_builder, "extract")?;
        config_builder = CorrelationConfig::set_defaults(config_builder, "correlation")?;
        config_builder = BackendConfig::set_defaults(config_builder, "backend")?;
        config_builder = SinkConfig::set_defaults(config_builder, "sink")?;
        config_builder = InterimConfig::set_defaults(config_builder, "interim")?;
        let conf_file = std::env::current_dir()
            .map_err(|e| ConfigError::Message(format!("No working directory: {e}")))?
            .join(config_filename);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Will load '{}' configuration if present.",
                conf_file.display()
            );
        }
        config_builder = config_builder
            .add_source(File::from(conf_file).required(false))
            .add_source(
                Environment::with_prefix(config_env_prefix)
                    .separator("_")
                    .list_separator(","),
            );
        for (path, value) in overrides {
            config_builder = config_builder.set_override(*path, value.as_str())?;
        }
        let mut app_config: AppConfig = config_builder.build()?.try_deserialize()?;
        app_config.app_name = app_name;
        app_config.startup_ts_micros = startup_ts_micros;
        log::info!("Running with configuration: {app_config:?}");
        Ok(app_config)
    }
}
