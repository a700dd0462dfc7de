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

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use clap::Parser;
use clap::ValueEnum;
use scanlog_core::conf::AppConfig;
use scanlog_core::migration::IdentityGenerator;
use scanlog_core::migration::Migration;
use scanlog_core::migration::RandomIdentityGenerator;
use scanlog_core::migration::SequentialIdentityGenerator;
use scanlog_core::migration::discover_inputs;
use scanlog_core::util::CancellationSignal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;

/// Destination store implementation.
#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Ephemeral in-memory store, useful for dry runs.
    Mem,
    /// REST document store.
    Rest,
}

/// Handling of documents that already exist in the store.
#[derive(Clone, Copy, ValueEnum)]
enum CliWriteMode {
    /// Replace the stored document.
    Overwrite,
    /// Fail the write of this document.
    Reject,
}

/// Start to pair an end with when several starts share an identifier.
#[derive(Clone, Copy, ValueEnum)]
enum CliMatchPolicy {
    /// The first start.
    Earliest,
    /// The most recent start.
    Latest,
}

/// Command line arguments.
#[derive(Parser)]
#[command(name = "scanlog", version)]
#[command(about = "Migrate XML scan logs into a document store")]
struct Cli {
    /// XML scan log files or directories holding them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Destination store implementation
    #[arg(long)]
    backend: Option<Backend>,

    /// Base URL of the REST document store (repeatable)
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,

    /// Destination collection
    #[arg(long)]
    collection: Option<String>,

    /// Document store username
    #[arg(long)]
    username: Option<String>,

    /// Document store password
    #[arg(long)]
    password: Option<String>,

    /// Handling of documents that already exist
    #[arg(long)]
    write_mode: Option<CliWriteMode>,

    /// Also write every document as a JSON line to this file
    #[arg(long)]
    interim: Option<PathBuf>,

    /// Start to pair an end with when several starts share an identifier
    #[arg(long)]
    match_policy: Option<CliMatchPolicy>,

    /// Use predictable identities instead of random ones
    #[arg(long)]
    sequential_ids: bool,
}

impl Cli {
    /// Configuration overrides in the form `("section.key", "value")`.
    fn config_overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(backend) = self.backend {
            let value = match backend {
                Backend::Mem => "mem",
                Backend::Rest => "rest",
            };
            overrides.push(("backend.implementation", value.to_string()));
        }
        if !self.endpoints.is_empty() {
            overrides.push(("backend.endpoints", self.endpoints.join(",")));
        }
        if let Some(collection) = &self.collection {
            overrides.push(("backend.collection", collection.to_owned()));
        }
        if let Some(username) = &self.username {
            overrides.push(("backend.username", username.to_owned()));
        }
        if let Some(password) = &self.password {
            overrides.push(("backend.password", password.to_owned()));
        }
        if let Some(write_mode) = self.write_mode {
            let value = match write_mode {
                CliWriteMode::Overwrite => "overwrite",
                CliWriteMode::Reject => "reject",
            };
            overrides.push(("backend.writemode", value.to_string()));
        }
        if let Some(interim) = &self.interim {
            overrides.push(("interim.path", interim.display().to_string()));
        }
        if let Some(match_policy) = self.match_policy {
            let value = match match_policy {
                CliMatchPolicy::Earliest => "earliest",
                CliMatchPolicy::Latest => "latest",
            };
            overrides.push(("correlation.policy", value.to_string()));
        }
        overrides
    }
}

/// Application main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let startup_ts_micros = scanlog_core::util::get_timestamp_micros();
    if let Err(e) = init_logger() {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::FAILURE;
    }
    let overrides = cli.config_overrides();
    let app_config = match AppConfig::new(env!("CARGO_PKG_NAME"), startup_ts_micros, &overrides) {
        Ok(app_config) => Arc::new(app_config),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run_async(app_config, cli)),
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the logging system and apply filters.
fn init_logger() -> Result<(), log::SetLoggerError> {
    env_logger::builder()
        // Set default log level
        .filter_level(log::LevelFilter::Info)
        // Customize logging for dependencies
        .filter(Some("reqwest"), log::LevelFilter::Info)
        .filter(Some("hyper_util"), log::LevelFilter::Info)
        .filter(Some("rustls::client"), log::LevelFilter::Info)
        .filter(
            Some("scanlog_core::migration::xml_event_extractor"),
            log::LevelFilter::Info,
        )
        .filter(Some("scanlog_dbp_rest"), log::LevelFilter::Info)
        .write_style(env_logger::fmt::WriteStyle::Auto)
        .target(env_logger::fmt::Target::Stderr)
        .is_test(false)
        .parse_env(
            env_logger::Env::new()
                .filter("LOG_LEVEL")
                .write_style("LOG_STYLE"),
        )
        .try_init()
}

/// Async code entry point.
async fn run_async(app_config: Arc<AppConfig>, cli: Cli) -> ExitCode {
    let files = match discover_inputs(&cli.inputs) {
        Ok(files) if files.is_empty() => {
            eprintln!("No XML scan logs found in {:?}.", cli.inputs);
            return ExitCode::FAILURE;
        }
        Ok(files) => files,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let migration = match Migration::new(&app_config).await {
        Ok(migration) => migration,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let cancel = CancellationSignal::new();
    let signal_task = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::select! {
                _ = block_until_signaled() => {
                    log::warn!("Stopping after the documents already being written.");
                    cancel.signal();
                },
                _ = cancel.wait_for_signal() => {},
            }
        })
    };
    let generator: Box<dyn IdentityGenerator> = if cli.sequential_ids {
        Box::new(SequentialIdentityGenerator::default())
    } else {
        Box::new(RandomIdentityGenerator)
    };
    let report = migration.run(&files, generator, &cancel).await;
    // Release the signal listener.
    cancel.signal();
    let _ = signal_task.await;
    eprint!("{report}");
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Block until SIGTERM or SIGINT is received.
async fn block_until_signaled() {
    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        log::warn!("Unable to listen for signals. Graceful stop is not available.");
        return std::future::pending().await;
    };
    tokio::select! {
        _ = sigterm.recv() => {
            log::debug!("SIGTERM received.")
        },
        _ = sigint.recv() => {
            log::debug!("SIGINT received.")
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_become_overrides() {
        let cli = Cli::try_parse_from([
            "scanlog",
            "--backend",
            "rest",
            "--endpoint",
            "http://a:9200",
            "--endpoint",
            "http://b:9200",
            "--write-mode",
            "reject",
            "--match-policy",
            "earliest",
            "logs/",
        ])
        .unwrap();
        let overrides = cli.config_overrides();
        assert!(overrides.contains(&("backend.implementation", "rest".to_string())));
        assert!(overrides.contains(&("backend.endpoints", "http://a:9200,http://b:9200".to_string())));
        assert!(overrides.contains(&("backend.writemode", "reject".to_string())));
        assert!(overrides.contains(&("correlation.policy", "earliest".to_string())));
        assert_eq!(cli.inputs, vec![PathBuf::from("logs/")]);
    }

    #[test]
    fn test_inputs_are_required() {
        assert!(Cli::try_parse_from(["scanlog"]).is_err());
        let cli = Cli::try_parse_from(["scanlog", "a.xml"]).unwrap();
        assert!(cli.config_overrides().is_empty());
    }
}
