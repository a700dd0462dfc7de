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

//! Migration of XML scan logs into a document store.

mod deduplicator;
mod document;
mod event_correlator;
mod identity_assigner;
mod input_discovery;
mod interim_writer;
mod migration_error;
mod migration_report;
mod raw_event;
mod sink_writer;
mod xml_event_extractor;

pub use self::deduplicator::Deduplicator;
pub use self::document::Document;
pub use self::document::DocumentPart;
pub use self::document::DocumentSerializer;
pub use self::event_correlator::CorrelatedEvent;
pub use self::event_correlator::CorrelationOutcome;
pub use self::event_correlator::CorrelationStatus;
pub use self::event_correlator::EventCorrelator;
pub use self::event_correlator::MatchPolicy;
pub use self::event_correlator::OrphanKind;
pub use self::event_correlator::OrphanWarning;
pub use self::event_correlator::PendingStarts;
pub use self::identity_assigner::EventIdentity;
pub use self::identity_assigner::IdentifiedEvent;
pub use self::identity_assigner::IdentityAssigner;
pub use self::identity_assigner::IdentityGenerator;
pub use self::identity_assigner::IdentityMap;
pub use self::identity_assigner::RandomIdentityGenerator;
pub use self::identity_assigner::SequentialIdentityGenerator;
pub use self::input_discovery::discover_inputs;
pub use self::interim_writer::write_interim_file;
pub use self::migration_error::MigrationError;
pub use self::migration_error::MigrationErrorKind;
pub use self::migration_report::FailedFile;
pub use self::migration_report::MigrationReport;
pub use self::raw_event::AttributeMap;
pub use self::raw_event::EventRole;
pub use self::raw_event::RawEvent;
pub use self::sink_writer::FailedWrite;
pub use self::sink_writer::SinkWriter;
pub use self::sink_writer::WriteSummary;
pub use self::xml_event_extractor::ExtractionRules;
pub use self::xml_event_extractor::XmlEventExtractor;
pub use self::xml_event_extractor::extract_file;

use crate::conf::AppConfig;
use crate::util::CancellationSignal;
use crate::util::LogScopeDuration;
use crate::util::get_timestamp_micros;
use scanlog_dbp::dbp::DatabaseProvider;
use scanlog_dbp::sink::WriteMode;
use scanlog_dbp_mem::InMemoryDatabaseProvider;
use scanlog_dbp_rest::RestDocumentStoreProvider;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/** Migration pipeline.

Every input file goes through extraction, deduplication against everything
seen before in the run, identity assignment and correlation. Once all files
are done, remaining starts are finalized and every correlated event is
written to the store as its own document.
*/
pub struct Migration {
    /// The database provider
    dbp: Arc<DatabaseProvider>,
    /// Destination collection.
    collection: String,
    /// How event elements are found and classified.
    extraction_rules: ExtractionRules,
    /// Extract files on blocking threads before merging them in input order.
    parallel_extraction: bool,
    /// Start and end pairing rules.
    correlator: EventCorrelator,
    /// Projection of correlated events into documents.
    serializer: DocumentSerializer,
    /// Retried and independent document writes.
    sink_writer: SinkWriter,
    /// Optional newline-delimited JSON artifact.
    interim_path: Option<PathBuf>,
    /// Time of application startup in epoch microseconds.
    startup_ts_micros: u64,
}

impl Migration {
    /// Return a new instance writing to the configured backend.
    pub async fn new(app_config: &Arc<AppConfig>) -> Result<Arc<Self>, MigrationError> {
        // Setup persistence from config.
        let dbp = match app_config.backend.implementation() {
            "rest" => {
                let rest_provider = RestDocumentStoreProvider::new(
                    &app_config.backend.endpoints(),
                    app_config.backend.username(),
                    app_config.backend.password(),
                    app_config.app_name_lowercase(),
                    app_config.app_version(),
                )
                .map_err(|e| MigrationErrorKind::Configuration.error_with_msg(e.to_string()))?;
                Arc::new(rest_provider.as_database_provider())
            }
            "mem" => {
                let inmem_provider = InMemoryDatabaseProvider::new().await;
                Arc::new(inmem_provider.as_database_provider())
            }
            unknown_provider => {
                return Err(MigrationErrorKind::Configuration.error_with_msg(format!(
                    "Unknown database provider type '{unknown_provider}'."
                )));
            }
        };
        Self::with_database_provider(app_config, dbp)
    }

    /// Return a new instance writing to the provided store.
    pub fn with_database_provider(
        app_config: &AppConfig,
        dbp: Arc<DatabaseProvider>,
    ) -> Result<Arc<Self>, MigrationError> {
        let write_mode = WriteMode::from_str(app_config.backend.write_mode())
            .map_err(|e| MigrationErrorKind::Configuration.error_with_msg(e.to_string()))?;
        let policy = MatchPolicy::from_str(app_config.correlation.match_policy())?;
        let collection = app_config.backend.collection().to_string();
        let sink_writer = SinkWriter::new(&dbp, &collection, write_mode, &app_config.sink);
        log::info!(
            "Migration will write to collection '{collection}' using {write_mode} mode and {policy:?} start matching."
        );
        Ok(Arc::new(Self {
            dbp,
            collection,
            extraction_rules: ExtractionRules::from(&app_config.extract),
            parallel_extraction: app_config.extract.parallel(),
            correlator: EventCorrelator::new(policy, app_config.correlation.cross_file()),
            serializer: DocumentSerializer::from(&app_config.extract),
            sink_writer,
            interim_path: app_config.interim.path(),
            startup_ts_micros: app_config.startup_ts_micros(),
        }))
    }

    /// The store documents are written to.
    pub fn database_provider(&self) -> &Arc<DatabaseProvider> {
        &self.dbp
    }

    /// Destination collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Extract all files, keeping the input order of the results.
    async fn extract_all(
        &self,
        files: &[PathBuf],
    ) -> Vec<(PathBuf, Result<Vec<RawEvent>, MigrationError>)> {
        if !self.parallel_extraction {
            return files
                .iter()
                .map(|path| (path.to_owned(), extract_file(path, &self.extraction_rules)))
                .collect();
        }
        let handles = files
            .iter()
            .map(|path| {
                let path = path.to_owned();
                let rules = self.extraction_rules.clone();
                tokio::task::spawn_blocking(move || {
                    let result = extract_file(&path, &rules);
                    (path, result)
                })
            })
            .collect::<Vec<_>>();
        let mut results = Vec::with_capacity(handles.len());
        for (handle, path) in handles.into_iter().zip(files) {
            results.push(handle.await.unwrap_or_else(|e| {
                (
                    path.to_owned(),
                    Err(MigrationErrorKind::Unspecified
                        .error_with_msg(format!("Extraction task failed: {e}"))),
                )
            }));
        }
        results
    }

    /// Migrate the events of `files`, processed in the given order.
    ///
    /// A file that cannot be parsed is skipped as a whole and reported.
    /// Document write failures are reported but never abort the run.
    pub async fn run(
        &self,
        files: &[PathBuf],
        generator: Box<dyn IdentityGenerator>,
        cancel: &CancellationSignal,
    ) -> MigrationReport {
        let _scope =
            LogScopeDuration::new(log::Level::Debug, module_path!(), "migration run", 0);
        let mut report = MigrationReport {
            startup_ts_micros: self.startup_ts_micros,
            ..Default::default()
        };
        let mut deduplicator = Deduplicator::new();
        let mut assigner = IdentityAssigner::new(generator, self.extraction_rules.id_attribute());
        let mut pending = PendingStarts::new();
        let mut correlated_events = Vec::new();
        for (path, extraction) in self.extract_all(files).await {
            let raw_events = match extraction {
                Ok(raw_events) => raw_events,
                Err(e) => {
                    log::error!("Skipping '{}': {e}", path.display());
                    report.files_failed.push(FailedFile {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let _file_scope = LogScopeDuration::new(
                log::Level::Debug,
                module_path!(),
                format!("correlating '{}'", path.display()),
                1_000,
            );
            report.files_processed += 1;
            report.events_extracted += raw_events.len() as u64;
            for raw_event in deduplicator.deduplicate(raw_events) {
                let event = assigner.assign(raw_event);
                match self
                    .correlator
                    .correlate(&mut pending, assigner.identity_map(), event)
                {
                    CorrelationOutcome::Pending => {}
                    CorrelationOutcome::Matched(correlated) => correlated_events.push(correlated),
                    CorrelationOutcome::Orphan(correlated, warning) => {
                        report.orphan_warnings.push(warning);
                        correlated_events.push(correlated);
                    }
                }
            }
        }
        for outcome in self.correlator.close(&mut pending) {
            if let CorrelationOutcome::Orphan(correlated, warning) = outcome {
                report.orphan_warnings.push(warning);
                correlated_events.push(correlated);
            }
        }
        report.duplicates_removed = deduplicator.removed_count();
        let mut documents = Vec::with_capacity(correlated_events.len());
        for correlated in &correlated_events {
            let document = self.serializer.to_document(correlated);
            match document.to_json() {
                Ok(json) => documents.push((document.uid, json)),
                Err(e) => {
                    log::error!("{e}");
                    report.failed_writes.push(FailedWrite {
                        identity: document.uid,
                        error: e.to_string(),
                        attempts: 0,
                    });
                }
            }
        }
        report.documents_produced = correlated_events.len() as u64;
        if let Some(interim_path) = &self.interim_path {
            if let Err(e) = write_interim_file(interim_path, &documents) {
                log::error!("{e}");
                report.interim_error = Some(e.to_string());
            }
        }
        let summary = self.sink_writer.write_all(&documents, cancel).await;
        report.documents_written = summary.written;
        report.failed_writes.extend(summary.failed);
        report.cancelled = !summary.not_attempted.is_empty();
        report.not_attempted = summary.not_attempted;
        report.finished_ts_micros = get_timestamp_micros();
        log::info!(
            "Migrated {} of {} files into {} documents ({} written).",
            report.files_processed,
            files.len(),
            report.documents_produced,
            report.documents_written
        );
        report
    }
}
