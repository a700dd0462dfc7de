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

//! Independent, retried writes of documents to the destination store.

use futures::StreamExt;
use scanlog_dbp::dbp::DatabaseProvider;
use scanlog_dbp::dbp::facades::DatabaseProviderFacades;
use scanlog_dbp::sink::SinkError;
use scanlog_dbp::sink::SinkErrorKind;
use scanlog_dbp::sink::WriteMode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::EventIdentity;
use crate::conf::SinkConfig;
use crate::util::CancellationSignal;

/// A document that could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct FailedWrite {
    /// Identity of the document.
    pub identity: EventIdentity,
    /// Last error reported by the store.
    pub error: String,
    /// Number of write attempts made.
    pub attempts: u32,
}

/// Outcome of writing a batch of documents.
#[derive(Debug, Default)]
pub struct WriteSummary {
    /// Number of documents persisted.
    pub written: u64,
    /// Documents that failed to be written.
    pub failed: Vec<FailedWrite>,
    /// Documents skipped because the run was cancelled.
    pub not_attempted: Vec<EventIdentity>,
}

enum WriteOutcome {
    Written,
    Failed(FailedWrite),
    NotAttempted(EventIdentity),
}

/** Writes each document on its own.

Transient failures are retried with exponential backoff. Other failures are
recorded and the remaining documents are still written.
*/
pub struct SinkWriter {
    dbp: Arc<DatabaseProvider>,
    collection: String,
    write_mode: WriteMode,
    max_retries: u32,
    retry_backoff_millis: u64,
    concurrency: usize,
}

impl SinkWriter {
    /// Return a new instance.
    pub fn new(
        dbp: &Arc<DatabaseProvider>,
        collection: &str,
        write_mode: WriteMode,
        sink_config: &SinkConfig,
    ) -> Self {
        Self {
            dbp: Arc::clone(dbp),
            collection: collection.to_string(),
            write_mode,
            max_retries: sink_config.max_retries(),
            retry_backoff_millis: sink_config.retry_backoff_millis(),
            concurrency: sink_config.concurrency(),
        }
    }

    /// Return a new instance with explicit retry settings.
    pub fn with_retries(mut self, max_retries: u32, retry_backoff_millis: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_millis = retry_backoff_millis;
        self
    }

    /// Persist one document, retrying transient failures.
    ///
    /// In [WriteMode::Reject], a duplicate key reported after a transient
    /// failure means an earlier attempt reached the store and counts as
    /// written. Identities are unique to the run.
    ///
    /// Return the number of attempts on success.
    async fn write_one(
        &self,
        identity: &EventIdentity,
        document: &str,
    ) -> Result<u32, (SinkError, u32)> {
        let uid = identity.to_string();
        let mut attempt = 0;
        let mut had_transient_failure = false;
        loop {
            attempt += 1;
            match self
                .dbp
                .document_facade()
                .document_persist(&self.collection, &uid, document, self.write_mode)
                .await
            {
                Ok(()) => return Ok(attempt),
                Err(e)
                    if had_transient_failure
                        && self.write_mode == WriteMode::Reject
                        && e.kind() == &SinkErrorKind::DuplicateKey =>
                {
                    log::info!(
                        "Document {uid} already exists after a failed attempt (attempt {attempt}). Counting it as written."
                    );
                    return Ok(attempt);
                }
                Err(e) if e.is_transient() && attempt <= self.max_retries => {
                    had_transient_failure = true;
                    let delay_millis = self
                        .retry_backoff_millis
                        .saturating_mul(2u64.saturating_pow(attempt - 1));
                    log::warn!(
                        "Write of document {uid} failed (attempt {attempt}): {e}. Retrying in {delay_millis} ms."
                    );
                    tokio::time::sleep(Duration::from_millis(delay_millis)).await;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    /// Write all documents and collect the outcome in document order.
    ///
    /// Once `cancel` is signaled no further writes are started.
    pub async fn write_all(
        &self,
        documents: &[(EventIdentity, String)],
        cancel: &CancellationSignal,
    ) -> WriteSummary {
        let outcomes = futures::stream::iter(documents.iter().map(|(identity, document)| async move {
            if cancel.is_signaled() {
                return WriteOutcome::NotAttempted(*identity);
            }
            match self.write_one(identity, document).await {
                Ok(attempts) => {
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("Wrote document {identity} after {attempts} attempt(s).");
                    }
                    WriteOutcome::Written
                }
                Err((e, attempts)) => {
                    log::error!("Giving up on document {identity} after {attempts} attempt(s): {e}");
                    WriteOutcome::Failed(FailedWrite {
                        identity: *identity,
                        error: e.to_string(),
                        attempts,
                    })
                }
            }
        }))
        .buffered(self.concurrency)
        .collect::<Vec<_>>()
        .await;
        let mut summary = WriteSummary::default();
        for outcome in outcomes {
            match outcome {
                WriteOutcome::Written => summary.written += 1,
                WriteOutcome::Failed(failed) => summary.failed.push(failed),
                WriteOutcome::NotAttempted(identity) => summary.not_attempted.push(identity),
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlog_dbp::dbp::facades::DocumentFacade;
    use scanlog_dbp_mem::InMemoryDatabaseProvider;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Fails the first `transient_failures` writes of every document and
    /// always rejects documents listed in `rejected`.
    struct FlakyStore {
        transient_failures: u32,
        rejected: Vec<String>,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl DocumentFacade for FlakyStore {
        async fn document_persist(
            &self,
            _collection: &str,
            uid: &str,
            _document: &str,
            _write_mode: WriteMode,
        ) -> Result<(), SinkError> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                attempts.push(uid.to_string());
                attempts.iter().filter(|attempted| *attempted == uid).count() as u32
            };
            if self.rejected.iter().any(|rejected| rejected == uid) {
                return Err(SinkErrorKind::Rejected.error_with_msg("bad document"));
            }
            if attempt <= self.transient_failures {
                return Err(SinkErrorKind::Transient.error_with_msg("try again"));
            }
            Ok(())
        }

        async fn document_by_uid(&self, _: &str, _: &str) -> Result<Option<String>, SinkError> {
            Ok(None)
        }

        async fn document_count(&self, _: &str) -> Result<u64, SinkError> {
            Ok(0)
        }
    }

    impl DatabaseProviderFacades for FlakyStore {
        fn document_facade(&self) -> &dyn DocumentFacade {
            self
        }
    }

    /// Persists every document but reports the first write of each as a
    /// timeout, like a store whose acknowledgement got lost.
    struct LostAcknowledgementStore {
        inner: DatabaseProvider,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl DocumentFacade for LostAcknowledgementStore {
        async fn document_persist(
            &self,
            collection: &str,
            uid: &str,
            document: &str,
            write_mode: WriteMode,
        ) -> Result<(), SinkError> {
            let first_attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let first_attempt = !attempts.iter().any(|attempted| attempted == uid);
                attempts.push(uid.to_string());
                first_attempt
            };
            self.inner
                .document_facade()
                .document_persist(collection, uid, document, write_mode)
                .await?;
            if first_attempt {
                return Err(SinkErrorKind::Transient.error_with_msg("timed out"));
            }
            Ok(())
        }

        async fn document_by_uid(
            &self,
            collection: &str,
            uid: &str,
        ) -> Result<Option<String>, SinkError> {
            self.inner
                .document_facade()
                .document_by_uid(collection, uid)
                .await
        }

        async fn document_count(&self, collection: &str) -> Result<u64, SinkError> {
            self.inner.document_facade().document_count(collection).await
        }
    }

    impl DatabaseProviderFacades for LostAcknowledgementStore {
        fn document_facade(&self) -> &dyn DocumentFacade {
            self
        }
    }

    fn identity(n: u128) -> EventIdentity {
        EventIdentity::from_uuid(Uuid::from_u128(n))
    }

    fn documents(count: u128) -> Vec<(EventIdentity, String)> {
        (1..=count)
            .map(|n| (identity(n), format!("{{\"n\":{n}}}")))
            .collect()
    }

    fn writer(dbp: DatabaseProvider, max_retries: u32) -> SinkWriter {
        SinkWriter {
            dbp: Arc::new(dbp),
            collection: "test".to_string(),
            write_mode: WriteMode::Overwrite,
            max_retries,
            retry_backoff_millis: 1,
            concurrency: 2,
        }
    }

    #[tokio::test]
    async fn test_write_all_to_memory() {
        let provider = InMemoryDatabaseProvider::new().await;
        let sink_writer = writer(provider.as_database_provider(), 0);
        let summary = sink_writer
            .write_all(&documents(5), &CancellationSignal::new())
            .await;
        assert_eq!(summary.written, 5);
        assert!(summary.failed.is_empty());
        let count = provider
            .as_database_provider()
            .document_facade()
            .document_count("test")
            .await
            .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(FlakyStore {
            transient_failures: 2,
            rejected: vec![],
            attempts: Mutex::default(),
        });
        let summary = writer(DatabaseProvider::new(store.clone()), 2)
            .write_all(&documents(3), &CancellationSignal::new())
            .await;
        assert_eq!(summary.written, 3);
        assert_eq!(store.attempts.lock().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let store = Arc::new(FlakyStore {
            transient_failures: 5,
            rejected: vec![identity(2).to_string()],
            attempts: Mutex::default(),
        });
        let summary = writer(DatabaseProvider::new(store.clone()), 1)
            .with_retries(10, 1)
            .write_all(&documents(3), &CancellationSignal::new())
            .await;
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].identity, identity(2));
        assert_eq!(summary.failed[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_reject_mode_retry_after_lost_acknowledgement_is_written() {
        let provider = InMemoryDatabaseProvider::new().await;
        let store = Arc::new(LostAcknowledgementStore {
            inner: provider.as_database_provider(),
            attempts: Mutex::default(),
        });
        let mut sink_writer = writer(DatabaseProvider::new(store.clone()), 3);
        sink_writer.write_mode = WriteMode::Reject;
        let summary = sink_writer
            .write_all(&documents(2), &CancellationSignal::new())
            .await;
        assert_eq!(summary.written, 2);
        assert!(summary.failed.is_empty());
        assert_eq!(store.attempts.lock().unwrap().len(), 4);
        assert_eq!(store.document_count("test").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reject_mode_duplicate_without_prior_failure_fails() {
        let provider = InMemoryDatabaseProvider::new().await;
        let mut sink_writer = writer(provider.as_database_provider(), 3);
        sink_writer.write_mode = WriteMode::Reject;
        let cancel = CancellationSignal::new();
        assert_eq!(sink_writer.write_all(&documents(1), &cancel).await.written, 1);
        let summary = sink_writer.write_all(&documents(1), &cancel).await;
        assert_eq!(summary.written, 0);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_cancelled_writes_are_not_attempted() {
        let provider = InMemoryDatabaseProvider::new().await;
        let cancel = CancellationSignal::new();
        cancel.signal();
        let summary = writer(provider.as_database_provider(), 0)
            .write_all(&documents(4), &cancel)
            .await;
        assert_eq!(summary.written, 0);
        assert_eq!(summary.not_attempted.len(), 4);
    }
}
