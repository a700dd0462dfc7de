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

//! Ephemeral in-memory implementation of [DocumentFacade].

use crate::InMemoryDatabaseProvider;
use scanlog_dbp::dbp::facades::DocumentFacade;
use scanlog_dbp::sink::SinkError;
use scanlog_dbp::sink::WriteMode;
use std::sync::Arc;

/// Ephemeral in-memory implementation of [DocumentFacade].
pub struct InMemDocumentFacade {
    inmem_provider: Arc<InMemoryDatabaseProvider>,
}

impl InMemDocumentFacade {
    /// Return a new instance.
    pub fn new(inmem_provider: &Arc<InMemoryDatabaseProvider>) -> Self {
        Self {
            inmem_provider: Arc::clone(inmem_provider),
        }
    }
}

#[async_trait::async_trait]
impl DocumentFacade for InMemDocumentFacade {
    async fn document_persist(
        &self,
        collection: &str,
        uid: &str,
        document: &str,
        write_mode: WriteMode,
    ) -> Result<(), SinkError> {
        self.inmem_provider.with_collection(collection, |c| {
            c.document_persist(uid, document, write_mode)
        })
    }

    async fn document_by_uid(
        &self,
        collection: &str,
        uid: &str,
    ) -> Result<Option<String>, SinkError> {
        Ok(self
            .inmem_provider
            .with_collection(collection, |c| c.document_by_uid(uid)))
    }

    async fn document_count(&self, collection: &str) -> Result<u64, SinkError> {
        Ok(self
            .inmem_provider
            .with_collection(collection, |c| c.document_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlog_dbp::dbp::facades::DatabaseProviderFacades;
    use scanlog_dbp::sink::SinkErrorKind;

    fn init_logger() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    }

    #[tokio::test]
    async fn test_overwrite_replaces_document() {
        init_logger();
        let dbp = InMemoryDatabaseProvider::new().await.as_database_provider();
        let facade = dbp.document_facade();
        facade
            .document_persist("runs", "u1", r#"{"v":1}"#, WriteMode::Overwrite)
            .await
            .unwrap();
        facade
            .document_persist("runs", "u1", r#"{"v":2}"#, WriteMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(facade.document_count("runs").await.unwrap(), 1);
        assert_eq!(
            facade.document_by_uid("runs", "u1").await.unwrap().as_deref(),
            Some(r#"{"v":2}"#)
        );
    }

    #[tokio::test]
    async fn test_reject_keeps_first_document() {
        init_logger();
        let dbp = InMemoryDatabaseProvider::new().await.as_database_provider();
        let facade = dbp.document_facade();
        facade
            .document_persist("runs", "u1", r#"{"v":1}"#, WriteMode::Reject)
            .await
            .unwrap();
        let err = facade
            .document_persist("runs", "u1", r#"{"v":2}"#, WriteMode::Reject)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &SinkErrorKind::DuplicateKey);
        assert_eq!(
            facade.document_by_uid("runs", "u1").await.unwrap().as_deref(),
            Some(r#"{"v":1}"#)
        );
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        init_logger();
        let dbp = InMemoryDatabaseProvider::new().await.as_database_provider();
        let facade = dbp.document_facade();
        facade
            .document_persist("a", "u1", "{}", WriteMode::Reject)
            .await
            .unwrap();
        facade
            .document_persist("b", "u1", "{}", WriteMode::Reject)
            .await
            .unwrap();
        assert_eq!(facade.document_count("a").await.unwrap(), 1);
        assert_eq!(facade.document_count("b").await.unwrap(), 1);
        assert!(facade.document_by_uid("c", "u1").await.unwrap().is_none());
    }
}
