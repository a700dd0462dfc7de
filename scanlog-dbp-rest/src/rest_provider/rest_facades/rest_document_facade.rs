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

//! REST implementation of [DocumentFacade].

use crate::RestDocumentStoreProvider;
use scanlog_dbp::dbp::facades::DocumentFacade;
use scanlog_dbp::sink::SinkError;
use scanlog_dbp::sink::WriteMode;
use std::sync::Arc;

/// REST implementation of [DocumentFacade].
pub struct RestDocumentFacade {
    rest_provider: Arc<RestDocumentStoreProvider>,
}

impl RestDocumentFacade {
    /// Return a new instance.
    pub fn new(rest_provider: &Arc<RestDocumentStoreProvider>) -> Self {
        Self {
            rest_provider: Arc::clone(rest_provider),
        }
    }
}

#[async_trait::async_trait]
impl DocumentFacade for RestDocumentFacade {
    async fn document_persist(
        &self,
        collection: &str,
        uid: &str,
        document: &str,
        write_mode: WriteMode,
    ) -> Result<(), SinkError> {
        self.rest_provider
            .put_document(collection, uid, document, write_mode)
            .await
    }

    async fn document_by_uid(
        &self,
        collection: &str,
        uid: &str,
    ) -> Result<Option<String>, SinkError> {
        self.rest_provider.get_document(collection, uid).await
    }

    async fn document_count(&self, collection: &str) -> Result<u64, SinkError> {
        self.rest_provider.count_documents(collection).await
    }
}
