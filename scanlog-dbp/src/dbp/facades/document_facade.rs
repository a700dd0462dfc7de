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

//! Database facade for operations related to migrated documents.

use crate::sink::SinkError;
use crate::sink::WriteMode;

/// Database facade for operations related to migrated documents.
///
/// Every document lives in a logical `collection` and is keyed by the event
/// identity (`uid`) assigned during migration.
#[async_trait::async_trait]
pub trait DocumentFacade: Send + Sync {
    /// Persist a single serialized JSON document.
    ///
    /// With [WriteMode::Overwrite] an existing document with the same `uid` is
    /// replaced. With [WriteMode::Reject] the write fails with
    /// [crate::sink::SinkErrorKind::DuplicateKey] instead.
    ///
    /// A document is either written completely or not at all.
    async fn document_persist(
        &self,
        collection: &str,
        uid: &str,
        document: &str,
        write_mode: WriteMode,
    ) -> Result<(), SinkError>;

    /// Get a previously persisted document by its identity.
    async fn document_by_uid(&self, collection: &str, uid: &str)
    -> Result<Option<String>, SinkError>;

    /// Return the number of documents in the collection.
    async fn document_count(&self, collection: &str) -> Result<u64, SinkError>;
}
