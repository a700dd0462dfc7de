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

//! Ephemeral in-memory representation of a document collection.

use crossbeam_skiplist::SkipMap;
use scanlog_dbp::sink::SinkError;
use scanlog_dbp::sink::SinkErrorKind;
use scanlog_dbp::sink::WriteMode;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Ephemeral in-memory representation of a document collection.
#[derive(Default)]
pub struct InMemCollection {
    /// uid -> serialized JSON document
    documents: SkipMap<String, String>,
    /// Number of accepted writes, including overwrites.
    write_count: AtomicU64,
}

impl InMemCollection {
    /// Persist the document according to the [WriteMode].
    pub fn document_persist(
        &self,
        uid: &str,
        document: &str,
        write_mode: WriteMode,
    ) -> Result<(), SinkError> {
        if write_mode == WriteMode::Reject && self.documents.contains_key(uid) {
            return Err(SinkErrorKind::DuplicateKey
                .error_with_msg(format!("Document '{uid}' already exists.")));
        }
        self.documents.insert(uid.to_owned(), document.to_owned());
        let count = self.write_count.fetch_add(1, Ordering::Relaxed) + 1;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Persisted '{uid}'. Accepted writes so far: {count}.");
        }
        Ok(())
    }

    /// Retrieve a document by identity.
    pub fn document_by_uid(&self, uid: &str) -> Option<String> {
        self.documents
            .get(uid)
            .map(|entry| entry.value().to_owned())
    }

    /// Number of distinct documents.
    pub fn document_count(&self) -> u64 {
        u64::try_from(self.documents.len()).unwrap_or(u64::MAX)
    }
}
