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

//! Ephemeral in-memory implementation of [DatabaseProvider].

mod inmem_collection;
mod inmem_facades;

use self::inmem_collection::InMemCollection;
use self::inmem_facades::InMemProviderFacades;
use crossbeam_skiplist::SkipMap;
use scanlog_dbp::dbp::DatabaseProvider;
use std::sync::Arc;

/// Ephemeral in-memory implementation of [DatabaseProvider].
///
/// Useful for dry runs and tests. All documents are lost when the process
/// exits.
pub struct InMemoryDatabaseProvider {
    collections: SkipMap<String, InMemCollection>,
}

impl InMemoryDatabaseProvider {
    /// Return a new instance.
    pub async fn new() -> Arc<Self> {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Using in-mem db provider.");
        }
        Arc::new(Self {
            collections: SkipMap::default(),
        })
    }

    /// Get [DatabaseProvider] instance.
    pub fn as_database_provider(self: &Arc<Self>) -> DatabaseProvider {
        DatabaseProvider::new(Arc::new(InMemProviderFacades::new(self)))
    }

    /// Run `f` on the named collection, creating it if it does not yet exist.
    fn with_collection<R>(&self, collection: &str, f: impl FnOnce(&InMemCollection) -> R) -> R {
        f(self
            .collections
            .get_or_insert_with(collection.to_owned(), InMemCollection::default)
            .value())
    }
}
