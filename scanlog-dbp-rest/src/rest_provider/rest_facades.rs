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

//! REST implementation of [DatabaseProviderFacades].

mod rest_document_facade;

use self::rest_document_facade::RestDocumentFacade;
use crate::RestDocumentStoreProvider;
use scanlog_dbp::dbp::facades::*;
use std::sync::Arc;

/// REST implementation of [DatabaseProviderFacades].
pub struct RestProviderFacades {
    document_facade: RestDocumentFacade,
}

impl RestProviderFacades {
    /// Return a new instance.
    pub fn new(rest_provider: &Arc<RestDocumentStoreProvider>) -> Self {
        Self {
            document_facade: RestDocumentFacade::new(rest_provider),
        }
    }
}

impl DatabaseProviderFacades for RestProviderFacades {
    fn document_facade(&self) -> &dyn DocumentFacade {
        &self.document_facade
    }
}
