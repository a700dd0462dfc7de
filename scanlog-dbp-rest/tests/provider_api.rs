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

//! Construction of the provider through the public crate root.

use scanlog_dbp::sink::SinkErrorKind;
use scanlog_dbp_rest::RestDocumentStoreProvider;

#[test]
fn provider_is_built_through_crate_root() {
    let provider = RestDocumentStoreProvider::new(
        &["http://localhost:9200".to_string()],
        "scanlog",
        "secret",
        "scanlog",
        "0.0.0",
    )
    .unwrap();
    let _dbp = provider.as_database_provider();
    let err = RestDocumentStoreProvider::new(&[], "", "", "scanlog", "0.0.0")
        .err()
        .unwrap();
    assert_eq!(err.kind(), &SinkErrorKind::Configuration);
}
