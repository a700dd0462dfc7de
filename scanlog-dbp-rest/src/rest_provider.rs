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

//! REST implementation of [DatabaseProvider].
//!
//! Talks to a document store exposing the widely used per-document HTTP API:
//!
//! * `PUT {endpoint}/{collection}/_doc/{uid}` creates or replaces a document.
//! * `PUT {endpoint}/{collection}/_create/{uid}` creates a document and
//!   responds with `409 Conflict` if it already exists.
//! * `GET {endpoint}/{collection}/_doc/{uid}` returns the document in `_source`.
//! * `GET {endpoint}/{collection}/_count` returns the number of documents.

mod rest_facades;

use self::rest_facades::RestProviderFacades;
use reqwest::Client;
use reqwest::ClientBuilder;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use scanlog_dbp::dbp::DatabaseProvider;
use scanlog_dbp::sink::SinkError;
use scanlog_dbp::sink::SinkErrorKind;
use scanlog_dbp::sink::WriteMode;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Envelope of a single document lookup.
#[derive(Deserialize)]
struct SourceEnvelope {
    #[serde(rename = "_source")]
    source: Option<Box<RawValue>>,
}

/// REST [DatabaseProvider] implementation.
pub struct RestDocumentStoreProvider {
    /// Base URLs of the store. Requests go to one at a time.
    endpoints: Vec<String>,
    /// Index of the endpoint currently in use.
    endpoint_index: AtomicUsize,
    username: String,
    password: String,
    // Client uses an Arc internally, so it doesn't need Arc<> wrapping here
    client: Client,
}

impl RestDocumentStoreProvider {
    const MIME_APPLICATION_JSON: &'static str = "application/json";

    /// Return a new instance.
    ///
    /// Basic authentication is used when `username` is non-empty.
    pub fn new(
        endpoints: &[String],
        username: &str,
        password: &str,
        app_name_lowercase: &str,
        app_version: &str,
    ) -> Result<Arc<Self>, SinkError> {
        if endpoints.is_empty() {
            return Err(SinkErrorKind::Configuration
                .error_with_msg("At least one endpoint is required for the REST provider."));
        }
        let user_agent = format!("{app_name_lowercase}/{app_version}");
        log::debug!("user_agent: {user_agent}. endpoints: {endpoints:?}");
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .referer(false)
            .brotli(true)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                SinkErrorKind::Configuration
                    .error_with_msg(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Arc::new(Self {
            endpoints: endpoints
                .iter()
                .map(|endpoint| endpoint.trim_end_matches('/').to_owned())
                .collect(),
            endpoint_index: AtomicUsize::default(),
            username: username.to_owned(),
            password: password.to_owned(),
            client,
        }))
    }

    /// Get [DatabaseProvider] instance.
    pub fn as_database_provider(self: &Arc<Self>) -> DatabaseProvider {
        DatabaseProvider::new(Arc::new(RestProviderFacades::new(self)))
    }

    /// Endpoint currently in use.
    fn endpoint(&self) -> &str {
        let index = self.endpoint_index.load(Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }

    /// Move on to the next endpoint after a transient failure.
    fn fail_over(&self) {
        if self.endpoints.len() > 1 {
            let previous = self.endpoint_index.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "Endpoint '{}' failed. Switching to the next one.",
                self.endpoints[previous % self.endpoints.len()]
            );
        }
    }

    /// URL of a document API resource.
    fn document_url(endpoint: &str, collection: &str, api: &str, uid: &str) -> String {
        format!("{endpoint}/{collection}/{api}/{uid}")
    }

    fn authorize(&self, request_builder: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            request_builder
        } else {
            request_builder.basic_auth(&self.username, Some(&self.password))
        }
    }

    /// Map the response status of a write to the outcome.
    fn write_status_to_result(status: StatusCode, url: &str) -> Result<(), SinkError> {
        if status.is_success() {
            return Ok(());
        }
        let kind = match status {
            StatusCode::CONFLICT => SinkErrorKind::DuplicateKey,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                SinkErrorKind::Transient
            }
            status if status.is_server_error() => SinkErrorKind::Transient,
            _ => SinkErrorKind::Rejected,
        };
        Err(kind.error_with_msg(format!("Unexpected response from {url}: {status}")))
    }

    /// Send a request and treat failures to get any response as transient.
    async fn send(&self, request_builder: RequestBuilder, url: &str) -> Result<Response, SinkError> {
        self.authorize(request_builder)
            .send()
            .await
            .map_err(|e| {
                self.fail_over();
                SinkErrorKind::Transient
                    .error_with_msg(format!("Failed request to {url}: {:?}", e.without_url()))
            })
    }

    async fn response_text(response: Response, url: &str) -> Result<String, SinkError> {
        response.text().await.map_err(|e| {
            SinkErrorKind::Transient.error_with_msg(format!(
                "Failed request to {url}: Failed to read response body: {:?}",
                e.without_url()
            ))
        })
    }

    async fn response_json(response: Response, url: &str) -> Result<serde_json::Value, SinkError> {
        let body = Self::response_text(response, url).await?;
        serde_json::from_str(&body).map_err(|e| {
            SinkErrorKind::Serialization
                .error_with_msg(format!("Response from {url} is not JSON: {e}"))
        })
    }

    /// Extract `_source` from a lookup response exactly as the store returned it.
    fn source_from_body(body: &str, url: &str) -> Result<Option<String>, SinkError> {
        serde_json::from_str::<SourceEnvelope>(body)
            .map(|envelope| envelope.source.map(|raw| raw.get().to_owned()))
            .map_err(|e| {
                SinkErrorKind::Serialization
                    .error_with_msg(format!("Response from {url} is not a document: {e}"))
            })
    }

    /// Create or replace a document.
    async fn put_document(
        &self,
        collection: &str,
        uid: &str,
        document: &str,
        write_mode: WriteMode,
    ) -> Result<(), SinkError> {
        let api = match write_mode {
            WriteMode::Overwrite => "_doc",
            WriteMode::Reject => "_create",
        };
        let url = Self::document_url(self.endpoint(), collection, api, uid);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Sending body: {document}");
        }
        let request_builder = self
            .client
            .put(&url)
            .body(document.to_owned())
            .header(&CONTENT_TYPE, Self::MIME_APPLICATION_JSON);
        let response = self.send(request_builder, &url).await?;
        let result = Self::write_status_to_result(response.status(), &url);
        if result.as_ref().is_err_and(SinkError::is_transient) {
            self.fail_over();
        }
        result
    }

    /// Retrieve the `_source` of a document.
    async fn get_document(&self, collection: &str, uid: &str) -> Result<Option<String>, SinkError> {
        let url = Self::document_url(self.endpoint(), collection, "_doc", uid);
        let response = self.send(self.client.get(&url), &url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = Self::response_text(response, &url).await?;
                Self::source_from_body(&body, &url)
            }
            status => Self::write_status_to_result(status, &url).map(|_| None),
        }
    }

    /// Count the documents in a collection.
    async fn count_documents(&self, collection: &str) -> Result<u64, SinkError> {
        let url = format!("{}/{collection}/_count", self.endpoint());
        let response = self.send(self.client.get(&url), &url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(0),
            status if status.is_success() => Self::response_json(response, &url)
                .await?
                .get("count")
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| {
                    SinkErrorKind::Serialization
                        .error_with_msg(format!("Response from {url} has no 'count'."))
                }),
            status => Self::write_status_to_result(status, &url).map(|_| 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url() {
        assert_eq!(
            RestDocumentStoreProvider::document_url("http://db:9200", "scanlog", "_create", "ab12"),
            "http://db:9200/scanlog/_create/ab12"
        );
    }

    #[test]
    fn test_write_status_classification() {
        let url = "http://db/x";
        assert!(RestDocumentStoreProvider::write_status_to_result(StatusCode::CREATED, url).is_ok());
        let kind_of = |status| {
            *RestDocumentStoreProvider::write_status_to_result(status, url)
                .unwrap_err()
                .kind()
        };
        assert_eq!(kind_of(StatusCode::CONFLICT), SinkErrorKind::DuplicateKey);
        assert_eq!(kind_of(StatusCode::SERVICE_UNAVAILABLE), SinkErrorKind::Transient);
        assert_eq!(kind_of(StatusCode::TOO_MANY_REQUESTS), SinkErrorKind::Transient);
        assert_eq!(kind_of(StatusCode::BAD_REQUEST), SinkErrorKind::Rejected);
        assert_eq!(kind_of(StatusCode::UNAUTHORIZED), SinkErrorKind::Rejected);
    }

    #[test]
    fn test_source_keeps_attribute_order() {
        let url = "http://db/x";
        let body = r#"{"_id":"ab12","found":true,"_source":{"z":"1","a":"2"}}"#;
        assert_eq!(
            RestDocumentStoreProvider::source_from_body(body, url).unwrap(),
            Some(r#"{"z":"1","a":"2"}"#.to_string())
        );
        assert_eq!(
            RestDocumentStoreProvider::source_from_body(r#"{"found":false}"#, url).unwrap(),
            None
        );
        assert_eq!(
            *RestDocumentStoreProvider::source_from_body("not json", url)
                .unwrap_err()
                .kind(),
            SinkErrorKind::Serialization
        );
    }

    #[test]
    fn test_endpoints_are_normalized_and_rotated() {
        let _ = env_logger::builder().is_test(true).try_init();
        let provider = RestDocumentStoreProvider::new(
            &["http://a:9200/".to_string(), "http://b:9200".to_string()],
            "",
            "",
            "scanlog",
            "0.0.0",
        )
        .unwrap();
        assert_eq!(provider.endpoint(), "http://a:9200");
        provider.fail_over();
        assert_eq!(provider.endpoint(), "http://b:9200");
        provider.fail_over();
        assert_eq!(provider.endpoint(), "http://a:9200");
    }

    #[test]
    fn test_no_endpoints_is_a_configuration_error() {
        let err = RestDocumentStoreProvider::new(&[], "", "", "scanlog", "0.0.0")
            .err()
            .unwrap();
        assert_eq!(err.kind(), &SinkErrorKind::Configuration);
    }
}
