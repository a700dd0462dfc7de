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

//! JSON projection of correlated events.

use serde::Deserialize;
use serde::Serialize;

use super::AttributeMap;
use super::CorrelatedEvent;
use super::CorrelationStatus;
use super::EventIdentity;
use super::EventRole;
use super::IdentifiedEvent;
use super::MigrationError;
use super::MigrationErrorKind;
use crate::conf::ExtractConfig;
use crate::util::parse_scan_log_epoch_seconds;

/// Start or end half of a [Document].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPart {
    /// Identity of the event.
    pub uid: EventIdentity,
    /// File the event was extracted from.
    pub origin: String,
    /// Extraction position within the file.
    pub position: u64,
    /// Attributes in document order.
    pub attributes: AttributeMap,
    /// Identity of the start this end belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_start: Option<EventIdentity>,
}

impl DocumentPart {
    fn of(event: &IdentifiedEvent, run_start: Option<EventIdentity>) -> Self {
        Self {
            uid: event.identity(),
            origin: event.origin().to_string(),
            position: event.position(),
            attributes: event.attributes().clone(),
            run_start,
        }
    }

    fn into_event(self, role: EventRole) -> IdentifiedEvent {
        IdentifiedEvent::new(
            self.uid,
            role,
            &self.origin,
            self.position,
            None,
            self.attributes,
        )
    }
}

/** Self-contained record stored in the destination collection.

Keyed by [Self::uid]. End attributes live in their own `end` object, apart
from the start attributes.
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary key.
    pub uid: EventIdentity,
    /// Correlation status.
    pub status: CorrelationStatus,
    /// `true` if both start and end are present.
    pub complete: bool,
    /// Start time in seconds since UNIX epoch, if the start carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// End time in seconds since UNIX epoch, if the end carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    /// Start half.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DocumentPart>,
    /// End half.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DocumentPart>,
}

impl Document {
    /// Serialize as a single line of JSON.
    pub fn to_json(&self) -> Result<String, MigrationError> {
        serde_json::to_string(self).map_err(|e| {
            MigrationErrorKind::DocumentMapping
                .error_with_msg(format!("Unable to serialize document {}: {e}", self.uid))
        })
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, MigrationError> {
        serde_json::from_str(json).map_err(|e| {
            MigrationErrorKind::DocumentMapping.error_with_msg(format!("Unable to parse document: {e}"))
        })
    }
}

impl TryFrom<Document> for CorrelatedEvent {
    type Error = MigrationError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        let uid = document.uid;
        match (document.status, document.start, document.end) {
            (CorrelationStatus::Complete, Some(start), Some(end)) => Ok(Self::Complete {
                start: start.into_event(EventRole::Start),
                end: end.into_event(EventRole::End),
            }),
            (CorrelationStatus::StartOnly, Some(start), None) => {
                Ok(Self::StartOnly(start.into_event(EventRole::Start)))
            }
            (CorrelationStatus::EndOnly, None, Some(end)) => {
                Ok(Self::EndOnly(end.into_event(EventRole::End)))
            }
            (status, _, _) => Err(MigrationErrorKind::DocumentMapping.error_with_msg(format!(
                "Document {uid} with status '{}' does not have the expected parts.",
                status.as_str()
            ))),
        }
    }
}

/// Projects [CorrelatedEvent]s into [Document]s.
#[derive(Debug, Clone)]
pub struct DocumentSerializer {
    start_time_attribute: String,
    end_time_attribute: String,
}

impl Default for DocumentSerializer {
    fn default() -> Self {
        Self::new("started", "ended")
    }
}

impl From<&ExtractConfig> for DocumentSerializer {
    fn from(extract_config: &ExtractConfig) -> Self {
        Self::new(extract_config.start_marker(), extract_config.end_marker())
    }
}

impl DocumentSerializer {
    /// Return a new instance that reads time stamps from the named
    /// attributes.
    pub fn new(start_time_attribute: &str, end_time_attribute: &str) -> Self {
        Self {
            start_time_attribute: start_time_attribute.to_string(),
            end_time_attribute: end_time_attribute.to_string(),
        }
    }

    /// Build the document for a correlated event.
    pub fn to_document(&self, correlated: &CorrelatedEvent) -> Document {
        let epoch_seconds = |event: Option<&IdentifiedEvent>, attribute: &str| {
            event
                .and_then(|event| event.attributes().get(attribute))
                .and_then(parse_scan_log_epoch_seconds)
        };
        let start = correlated.start();
        let end = correlated.end();
        let run_start = start.map(IdentifiedEvent::identity);
        Document {
            uid: correlated.identity(),
            status: correlated.status(),
            complete: correlated.status() == CorrelationStatus::Complete,
            time: epoch_seconds(start, &self.start_time_attribute),
            end_time: epoch_seconds(end, &self.end_time_attribute),
            start: start.map(|start| DocumentPart::of(start, None)),
            end: end.map(|end| DocumentPart::of(end, run_start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn identity(n: u128) -> EventIdentity {
        EventIdentity::from_uuid(uuid::Uuid::from_u128(n))
    }

    fn event(n: u128, role: EventRole, attributes: &[(&str, &str)]) -> IdentifiedEvent {
        IdentifiedEvent::new(
            identity(n),
            role,
            "2014-10-13-scanlog.xml",
            n as u64,
            None,
            attributes.iter().copied().collect(),
        )
    }

    #[test]
    fn test_complete_document_layout() {
        let correlated = CorrelatedEvent::Complete {
            start: event(1, EventRole::Start, &[("title", "Strip2"), ("started", "2014-10-13 22:08:08")]),
            end: event(2, EventRole::End, &[("state", "complete"), ("ended", "2014-10-13 22:09:59")]),
        };
        let document = DocumentSerializer::default().to_document(&correlated);
        let json = document.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["uid"], "00000000000000000000000000000001");
        assert_eq!(value["status"], "complete");
        assert_eq!(value["complete"], true);
        assert_eq!(value["time"], 1_413_238_088.0);
        assert_eq!(value["end_time"], 1_413_238_199.0);
        assert_eq!(value["start"]["attributes"]["title"], "Strip2");
        assert_eq!(value["end"]["attributes"]["state"], "complete");
        assert_eq!(value["end"]["run_start"], "00000000000000000000000000000001");
        assert!(value["start"].get("run_start").is_none());
        assert!(json.find("\"title\"") < json.find("\"started\""));
    }

    #[test]
    fn test_singletons() {
        let serializer = DocumentSerializer::default();
        let start_only = serializer.to_document(&CorrelatedEvent::StartOnly(event(
            7,
            EventRole::Start,
            &[("started", "yesterday")],
        )));
        assert_eq!(start_only.status, CorrelationStatus::StartOnly);
        assert!(!start_only.complete);
        assert_eq!(start_only.time, None);
        assert!(start_only.end.is_none());

        let end_only = serializer.to_document(&CorrelatedEvent::EndOnly(event(9, EventRole::End, &[])));
        assert_eq!(end_only.uid, identity(9));
        assert_eq!(end_only.status, CorrelationStatus::EndOnly);
        assert!(end_only.start.is_none());
        assert_eq!(end_only.end.as_ref().and_then(|end| end.run_start), None);
        assert!(end_only.to_json().unwrap().contains("\"end-only\""));
    }

    #[test]
    fn test_reverse_mapping_keeps_attributes() {
        let correlated = CorrelatedEvent::Complete {
            start: event(1, EventRole::Start, &[("z", "last & first"), ("a", "<1>")]),
            end: event(2, EventRole::End, &[("q", "\"quoted\"")]),
        };
        let json = DocumentSerializer::default()
            .to_document(&correlated)
            .to_json()
            .unwrap();
        let restored = CorrelatedEvent::try_from(Document::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored, correlated);
    }

    #[test]
    fn test_inconsistent_document_is_rejected() {
        let mut document = DocumentSerializer::default()
            .to_document(&CorrelatedEvent::StartOnly(event(1, EventRole::Start, &[])));
        document.status = CorrelationStatus::Complete;
        let error = CorrelatedEvent::try_from(document).unwrap_err();
        assert_eq!(error.kind(), &MigrationErrorKind::DocumentMapping);
        assert!(EventIdentity::from_str("00000000000000000000000000000001").is_ok());
    }
}
