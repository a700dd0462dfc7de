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

//! Canonical representation of one extracted scan log event.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde::ser::SerializeMap;
use std::fmt;

/// Whether an event marks the beginning or the end of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventRole {
    /// Beginning of an operation.
    Start,
    /// End of an operation.
    End,
}

impl fmt::Display for EventRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/** Ordered mapping of attribute name to string value.

Insertion order is the document order of the XML source and is preserved
through serialization.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    /// Return a new empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute without losing an existing one with the same name.
    ///
    /// A clashing name gets the suffix `_2`, `_3` and so on. Return the name
    /// the value was stored under.
    pub fn insert_unique(&mut self, name: &str, value: &str) -> String {
        let mut unique_name = name.to_string();
        let mut suffix = 1;
        while self.get(&unique_name).is_some() {
            suffix += 1;
            unique_name = format!("{name}_{suffix}");
        }
        self.entries.push((unique_name.clone(), value.to_string()));
        unique_name
    }

    /// Set the value of an attribute, replacing it in place if present.
    pub fn set(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value.to_string();
        } else {
            self.entries.push((name.to_string(), value.to_string()));
        }
    }

    /// Return the value of the named attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over name and value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Order independent copy of the content used for equality of events.
    pub fn content_key(&self) -> Vec<(String, String)> {
        let mut key = self.entries.clone();
        key.sort();
        key
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.insert_unique(name, value);
        }
        attributes
    }
}

impl Serialize for AttributeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct AttributeMapVisitor;

impl<'de> Visitor<'de> for AttributeMapVisitor {
    type Value = AttributeMap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of attribute names to string values")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut attributes = AttributeMap::new();
        while let Some((name, value)) = access.next_entry::<String, String>()? {
            attributes.entries.push((name, value));
        }
        Ok(attributes)
    }
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeMapVisitor)
    }
}

/** One start or end entry extracted from an XML scan log.

The attributes still hold the source-provided identifier until the
[super::IdentityAssigner] replaces it.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    origin: String,
    position: u64,
    role: EventRole,
    original_id: String,
    reference: String,
    attributes: AttributeMap,
}

impl RawEvent {
    /// Return a new instance.
    ///
    /// `reference` is the original identifier of the start an end event
    /// belongs to. For start events it equals `original_id`.
    pub fn new(
        origin: &str,
        position: u64,
        role: EventRole,
        original_id: &str,
        reference: &str,
        attributes: AttributeMap,
    ) -> Self {
        Self {
            origin: origin.to_string(),
            position,
            role,
            original_id: original_id.to_string(),
            reference: reference.to_string(),
            attributes,
        }
    }

    /// File the event was extracted from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Zero based extraction position within the file.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Start or end.
    pub fn role(&self) -> EventRole {
        self.role
    }

    /// Source-provided identifier. Only unique within one file.
    pub fn original_id(&self) -> &str {
        &self.original_id
    }

    /// Original identifier of the start event this event belongs to.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Extracted attributes in document order.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Split into the parts needed after identity assignment.
    pub(crate) fn into_parts(self) -> (String, u64, EventRole, String, String, AttributeMap) {
        (
            self.origin,
            self.position,
            self.role,
            self.original_id,
            self.reference,
            self.attributes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_unique_suffixes_clashes() {
        let mut attributes = AttributeMap::new();
        assert_eq!(attributes.insert_unique("title", "a"), "title");
        assert_eq!(attributes.insert_unique("title", "b"), "title_2");
        assert_eq!(attributes.insert_unique("title", "c"), "title_3");
        assert_eq!(attributes.get("title_2"), Some("b"));
        assert_eq!(attributes.len(), 3);
    }

    #[test]
    fn test_serialization_keeps_order() {
        let attributes = AttributeMap::from_iter([("z", "1"), ("a", "2"), ("m", "3")]);
        let json = serde_json::to_string(&attributes).unwrap();
        assert_eq!(json, r#"{"z":"1","a":"2","m":"3"}"#);
        let parsed: AttributeMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, attributes);
    }

    #[test]
    fn test_content_key_ignores_order() {
        let first = AttributeMap::from_iter([("id", "a1"), ("op", "scan")]);
        let second = AttributeMap::from_iter([("op", "scan"), ("id", "a1")]);
        assert_ne!(first, second);
        assert_eq!(first.content_key(), second.content_key());
    }

    #[test]
    fn test_set_keeps_position() {
        let mut attributes = AttributeMap::from_iter([("id", "a1"), ("op", "scan")]);
        attributes.set("id", "b2");
        assert_eq!(attributes.get("id"), Some("b2"));
        assert_eq!(
            attributes.iter().collect::<Vec<_>>(),
            vec![("id", "b2"), ("op", "scan")]
        );
    }
}
