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

//! Replacement of source identifiers with run-wide unique identities.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::AttributeMap;
use super::EventRole;
use super::MigrationError;
use super::MigrationErrorKind;
use super::RawEvent;

/// Unique identity of one event. Displayed as 32 lower case hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventIdentity(Uuid);

impl EventIdentity {
    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for EventIdentity {
    type Err = MigrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self).map_err(|e| {
            MigrationErrorKind::DocumentMapping
                .error_with_msg(format!("Invalid event identity '{value}': {e}"))
        })
    }
}

impl Serialize for EventIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value).map_err(serde::de::Error::custom)
    }
}

/// Source of new identities.
pub trait IdentityGenerator: Send {
    /// Return a new identity.
    fn next_identity(&mut self) -> EventIdentity;
}

/// Random (version 4) UUIDs.
#[derive(Default)]
pub struct RandomIdentityGenerator;

impl IdentityGenerator for RandomIdentityGenerator {
    fn next_identity(&mut self) -> EventIdentity {
        EventIdentity(Uuid::new_v4())
    }
}

/// Predictable identities `…0001`, `…0002` and so on for reproducible runs.
#[derive(Default)]
pub struct SequentialIdentityGenerator {
    last: u128,
}

impl IdentityGenerator for SequentialIdentityGenerator {
    fn next_identity(&mut self) -> EventIdentity {
        self.last += 1;
        EventIdentity(Uuid::from_u128(self.last))
    }
}

/** Two-level lookup of start identities: file, then original identifier.

Several starts in one file may share an original identifier. They are kept
in the order they were assigned.
*/
#[derive(Default)]
pub struct IdentityMap {
    starts: HashMap<String, HashMap<String, Vec<EventIdentity>>>,
    origins: Vec<String>,
}

impl IdentityMap {
    fn note_origin(&mut self, origin: &str) {
        if self.origins.last().is_none_or(|last| last != origin)
            && !self.origins.iter().any(|known| known == origin)
        {
            self.origins.push(origin.to_string());
        }
    }

    fn register(&mut self, origin: &str, original_id: &str, identity: EventIdentity) {
        self.starts
            .entry(origin.to_string())
            .or_default()
            .entry(original_id.to_string())
            .or_default()
            .push(identity);
    }

    /// Identities of the starts in `origin` that had `original_id`.
    pub fn lookup(&self, origin: &str, original_id: &str) -> &[EventIdentity] {
        self.starts
            .get(origin)
            .and_then(|by_id| by_id.get(original_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Files processed before `origin`, most recent first.
    pub fn origins_before(&self, origin: &str) -> impl Iterator<Item = &str> {
        let end = self
            .origins
            .iter()
            .position(|known| known == origin)
            .unwrap_or(self.origins.len());
        self.origins[..end].iter().rev().map(String::as_str)
    }
}

/// An event that has received its [EventIdentity].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedEvent {
    identity: EventIdentity,
    role: EventRole,
    origin: String,
    position: u64,
    reference: Option<String>,
    attributes: AttributeMap,
}

impl IdentifiedEvent {
    /// Return a new instance.
    ///
    /// `reference` is the original identifier of the start an end event
    /// belongs to, if still known.
    pub fn new(
        identity: EventIdentity,
        role: EventRole,
        origin: &str,
        position: u64,
        reference: Option<String>,
        attributes: AttributeMap,
    ) -> Self {
        Self {
            identity,
            role,
            origin: origin.to_string(),
            position,
            reference,
            attributes,
        }
    }

    /// Identity of this event.
    pub fn identity(&self) -> EventIdentity {
        self.identity
    }

    /// Start or end.
    pub fn role(&self) -> EventRole {
        self.role
    }

    /// File the event was extracted from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Zero based extraction position within the file.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Original identifier of the start an end event refers to.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Attributes with the original identifier replaced by the identity.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

/// Hands out identities and records where start identities came from.
pub struct IdentityAssigner {
    generator: Box<dyn IdentityGenerator>,
    id_attribute: String,
    issued: HashSet<EventIdentity>,
    identity_map: IdentityMap,
}

impl IdentityAssigner {
    /// Return a new instance.
    pub fn new(generator: Box<dyn IdentityGenerator>, id_attribute: &str) -> Self {
        Self {
            generator,
            id_attribute: id_attribute.to_string(),
            issued: HashSet::new(),
            identity_map: IdentityMap::default(),
        }
    }

    /// Replace the original identifier attribute of the event with a new
    /// identity.
    ///
    /// # Panics
    ///
    /// If the generator repeats an identity within the run.
    pub fn assign(&mut self, raw_event: RawEvent) -> IdentifiedEvent {
        let identity = self.generator.next_identity();
        if !self.issued.insert(identity) {
            panic!("DuplicateIdentifierCollision: identity {identity} was issued twice.");
        }
        let (origin, position, role, original_id, reference, mut attributes) =
            raw_event.into_parts();
        attributes.set(&self.id_attribute, &identity.to_string());
        self.identity_map.note_origin(&origin);
        let reference = match role {
            EventRole::Start => {
                self.identity_map.register(&origin, &original_id, identity);
                None
            }
            EventRole::End => Some(reference),
        };
        IdentifiedEvent::new(identity, role, &origin, position, reference, attributes)
    }

    /// Start identities assigned so far.
    pub fn identity_map(&self) -> &IdentityMap {
        &self.identity_map
    }

    /// Number of identities issued so far.
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }
}
