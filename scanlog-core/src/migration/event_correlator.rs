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

//! Pairing of end events with their start events.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::EventIdentity;
use super::EventRole;
use super::IdentifiedEvent;
use super::IdentityMap;
use super::MigrationError;
use super::MigrationErrorKind;

/// Which pending start to pick when several share an original identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The first registered start.
    Earliest,
    /// The most recently registered start.
    #[default]
    Latest,
}

impl FromStr for MatchPolicy {
    type Err = MigrationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(MigrationErrorKind::Configuration.error_with_msg(format!(
                "Unknown match policy '{other}'. Use 'earliest' or 'latest'."
            ))),
        }
    }
}

/** Starts waiting for their end event.

Scoped to one run and owned by whoever drives the correlation.
*/
#[derive(Default)]
pub struct PendingStarts {
    entries: HashMap<EventIdentity, (u64, IdentifiedEvent)>,
    next_sequence: u64,
}

impl PendingStarts {
    /// Return a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, start: IdentifiedEvent) {
        self.entries
            .insert(start.identity(), (self.next_sequence, start));
        self.next_sequence += 1;
    }

    fn remove(&mut self, identity: &EventIdentity) -> Option<IdentifiedEvent> {
        self.entries.remove(identity).map(|(_, start)| start)
    }

    /// Return `true` if the start with this identity is still waiting.
    pub fn contains(&self, identity: &EventIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Number of waiting starts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if no start is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all waiting starts in the order they were registered.
    fn drain_in_order(&mut self) -> Vec<IdentifiedEvent> {
        let mut entries = self.entries.drain().map(|(_, entry)| entry).collect::<Vec<_>>();
        entries.sort_by_key(|(sequence, _)| *sequence);
        entries.into_iter().map(|(_, start)| start).collect()
    }
}

/// Correlation status of a finalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrelationStatus {
    /// Both start and end are known.
    Complete,
    /// A start without end.
    StartOnly,
    /// An end without start.
    EndOnly,
}

impl CorrelationStatus {
    /// Text form used in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::StartOnly => "start-only",
            Self::EndOnly => "end-only",
        }
    }
}

/// A start paired with its end, or an unmatched singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelatedEvent {
    /// Start and its end.
    Complete {
        /// The start owning the identity of the pair.
        start: IdentifiedEvent,
        /// The end referencing the start.
        end: IdentifiedEvent,
    },
    /// Start that never saw its end.
    StartOnly(IdentifiedEvent),
    /// End that could not be resolved to a start.
    EndOnly(IdentifiedEvent),
}

impl CorrelatedEvent {
    /// Identity the resulting document is keyed by.
    pub fn identity(&self) -> EventIdentity {
        match self {
            Self::Complete { start, .. } | Self::StartOnly(start) => start.identity(),
            Self::EndOnly(end) => end.identity(),
        }
    }

    /// Correlation status.
    pub fn status(&self) -> CorrelationStatus {
        match self {
            Self::Complete { .. } => CorrelationStatus::Complete,
            Self::StartOnly(_) => CorrelationStatus::StartOnly,
            Self::EndOnly(_) => CorrelationStatus::EndOnly,
        }
    }

    /// The start event, if any.
    pub fn start(&self) -> Option<&IdentifiedEvent> {
        match self {
            Self::Complete { start, .. } | Self::StartOnly(start) => Some(start),
            Self::EndOnly(_) => None,
        }
    }

    /// The end event, if any.
    pub fn end(&self) -> Option<&IdentifiedEvent> {
        match self {
            Self::Complete { end, .. } | Self::EndOnly(end) => Some(end),
            Self::StartOnly(_) => None,
        }
    }
}

/// Kind of unmatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanKind {
    /// The referenced start was never seen.
    EndWithoutStart,
    /// No end arrived before the run finished.
    StartWithoutEnd,
}

/// Non-fatal data quality finding about an unmatched event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanWarning {
    /// Kind of unmatched event.
    pub kind: OrphanKind,
    /// Identity of the unmatched event.
    pub identity: EventIdentity,
    /// File the event came from.
    pub origin: String,
    /// Extraction position within the file.
    pub position: u64,
    /// Original identifier an orphan end referenced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl OrphanWarning {
    /// Level orphans of every kind are logged at.
    pub const LOG_LEVEL: log::Level = log::Level::Warn;

    fn of(kind: OrphanKind, event: &IdentifiedEvent) -> Self {
        let warning = Self {
            kind,
            identity: event.identity(),
            origin: event.origin().to_string(),
            position: event.position(),
            reference: event.reference().map(str::to_string),
        };
        log::log!(Self::LOG_LEVEL, "{warning}");
        warning
    }
}

impl fmt::Display for OrphanWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            OrphanKind::EndWithoutStart => write!(
                f,
                "End event {} at '{}' #{} references unknown start '{}'.",
                self.identity,
                self.origin,
                self.position,
                self.reference.as_deref().unwrap_or_default()
            ),
            OrphanKind::StartWithoutEnd => write!(
                f,
                "Start event {} at '{}' #{} has no end.",
                self.identity, self.origin, self.position
            ),
        }
    }
}

/// Result of feeding one event to the [EventCorrelator].
#[derive(Debug)]
pub enum CorrelationOutcome {
    /// A start was registered and waits for its end.
    Pending,
    /// An end was paired with its start.
    Matched(CorrelatedEvent),
    /// A singleton was finalized.
    Orphan(CorrelatedEvent, OrphanWarning),
}

/// Start and end pairing state machine.
pub struct EventCorrelator {
    policy: MatchPolicy,
    cross_file: bool,
}

impl EventCorrelator {
    /// Return a new instance.
    pub fn new(policy: MatchPolicy, cross_file: bool) -> Self {
        Self { policy, cross_file }
    }

    /// Register a start as pending or resolve an end to its start.
    pub fn correlate(
        &self,
        pending: &mut PendingStarts,
        identity_map: &IdentityMap,
        event: IdentifiedEvent,
    ) -> CorrelationOutcome {
        match event.role() {
            EventRole::Start => {
                pending.insert(event);
                CorrelationOutcome::Pending
            }
            EventRole::End => match self
                .resolve(pending, identity_map, &event)
                .and_then(|identity| pending.remove(&identity))
            {
                Some(start) => CorrelationOutcome::Matched(CorrelatedEvent::Complete {
                    start,
                    end: event,
                }),
                None => {
                    let warning = OrphanWarning::of(OrphanKind::EndWithoutStart, &event);
                    CorrelationOutcome::Orphan(CorrelatedEvent::EndOnly(event), warning)
                }
            },
        }
    }

    /// Find the pending start an end belongs to.
    fn resolve(
        &self,
        pending: &PendingStarts,
        identity_map: &IdentityMap,
        end: &IdentifiedEvent,
    ) -> Option<EventIdentity> {
        let reference = end.reference()?;
        let pick = |origin: &str| {
            let mut candidates = identity_map
                .lookup(origin, reference)
                .iter()
                .filter(|identity| pending.contains(identity));
            match self.policy {
                MatchPolicy::Earliest => candidates.next().copied(),
                MatchPolicy::Latest => candidates.next_back().copied(),
            }
        };
        pick(end.origin()).or_else(|| {
            if self.cross_file {
                identity_map.origins_before(end.origin()).find_map(pick)
            } else {
                None
            }
        })
    }

    /// Finalize every still pending start as a start-only singleton, in the
    /// order the starts were first seen.
    pub fn close(&self, pending: &mut PendingStarts) -> Vec<CorrelationOutcome> {
        pending
            .drain_in_order()
            .into_iter()
            .map(|start| {
                let warning = OrphanWarning::of(OrphanKind::StartWithoutEnd, &start);
                CorrelationOutcome::Orphan(CorrelatedEvent::StartOnly(start), warning)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::AttributeMap;
    use crate::migration::IdentityAssigner;
    use crate::migration::RawEvent;
    use crate::migration::SequentialIdentityGenerator;

    struct Harness {
        assigner: IdentityAssigner,
        correlator: EventCorrelator,
        pending: PendingStarts,
    }

    impl Harness {
        fn new(policy: MatchPolicy, cross_file: bool) -> Self {
            Self {
                assigner: IdentityAssigner::new(
                    Box::new(SequentialIdentityGenerator::default()),
                    "id",
                ),
                correlator: EventCorrelator::new(policy, cross_file),
                pending: PendingStarts::new(),
            }
        }

        fn feed(&mut self, origin: &str, position: u64, role: EventRole, id: &str) -> CorrelationOutcome {
            let n = position.to_string();
            let raw_event = RawEvent::new(
                origin,
                position,
                role,
                id,
                id,
                AttributeMap::from_iter([("id", id), ("n", n.as_str())]),
            );
            let event = self.assigner.assign(raw_event);
            self.correlator
                .correlate(&mut self.pending, self.assigner.identity_map(), event)
        }
    }

    fn matched_start_position(outcome: CorrelationOutcome) -> u64 {
        match outcome {
            CorrelationOutcome::Matched(correlated) => correlated.start().unwrap().position(),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_start_then_end() {
        let mut harness = Harness::new(MatchPolicy::Latest, true);
        assert!(matches!(
            harness.feed("a.xml", 0, EventRole::Start, "x"),
            CorrelationOutcome::Pending
        ));
        assert_eq!(harness.pending.len(), 1);
        let outcome = harness.feed("a.xml", 1, EventRole::End, "x");
        let CorrelationOutcome::Matched(correlated) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(correlated.status(), CorrelationStatus::Complete);
        assert_eq!(correlated.identity(), correlated.start().unwrap().identity());
        assert!(harness.pending.is_empty());
    }

    #[test]
    fn test_orphan_end() {
        let mut harness = Harness::new(MatchPolicy::Latest, true);
        let CorrelationOutcome::Orphan(correlated, warning) =
            harness.feed("a.xml", 0, EventRole::End, "nowhere")
        else {
            panic!("expected an orphan");
        };
        assert_eq!(correlated.status(), CorrelationStatus::EndOnly);
        assert_eq!(warning.kind, OrphanKind::EndWithoutStart);
        assert_eq!(warning.reference.as_deref(), Some("nowhere"));
        assert_eq!(correlated.identity(), warning.identity);
        assert!(warning.to_string().contains("unknown start 'nowhere'"));
    }

    #[test]
    fn test_match_policies() {
        let mut latest = Harness::new(MatchPolicy::Latest, true);
        latest.feed("a.xml", 0, EventRole::Start, "x");
        latest.feed("a.xml", 1, EventRole::Start, "x");
        assert_eq!(matched_start_position(latest.feed("a.xml", 2, EventRole::End, "x")), 1);
        let mut earliest = Harness::new(MatchPolicy::Earliest, true);
        earliest.feed("a.xml", 0, EventRole::Start, "x");
        earliest.feed("a.xml", 1, EventRole::Start, "x");
        assert_eq!(matched_start_position(earliest.feed("a.xml", 2, EventRole::End, "x")), 0);
        assert_eq!(earliest.pending.len(), 1);
    }

    #[test]
    fn test_cross_file_fallback() {
        let mut harness = Harness::new(MatchPolicy::Latest, true);
        harness.feed("a.xml", 0, EventRole::Start, "x");
        harness.feed("b.xml", 0, EventRole::Start, "x");
        harness.feed("b.xml", 1, EventRole::End, "x");
        let outcome = harness.feed("c.xml", 0, EventRole::End, "x");
        let CorrelationOutcome::Matched(correlated) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(correlated.start().unwrap().origin(), "a.xml");

        let mut isolated = Harness::new(MatchPolicy::Latest, false);
        isolated.feed("a.xml", 0, EventRole::Start, "x");
        assert!(matches!(
            isolated.feed("b.xml", 0, EventRole::End, "x"),
            CorrelationOutcome::Orphan(..)
        ));
    }

    #[test]
    fn test_close_in_first_seen_order() {
        let mut harness = Harness::new(MatchPolicy::Latest, true);
        for (position, id) in ["c", "a", "b"].iter().enumerate() {
            harness.feed("a.xml", position as u64, EventRole::Start, id);
        }
        let outcomes = harness.correlator.close(&mut harness.pending);
        let positions = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                CorrelationOutcome::Orphan(CorrelatedEvent::StartOnly(start), warning) => {
                    assert_eq!(warning.kind, OrphanKind::StartWithoutEnd);
                    assert!(warning.to_string().ends_with("has no end."));
                    start.position()
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(harness.pending.is_empty());
    }

    #[test]
    fn test_orphans_of_both_kinds_are_warnings() {
        assert_eq!(OrphanWarning::LOG_LEVEL, log::Level::Warn);
        let mut harness = Harness::new(MatchPolicy::Latest, true);
        harness.feed("a.xml", 0, EventRole::Start, "s");
        let CorrelationOutcome::Orphan(_, end_warning) =
            harness.feed("a.xml", 1, EventRole::End, "e")
        else {
            panic!("expected an orphan end");
        };
        assert_eq!(end_warning.kind, OrphanKind::EndWithoutStart);
        let outcomes = harness.correlator.close(&mut harness.pending);
        assert!(matches!(
            outcomes.as_slice(),
            [CorrelationOutcome::Orphan(_, warning)] if warning.kind == OrphanKind::StartWithoutEnd
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(MatchPolicy::from_str("Earliest").unwrap(), MatchPolicy::Earliest);
        assert_eq!(MatchPolicy::from_str("latest").unwrap(), MatchPolicy::Latest);
        assert!(MatchPolicy::from_str("random").is_err());
    }
}
