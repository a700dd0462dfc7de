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

//! Removal of repeated events across the whole run.

use std::collections::HashSet;

use super::AttributeMap;
use super::EventRole;
use super::RawEvent;

/** Drops events whose content has already been seen in this run.

Content is the role and the attributes, regardless of attribute order. The
file of origin and the extraction position are not part of it. The first
occurrence wins.
*/
#[derive(Default)]
pub struct Deduplicator {
    seen: HashSet<(EventRole, Vec<(String, String)>)>,
    removed: u64,
}

impl Deduplicator {
    /// Return a new instance with no accumulated state.
    pub fn new() -> Self {
        Self::default()
    }

    fn content_key(role: EventRole, attributes: &AttributeMap) -> (EventRole, Vec<(String, String)>) {
        (role, attributes.content_key())
    }

    /// Return `true` and remember the event if its content is new.
    pub fn admit(&mut self, raw_event: &RawEvent) -> bool {
        let admitted = self
            .seen
            .insert(Self::content_key(raw_event.role(), raw_event.attributes()));
        if !admitted {
            self.removed += 1;
            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "Dropping duplicate {} event '{}' at '{}' #{}.",
                    raw_event.role(),
                    raw_event.original_id(),
                    raw_event.origin(),
                    raw_event.position()
                );
            }
        }
        admitted
    }

    /// Return the events of one file that have not been seen before, in
    /// their original order.
    pub fn deduplicate(&mut self, raw_events: Vec<RawEvent>) -> Vec<RawEvent> {
        raw_events
            .into_iter()
            .filter(|raw_event| self.admit(raw_event))
            .collect()
    }

    /// Number of events dropped so far.
    pub fn removed_count(&self) -> u64 {
        self.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(origin: &str, position: u64, id: &str) -> RawEvent {
        RawEvent::new(
            origin,
            position,
            EventRole::Start,
            id,
            id,
            AttributeMap::from_iter([("id", id), ("role", "start")]),
        )
    }

    #[test]
    fn test_duplicates_across_files() {
        let mut deduplicator = Deduplicator::new();
        let first = deduplicator.deduplicate(vec![start("a.xml", 0, "c1"), start("a.xml", 1, "c2")]);
        let second = deduplicator.deduplicate(vec![start("b.xml", 0, "c1"), start("b.xml", 1, "c3")]);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].original_id(), "c3");
        assert_eq!(deduplicator.removed_count(), 1);
    }

    #[test]
    fn test_role_is_part_of_content() {
        let mut deduplicator = Deduplicator::new();
        let end = RawEvent::new(
            "a.xml",
            1,
            EventRole::End,
            "c1",
            "c1",
            AttributeMap::from_iter([("id", "c1"), ("role", "start")]),
        );
        assert_eq!(deduplicator.deduplicate(vec![start("a.xml", 0, "c1"), end]).len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let raw_events = vec![
            start("a.xml", 0, "c1"),
            start("a.xml", 1, "c1"),
            start("a.xml", 2, "c2"),
        ];
        let once = Deduplicator::new().deduplicate(raw_events);
        let twice = Deduplicator::new().deduplicate(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
