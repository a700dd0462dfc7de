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

//! Lazy extraction of start and end events from one XML scan log.

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use super::AttributeMap;
use super::EventRole;
use super::MigrationError;
use super::MigrationErrorKind;
use super::RawEvent;
use crate::conf::ExtractConfig;

/// Rules for selecting, reading and classifying event elements.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    event_tag: Option<String>,
    id_attribute: String,
    role_attribute: String,
    reference_attribute: Option<String>,
    start_values: Vec<String>,
    end_values: Vec<String>,
    start_marker: String,
    end_marker: String,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            event_tag: None,
            id_attribute: "id".to_string(),
            role_attribute: "role".to_string(),
            reference_attribute: None,
            start_values: vec!["start".into(), "started".into(), "begin".into()],
            end_values: vec!["end".into(), "ended".into(), "stop".into(), "stopped".into()],
            start_marker: "started".to_string(),
            end_marker: "ended".to_string(),
        }
    }
}

impl From<&ExtractConfig> for ExtractionRules {
    fn from(extract_config: &ExtractConfig) -> Self {
        let lowercase = |values: Vec<String>| {
            values
                .into_iter()
                .map(|value| value.to_lowercase())
                .collect()
        };
        Self {
            event_tag: extract_config.event_tag().map(str::to_string),
            id_attribute: extract_config.id_attribute().to_string(),
            role_attribute: extract_config.role_attribute().to_string(),
            reference_attribute: extract_config.reference_attribute().map(str::to_string),
            start_values: lowercase(extract_config.start_values()),
            end_values: lowercase(extract_config.end_values()),
            start_marker: extract_config.start_marker().to_string(),
            end_marker: extract_config.end_marker().to_string(),
        }
    }
}

impl ExtractionRules {
    /// Only treat root children with this tag as events.
    pub fn with_event_tag(mut self, event_tag: &str) -> Self {
        self.event_tag = Some(event_tag.to_string());
        self
    }

    /// Let end events reference their start through this attribute.
    pub fn with_reference_attribute(mut self, reference_attribute: &str) -> Self {
        self.reference_attribute = Some(reference_attribute.to_string());
        self
    }

    /// Attribute holding the source-provided identifier.
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    fn role_of(&self, value: &str) -> Option<EventRole> {
        let value = value.trim().to_lowercase();
        if self.start_values.contains(&value) {
            Some(EventRole::Start)
        } else if self.end_values.contains(&value) {
            Some(EventRole::End)
        } else {
            None
        }
    }
}

/// Owned copy of the parts of a parser event the extractor cares about.
enum XmlToken {
    Start(String, Vec<(String, String)>),
    Empty(String, Vec<(String, String)>),
    End,
    Text(String),
    Eof,
    Ignored,
}

/// Direct child of an event element.
struct ChildNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
}

impl ChildNode {
    /// Text content if present, otherwise the attribute values joined by a
    /// space.
    fn value(&self) -> String {
        let text = self.text.trim();
        if !text.is_empty() || self.attributes.is_empty() {
            text.to_string()
        } else {
            self.attributes
                .iter()
                .map(|(_, value)| value.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Event element under construction.
struct ElementNode {
    index: u64,
    offset: u64,
    attributes: Vec<(String, String)>,
    children: Vec<ChildNode>,
}

/** Lazy sequence of [RawEvent]s in document order.

Only direct children of the root element are event elements. The sequence
ends after the first error.
*/
pub struct XmlEventExtractor<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
    origin: String,
    rules: ExtractionRules,
    depth: usize,
    seen_root: bool,
    element_count: u64,
    next_position: u64,
    current: Option<ElementNode>,
    ready: VecDeque<RawEvent>,
    finished: bool,
}

impl XmlEventExtractor<BufReader<File>> {
    /// Return a new instance reading from the file at `path`.
    pub fn from_file(path: &Path, rules: &ExtractionRules) -> Result<Self, MigrationError> {
        let file = File::open(path).map_err(|e| {
            MigrationErrorKind::Io
                .error_with_msg(format!("Unable to open '{}': {e}", path.display()))
        })?;
        Ok(Self::new(
            BufReader::new(file),
            &path.display().to_string(),
            rules,
        ))
    }
}

impl<R: BufRead> XmlEventExtractor<R> {
    /// Return a new instance. `origin` names the source in events and errors.
    pub fn new(source: R, origin: &str, rules: &ExtractionRules) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buffer: Vec::new(),
            origin: origin.to_string(),
            rules: rules.clone(),
            depth: 0,
            seen_root: false,
            element_count: 0,
            next_position: 0,
            current: None,
            ready: VecDeque::new(),
            finished: false,
        }
    }

    fn byte_offset(&self) -> u64 {
        u64::try_from(self.reader.buffer_position()).unwrap_or_default()
    }

    fn malformed(&self, element: Option<u64>, offset: u64, reason: &str) -> MigrationError {
        let location = element
            .map(|index| format!(" element #{index}"))
            .unwrap_or_default();
        MigrationErrorKind::MalformedLogEntry.error_with_msg(format!(
            "in '{}'{location} at byte {offset}: {reason}",
            self.origin
        ))
    }

    fn read_token(&mut self) -> Result<XmlToken, String> {
        let token = match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Start(start)) => {
                let (name, attributes) = element_parts(&start)?;
                XmlToken::Start(name, attributes)
            }
            Ok(Event::Empty(start)) => {
                let (name, attributes) = element_parts(&start)?;
                XmlToken::Empty(name, attributes)
            }
            Ok(Event::End(_)) => XmlToken::End,
            Ok(Event::Text(text)) => XmlToken::Text(
                text.unescape().map_err(|e| e.to_string())?.into_owned(),
            ),
            Ok(Event::CData(cdata)) => XmlToken::Text(
                String::from_utf8_lossy(&cdata.into_inner()).into_owned(),
            ),
            Ok(Event::Eof) => XmlToken::Eof,
            Ok(_) => XmlToken::Ignored,
            Err(e) => return Err(e.to_string()),
        };
        self.buffer.clear();
        Ok(token)
    }

    /// Consume one parser event.
    fn advance(&mut self) -> Result<(), MigrationError> {
        let offset = self.byte_offset();
        let element = self.current.as_ref().map(|current| current.index);
        let token = self
            .read_token()
            .map_err(|reason| self.malformed(element, offset, &reason))?;
        match token {
            XmlToken::Start(name, attributes) => {
                self.open(name, attributes, offset)?;
                self.depth += 1;
            }
            XmlToken::Empty(name, attributes) => {
                self.open(name, attributes, offset)?;
                self.depth += 1;
                self.close()?;
            }
            XmlToken::End => self.close()?,
            XmlToken::Text(text) => {
                if self.depth == 0 && !text.trim().is_empty() {
                    return Err(self.malformed(None, offset, "text outside the root element"));
                }
                if self.depth == 3 {
                    if let Some(child) = self
                        .current
                        .as_mut()
                        .and_then(|current| current.children.last_mut())
                    {
                        child.text.push_str(&text);
                    }
                }
            }
            XmlToken::Eof => {
                if !self.seen_root {
                    return Err(self.malformed(None, offset, "no root element"));
                }
                if self.depth > 0 {
                    return Err(self.malformed(element, offset, "unexpected end of file"));
                }
                self.finished = true;
            }
            XmlToken::Ignored => {}
        }
        Ok(())
    }

    fn open(
        &mut self,
        name: String,
        attributes: Vec<(String, String)>,
        offset: u64,
    ) -> Result<(), MigrationError> {
        match self.depth {
            0 => {
                if self.seen_root {
                    return Err(self.malformed(None, offset, "more than one root element"));
                }
                self.seen_root = true;
            }
            1 => {
                let selected = self
                    .rules
                    .event_tag
                    .as_ref()
                    .is_none_or(|event_tag| event_tag == &name);
                if selected {
                    self.current = Some(ElementNode {
                        index: self.element_count,
                        offset,
                        attributes,
                        children: Vec::new(),
                    });
                    self.element_count += 1;
                }
            }
            2 => {
                if let Some(current) = self.current.as_mut() {
                    current.children.push(ChildNode {
                        name,
                        attributes,
                        text: String::new(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), MigrationError> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 1 {
            if let Some(element) = self.current.take() {
                self.classify(element)?;
            }
        }
        Ok(())
    }

    /// Turn a complete event element into one or two [RawEvent]s.
    fn classify(&mut self, element: ElementNode) -> Result<(), MigrationError> {
        let malformed = |reason: String| self.malformed(Some(element.index), element.offset, &reason);
        let rules = &self.rules;
        let explicit_role = element
            .attributes
            .iter()
            .find(|(name, _)| name == &rules.role_attribute)
            .map(|(_, value)| value.as_str());
        let has_child = |tag: &str| element.children.iter().any(|child| child.name == tag);
        let gather = |exclude: Option<&str>, only: Option<&str>| {
            let mut attributes = AttributeMap::new();
            for (name, value) in &element.attributes {
                attributes.insert_unique(name, value);
            }
            for child in &element.children {
                if exclude.is_some_and(|tag| tag == child.name)
                    || only.is_some_and(|tag| tag != child.name)
                {
                    continue;
                }
                attributes.insert_unique(&child.name, &child.value());
            }
            attributes
        };
        let original_id = element
            .attributes
            .iter()
            .find(|(name, _)| name == &rules.id_attribute)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                malformed(format!(
                    "missing identifier attribute '{}'",
                    rules.id_attribute
                ))
            })?;
        let reference_of = |attributes: &AttributeMap| {
            rules
                .reference_attribute
                .as_deref()
                .and_then(|reference_attribute| attributes.get(reference_attribute))
                .map(str::trim)
                .filter(|reference| !reference.is_empty())
                .unwrap_or(original_id.as_str())
                .to_string()
        };
        let mut events = Vec::with_capacity(2);
        if let Some(role_value) = explicit_role {
            let role = rules.role_of(role_value).ok_or_else(|| {
                malformed(format!(
                    "unknown value '{role_value}' of role attribute '{}'",
                    rules.role_attribute
                ))
            })?;
            let attributes = gather(None, None);
            let reference = match role {
                EventRole::Start => original_id.clone(),
                EventRole::End => reference_of(&attributes),
            };
            events.push((role, reference, attributes));
        } else if has_child(&rules.start_marker) {
            events.push((
                EventRole::Start,
                original_id.clone(),
                gather(Some(&rules.end_marker), None),
            ));
            if has_child(&rules.end_marker) {
                let attributes = gather(None, Some(&rules.end_marker));
                let reference = reference_of(&attributes);
                events.push((EventRole::End, reference, attributes));
            }
        } else {
            return Err(malformed(format!(
                "neither a '{}' attribute nor a '{}' child",
                rules.role_attribute, rules.start_marker
            )));
        }
        for (role, reference, attributes) in events {
            self.ready.push_back(RawEvent::new(
                &self.origin,
                self.next_position,
                role,
                &original_id,
                &reference,
                attributes,
            ));
            self.next_position += 1;
        }
        Ok(())
    }
}

impl<R: BufRead> Iterator for XmlEventExtractor<R> {
    type Item = Result<RawEvent, MigrationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(raw_event) = self.ready.pop_front() {
                return Some(Ok(raw_event));
            }
            if self.finished {
                return None;
            }
            if let Err(e) = self.advance() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

/// Owned element name and unescaped attributes.
fn element_parts(start: &BytesStart) -> Result<(String, Vec<(String, String)>), String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(|e| e.to_string())?;
        attributes.push((key, value.into_owned()));
    }
    Ok((name, attributes))
}

/// Read all events of one file.
///
/// Fails with the first error, so no events of a malformed file are used.
pub fn extract_file(path: &Path, rules: &ExtractionRules) -> Result<Vec<RawEvent>, MigrationError> {
    XmlEventExtractor::from_file(path, rules)?.collect()
}
