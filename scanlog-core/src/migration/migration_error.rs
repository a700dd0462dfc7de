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

//! Migration errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationErrorKind {
    /// General failure. See message for details.
    Unspecified,
    /// A log file is not well-formed XML or holds an event element that
    /// cannot be turned into a start or end event.
    MalformedLogEntry,
    /// Invalid or missing configuration.
    Configuration,
    /// Reading input or writing the interim artifact failed.
    Io,
    /// A document could not be mapped to or from its JSON representation.
    DocumentMapping,
}

impl MigrationErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> MigrationError {
        MigrationError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> MigrationError {
        MigrationError {
            kind: self,
            msg: None,
        }
    }
}

impl fmt::Display for MigrationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Migration error.

Create a new instance via [MigrationErrorKind].
*/
#[derive(Debug, Clone)]
pub struct MigrationError {
    kind: MigrationErrorKind,
    msg: Option<String>,
}

impl MigrationError {
    /// Return the type of error.
    pub fn kind(&self) -> &MigrationErrorKind {
        &self.kind
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{} {}", self.kind, msg)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AsRef<MigrationError> for MigrationError {
    fn as_ref(&self) -> &MigrationError {
        self
    }
}

impl Error for MigrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = MigrationErrorKind::MalformedLogEntry.error_with_msg("in 'a.xml' element #3");
        assert_eq!(error.to_string(), "MalformedLogEntry in 'a.xml' element #3");
        assert_eq!(error.kind(), &MigrationErrorKind::MalformedLogEntry);
        assert_eq!(MigrationErrorKind::Io.error().to_string(), "Io");
    }
}
