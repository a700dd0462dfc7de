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

//! Document sink errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    /// Temporary failure like a connectivity problem or an overloaded store.
    /// Retrying the same write later might succeed.
    Transient,
    /// A document with the same identity already exists and the write mode
    /// does not allow it to be replaced.
    DuplicateKey,
    /// The store refused the document. Retrying will not help.
    Rejected,
    /// The document could not be encoded or a response could not be decoded.
    Serialization,
    /// The provider could not be set up.
    Configuration,
}

impl SinkErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> SinkError {
        SinkError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> SinkError {
        SinkError {
            kind: self,
            msg: None,
        }
    }
}

impl fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Document sink error.

Create a new instance via [SinkErrorKind].
*/
#[derive(Debug, Clone)]
pub struct SinkError {
    kind: SinkErrorKind,
    msg: Option<String>,
}

impl SinkError {
    /// Return the type of error.
    pub fn kind(&self) -> &SinkErrorKind {
        &self.kind
    }

    /// Return `true` if the failed operation might succeed when retried.
    pub fn is_transient(&self) -> bool {
        self.kind == SinkErrorKind::Transient
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{} {}", self.kind, msg)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AsRef<SinkError> for SinkError {
    fn as_ref(&self) -> &SinkError {
        self
    }
}

impl Error for SinkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(SinkErrorKind::Transient.error().is_transient());
        assert!(!SinkErrorKind::DuplicateKey.error().is_transient());
        assert!(!SinkErrorKind::Rejected.error().is_transient());
    }

    #[test]
    fn test_display_with_and_without_message() {
        assert_eq!(SinkErrorKind::Rejected.error().to_string(), "Rejected");
        assert_eq!(
            SinkErrorKind::DuplicateKey
                .error_with_msg("uid 'abc' exists.")
                .to_string(),
            "DuplicateKey uid 'abc' exists."
        );
    }
}
