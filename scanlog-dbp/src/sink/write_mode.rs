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

//! Behavior when a document with the same identity already exists.

use std::fmt;
use std::str::FromStr;

use crate::sink::SinkError;
use crate::sink::SinkErrorKind;

/// Behavior when a document with the same identity already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the existing document (upsert).
    #[default]
    Overwrite,
    /// Keep the existing document and fail the write as a duplicate key.
    Reject,
}

impl WriteMode {
    /// Configuration value of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for WriteMode {
    type Err = SinkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "overwrite" | "upsert" => Ok(Self::Overwrite),
            "reject" | "insert" => Ok(Self::Reject),
            other => Err(SinkErrorKind::Configuration
                .error_with_msg(format!("Unknown write mode '{other}'."))),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_mode() {
        assert_eq!("overwrite".parse::<WriteMode>().unwrap(), WriteMode::Overwrite);
        assert_eq!(" Reject ".parse::<WriteMode>().unwrap(), WriteMode::Reject);
        assert_eq!("insert".parse::<WriteMode>().unwrap(), WriteMode::Reject);
        let err = "append".parse::<WriteMode>().unwrap_err();
        assert_eq!(err.kind(), &SinkErrorKind::Configuration);
    }
}
