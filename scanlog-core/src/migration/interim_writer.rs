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

//! Newline-delimited JSON artifact of all produced documents.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use super::EventIdentity;
use super::MigrationError;
use super::MigrationErrorKind;

/// Write one document per line to the file at `path`, replacing any previous
/// content.
pub fn write_interim_file(
    path: &Path,
    documents: &[(EventIdentity, String)],
) -> Result<(), MigrationError> {
    let to_error = |e: std::io::Error| {
        MigrationErrorKind::Io
            .error_with_msg(format!("Unable to write '{}': {e}", path.display()))
    };
    let mut writer = BufWriter::new(File::create(path).map_err(to_error)?);
    for (_, document) in documents {
        writeln!(writer, "{document}").map_err(to_error)?;
    }
    writer.flush().map_err(to_error)?;
    log::info!(
        "Wrote {} documents to interim file '{}'.",
        documents.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.ndjson");
        let identity = EventIdentity::from_uuid(uuid::Uuid::from_u128(1));
        write_interim_file(
            &path,
            &[
                (identity, r#"{"uid":"a"}"#.to_string()),
                (identity, r#"{"uid":"b"}"#.to_string()),
            ],
        )
        .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"uid\":\"a\"}\n{\"uid\":\"b\"}\n");
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let error = write_interim_file(&dir.path().join("missing/out.ndjson"), &[]).unwrap_err();
        assert_eq!(error.kind(), &MigrationErrorKind::Io);
    }
}
