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

//! Expansion of command line inputs into an ordered list of log files.

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use super::MigrationError;
use super::MigrationErrorKind;

/// Return the XML log files named by `inputs`.
///
/// Files are taken as given and directories are scanned (not recursively)
/// for `*.xml` files. The result is sorted by file name, which is the
/// chronological order of date-named scan logs, without repeated paths.
pub fn discover_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, MigrationError> {
    let mut files = BTreeSet::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input).map_err(|e| {
                MigrationErrorKind::Io
                    .error_with_msg(format!("Unable to list '{}': {e}", input.display()))
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|e| {
                        MigrationErrorKind::Io
                            .error_with_msg(format!("Unable to list '{}': {e}", input.display()))
                    })?
                    .path();
                if path.is_file() && is_xml(&path) {
                    files.insert(path);
                }
            }
        } else {
            files.insert(input.to_owned());
        }
    }
    let mut files = files.into_iter().collect::<Vec<_>>();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("Discovered {} input files: {files:?}", files.len());
    }
    Ok(files)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directories_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        for name in ["2014-10-13-scanlog.xml", "2014-09-01-scanlog.XML", "notes.txt"] {
            std::fs::write(dir.path().join(name), "<log/>").unwrap();
        }
        std::fs::write(nested.join("2014-01-01-scanlog.xml"), "<log/>").unwrap();
        let explicit = nested.join("2014-01-01-scanlog.xml");
        let files = discover_inputs(&[
            dir.path().to_path_buf(),
            explicit.clone(),
            explicit.clone(),
        ])
        .unwrap();
        assert_eq!(
            files,
            vec![
                explicit,
                dir.path().join("2014-09-01-scanlog.XML"),
                dir.path().join("2014-10-13-scanlog.xml"),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_kept_for_reporting() {
        let files = discover_inputs(&[PathBuf::from("does-not-exist.xml")]).unwrap();
        assert_eq!(files.len(), 1);
    }
}
