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

//! Summary of a migration run.

use serde::Serialize;
use std::fmt;

use super::EventIdentity;
use super::FailedWrite;
use super::OrphanKind;
use super::OrphanWarning;

/// An input file that could not be used.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    /// Path of the file.
    pub path: String,
    /// Why the file was rejected.
    pub error: String,
}

/// Counters and findings of one migration run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MigrationReport {
    /// Files whose events were used.
    pub files_processed: u64,
    /// Files rejected as a whole.
    pub files_failed: Vec<FailedFile>,
    /// Events read from all processed files.
    pub events_extracted: u64,
    /// Events dropped as duplicates.
    pub duplicates_removed: u64,
    /// Unmatched start and end events.
    pub orphan_warnings: Vec<OrphanWarning>,
    /// Documents built from correlated events.
    pub documents_produced: u64,
    /// Documents persisted in the store.
    pub documents_written: u64,
    /// Documents that failed to be written.
    pub failed_writes: Vec<FailedWrite>,
    /// Documents skipped after cancellation.
    pub not_attempted: Vec<EventIdentity>,
    /// Failure to write the interim artifact, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interim_error: Option<String>,
    /// `true` if the run was stopped before all documents were written.
    pub cancelled: bool,
    /// Time of application startup in epoch microseconds.
    pub startup_ts_micros: u64,
    /// Time the run completed in epoch microseconds.
    pub finished_ts_micros: u64,
}

impl MigrationReport {
    /// Return `true` unless an input file failed.
    ///
    /// Failed document writes do not make the run unsuccessful.
    pub fn is_success(&self) -> bool {
        self.files_failed.is_empty()
    }

    /// Number of orphans of the given kind.
    pub fn orphan_count(&self, kind: OrphanKind) -> usize {
        self.orphan_warnings
            .iter()
            .filter(|warning| warning.kind == kind)
            .count()
    }

    /// Microseconds from application startup until the run completed.
    pub fn elapsed_micros(&self) -> u64 {
        self.finished_ts_micros.saturating_sub(self.startup_ts_micros)
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Migration summary")?;
        writeln!(f, "  files processed:    {}", self.files_processed)?;
        writeln!(f, "  files failed:       {}", self.files_failed.len())?;
        for failed in &self.files_failed {
            writeln!(f, "    {}: {}", failed.path, failed.error)?;
        }
        writeln!(f, "  events extracted:   {}", self.events_extracted)?;
        writeln!(f, "  duplicates removed: {}", self.duplicates_removed)?;
        writeln!(
            f,
            "  orphan events:      {} (end without start: {}, start without end: {})",
            self.orphan_warnings.len(),
            self.orphan_count(OrphanKind::EndWithoutStart),
            self.orphan_count(OrphanKind::StartWithoutEnd)
        )?;
        writeln!(f, "  documents produced: {}", self.documents_produced)?;
        writeln!(f, "  documents written:  {}", self.documents_written)?;
        writeln!(f, "  documents failed:   {}", self.failed_writes.len())?;
        for failed in &self.failed_writes {
            writeln!(f, "    {}: {}", failed.identity, failed.error)?;
        }
        if let Some(interim_error) = &self.interim_error {
            writeln!(f, "  interim file:       {interim_error}")?;
        }
        if self.cancelled {
            writeln!(
                f,
                "  cancelled:          {} documents not attempted",
                self.not_attempted.len()
            )?;
        }
        writeln!(
            f,
            "  elapsed:            {:.3} s",
            self.elapsed_micros() as f64 / 1_000_000.0
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_ignores_write_failures() {
        let identity = EventIdentity::from_uuid(uuid::Uuid::from_u128(3));
        let mut report = MigrationReport {
            failed_writes: vec![FailedWrite {
                identity,
                error: "Rejected".to_string(),
                attempts: 1,
            }],
            ..Default::default()
        };
        assert!(report.is_success());
        assert!(report.to_string().contains(&identity.to_string()));
        report.files_failed.push(FailedFile {
            path: "bad.xml".to_string(),
            error: "MalformedLogEntry".to_string(),
        });
        assert!(!report.is_success());
        report.startup_ts_micros = 1_000_000;
        report.finished_ts_micros = 3_500_000;
        assert_eq!(report.elapsed_micros(), 2_500_000);
        assert!(report.to_string().contains("elapsed:            2.500 s"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files_failed"][0]["path"], "bad.xml");
    }
}
