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

//! Time related utility functions.

use chrono::NaiveDateTime;

/// Layout of date and time in scan logs, like `2014-10-13 22:08:08`.
const SCAN_LOG_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Microseconds since UNIX epoch
pub fn get_timestamp_micros() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or_default()
}

/// Parse a scan log date and time (interpreted as UTC) into seconds since
/// UNIX epoch.
///
/// Return `None` if the value does not follow the scan log layout.
pub fn parse_scan_log_epoch_seconds(value: &str) -> Option<f64> {
    NaiveDateTime::parse_from_str(value.trim(), SCAN_LOG_DATE_TIME_FORMAT)
        .ok()
        .map(|date_time| date_time.and_utc().timestamp() as f64)
}
