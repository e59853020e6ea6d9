//! Log record formats accepted by `--log-format` and `SURREAL_LOG_FORMAT`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the probe renders tracing events on stderr.
///
/// Parsing is case-insensitive, so `JSON` and `json` select the same format.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for log shippers.
    Json,
    /// Terse single-line records for a terminal session.
    #[default]
    Compact,
}

/// Error returned when a log format name is not recognised.
pub type LogFormatParseError = strum::ParseError;
