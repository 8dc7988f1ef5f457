//! Output encodings for log entries
//!
//! Every query response passes its entries through [`Formatter`], which
//! dispatches on [`OutputFormat`]. Unless `preserve_ansi` is requested,
//! content and group names are run through [`sanitize`] first.
//!
//! | format       | shape per entry                                      |
//! |--------------|------------------------------------------------------|
//! | raw          | `"content"`                                          |
//! | `text`       | `"[2024-05-01 10:00:00.000] [group] content"`        |
//! | `json`       | `{timestamp, group, content, command, row_number}`   |
//! | `json-terse` | `{ts, g, c, cmd, rn}` (default)                      |

mod sanitize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cache::LogEntry;

pub use sanitize::sanitize;

const TEXT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
    #[default]
    #[serde(rename = "json-terse")]
    JsonTerse,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::JsonTerse => "json-terse",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerboseLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub command: bool,
    pub row_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerseLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g: Option<String>,
    pub c: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cmd: bool,
    pub rn: u64,
}

/// One formatted entry; serializes as a bare string or an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormattedEntry {
    Line(String),
    Verbose(VerboseLogEntry),
    Terse(TerseLogEntry),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    pub format: OutputFormat,
    pub raw: bool,
    pub preserve_ansi: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat, raw: bool, preserve_ansi: bool) -> Self {
        Self {
            format,
            raw,
            preserve_ansi,
        }
    }

    fn content(&self, entry: &LogEntry) -> String {
        if self.preserve_ansi {
            entry.content.clone()
        } else {
            sanitize(&entry.content)
        }
    }

    fn group(&self, entry: &LogEntry) -> Option<String> {
        let group = entry.group.as_deref()?;
        let group = if self.preserve_ansi {
            group.to_string()
        } else {
            sanitize(group)
        };
        (!group.is_empty()).then_some(group)
    }

    pub fn format_entry(&self, entry: &LogEntry) -> FormattedEntry {
        let content = self.content(entry);
        if self.raw {
            return FormattedEntry::Line(content);
        }

        match self.format {
            OutputFormat::JsonTerse => FormattedEntry::Terse(TerseLogEntry {
                ts: entry.timestamp,
                g: self.group(entry),
                c: content,
                cmd: entry.is_command,
                rn: entry.row_number,
            }),
            OutputFormat::Json => FormattedEntry::Verbose(VerboseLogEntry {
                timestamp: entry.timestamp,
                group: self.group(entry),
                content,
                command: entry.is_command,
                row_number: entry.row_number,
            }),
            OutputFormat::Text => {
                let mut line = String::new();
                if let Some(ts) = entry.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis) {
                    line.push_str(&format!("[{}] ", ts.format(TEXT_TIMESTAMP_FORMAT)));
                }
                if let Some(group) = self.group(entry) {
                    line.push_str(&format!("[{}] ", group));
                }
                line.push_str(&content);
                FormattedEntry::Line(line)
            }
        }
    }

    pub fn format_entries(&self, entries: &[LogEntry]) -> Vec<FormattedEntry> {
        entries.iter().map(|entry| self.format_entry(entry)).collect()
    }
}

/// Sanitized content of every entry, one `\n`-terminated line each.
///
/// This is the only rendering of a whole log; inline and file delivery both
/// use its output verbatim.
pub fn plain_text<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> String {
    let mut text = String::new();
    for entry in entries {
        text.push_str(&sanitize(&entry.content));
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(row: u64) -> LogEntry {
        LogEntry {
            row_number: row,
            timestamp: Some(1_714_557_600_123),
            group: Some("\x1b[1m:rspec: Tests\x1b[0m".to_string()),
            content: "\x1b[31mFailure\x1b[0m in spec".to_string(),
            is_command: false,
        }
    }

    #[test]
    fn test_terse_is_default() {
        let formatted = Formatter::default().format_entry(&entry(0));
        assert_eq!(
            serde_json::to_value(formatted).unwrap(),
            json!({"ts": 1_714_557_600_123i64, "g": ":rspec: Tests", "c": "Failure in spec", "rn": 0})
        );
    }

    #[test]
    fn test_verbose_json() {
        let mut e = entry(7);
        e.is_command = true;
        e.timestamp = None;
        let formatted = Formatter::new(OutputFormat::Json, false, false).format_entry(&e);
        assert_eq!(
            serde_json::to_value(formatted).unwrap(),
            json!({"group": ":rspec: Tests", "content": "Failure in spec", "command": true, "row_number": 7})
        );
    }

    #[test]
    fn test_text_format() {
        let formatted = Formatter::new(OutputFormat::Text, false, false).format_entry(&entry(1));
        assert_eq!(
            formatted,
            FormattedEntry::Line(
                "[2024-05-01 10:00:00.123] [:rspec: Tests] Failure in spec".to_string()
            )
        );

        let bare = LogEntry {
            row_number: 2,
            timestamp: None,
            group: None,
            content: "plain".to_string(),
            is_command: false,
        };
        let formatted = Formatter::new(OutputFormat::Text, false, false).format_entry(&bare);
        assert_eq!(formatted, FormattedEntry::Line("plain".to_string()));
    }

    #[test]
    fn test_raw_overrides_format() {
        for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::JsonTerse] {
            let formatted = Formatter::new(format, true, false).format_entry(&entry(0));
            assert_eq!(formatted, FormattedEntry::Line("Failure in spec".to_string()));
        }
    }

    #[test]
    fn test_preserve_ansi() {
        let formatted = Formatter::new(OutputFormat::JsonTerse, true, true).format_entry(&entry(0));
        assert_eq!(
            formatted,
            FormattedEntry::Line("\x1b[31mFailure\x1b[0m in spec".to_string())
        );
    }

    #[test]
    fn test_format_names() {
        let parsed: OutputFormat = serde_json::from_value(json!("json-terse")).unwrap();
        assert_eq!(parsed, OutputFormat::JsonTerse);
        assert!(serde_json::from_value::<OutputFormat>(json!("yaml")).is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_plain_text() {
        let entries = vec![entry(0), entry(1)];
        assert_eq!(plain_text(&entries), "Failure in spec\nFailure in spec\n");
        assert_eq!(plain_text(Vec::<LogEntry>::new().iter()), "");
    }
}
