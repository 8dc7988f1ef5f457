//! Raw job log parsing
//!
//! Splits a downloaded log into rows. Each line may start with one or more
//! timestamp markers of the form `ESC _bk;t=<millis> BEL`; the first one sets
//! the row timestamp and all of them are removed from the content. Section
//! headers (`~~~ `, `--- `, `+++ `) open a group that the header and every
//! following row belong to, and `$ ` lines are command echoes.

use std::sync::LazyLock;

use regex::Regex;

use crate::cache::LogEntry;
use crate::format::sanitize;

static TIMESTAMP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b_bk;t=(\d+)\x07").expect("valid marker regex"));

const GROUP_PREFIXES: [&str; 3] = ["~~~ ", "--- ", "+++ "];
const COMMAND_PREFIX: &str = "$ ";

/// Incremental parser keeping the current group across lines
#[derive(Debug, Default)]
pub struct LogParser {
    next_row: u64,
    group: Option<String>,
}

impl LogParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_line(&mut self, line: &str) -> LogEntry {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let timestamp = TIMESTAMP_MARKER
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok());
        let content = TIMESTAMP_MARKER.replace_all(line, "").into_owned();

        let visible = sanitize(&content);
        if let Some(name) = GROUP_PREFIXES
            .iter()
            .find_map(|prefix| visible.strip_prefix(prefix))
        {
            let name = name.trim();
            self.group = (!name.is_empty()).then(|| name.to_string());
        }
        let is_command = visible.starts_with(COMMAND_PREFIX);

        let entry = LogEntry {
            row_number: self.next_row,
            timestamp,
            group: self.group.clone(),
            content,
            is_command,
        };
        self.next_row += 1;
        entry
    }
}

/// Parse a whole raw log into rows
pub fn parse_log(raw: &[u8]) -> Vec<LogEntry> {
    let text = String::from_utf8_lossy(raw);
    let body = text.strip_suffix('\n').unwrap_or(&text);
    if body.is_empty() {
        return Vec::new();
    }

    let mut parser = LogParser::new();
    body.split('\n').map(|line| parser.parse_line(line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_lines() {
        let entries = parse_log(b"first\nsecond\r\nthird\n");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].content, "second");
        let rows: Vec<u64> = entries.iter().map(|e| e.row_number).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_timestamp_marker() {
        let entries = parse_log(b"\x1b_bk;t=1700000000123\x07hello\n");
        assert_eq!(entries[0].timestamp, Some(1_700_000_000_123));
        assert_eq!(entries[0].content, "hello");
    }

    #[test]
    fn test_parse_groups_and_commands() {
        let raw = b"preamble\n~~~ Preparing\n$ git fetch\n--- :rspec: Tests\nok\n";
        let entries = parse_log(raw);

        assert_eq!(entries[0].group, None);
        assert_eq!(entries[1].group.as_deref(), Some("Preparing"));
        assert_eq!(entries[2].group.as_deref(), Some("Preparing"));
        assert!(entries[2].is_command);
        assert!(!entries[1].is_command);
        assert_eq!(entries[3].group.as_deref(), Some(":rspec: Tests"));
        assert_eq!(entries[4].group.as_deref(), Some(":rspec: Tests"));
    }

    #[test]
    fn test_parse_colored_command() {
        let entries = parse_log(b"\x1b[90m$\x1b[0m ls -la\n");
        assert!(entries[0].is_command);
        assert!(entries[0].content.contains('\x1b'));
    }

    #[test]
    fn test_parse_empty_log() {
        assert!(parse_log(b"").is_empty());
        assert!(parse_log(b"\n").is_empty());
        assert_eq!(parse_log(b"\n\n").len(), 1);
    }
}
