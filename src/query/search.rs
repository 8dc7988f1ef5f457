use bon::Builder;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{Checked, Result, limit_to_count};
use crate::cache::{Direction, LogEntry, LogSnapshot};
use crate::format::sanitize;

#[derive(Debug, Clone, Default, Builder)]
pub struct SearchOptions {
    #[builder(into)]
    pub pattern: String,
    #[builder(default)]
    pub case_sensitive: bool,
    #[builder(default)]
    pub invert_match: bool,
    #[builder(default)]
    pub reverse: bool,
    /// Context on both sides unless a side is given explicitly
    #[builder(default)]
    pub context: u64,
    pub before_context: Option<u64>,
    pub after_context: Option<u64>,
    /// Forward: first row scanned. Reverse: last row scanned, 0 meaning the end.
    pub seek_start: Option<u64>,
    /// Maximum matches, 0 for no limit
    #[builder(default)]
    pub limit: u64,
}

/// A match with its surrounding rows, all in ascending row order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub row_number: u64,
    pub before: Vec<LogEntry>,
    #[serde(rename = "match")]
    pub matched: LogEntry,
    pub after: Vec<LogEntry>,
}

/// Search options with the pattern already compiled
#[derive(Debug, Clone)]
pub struct SearchQuery {
    regex: Regex,
    invert_match: bool,
    reverse: bool,
    before: u64,
    after: u64,
    seek_start: Option<u64>,
    limit: u64,
}

impl SearchQuery {
    pub fn compile(options: &SearchOptions) -> Result<Self> {
        let regex = RegexBuilder::new(&options.pattern)
            .case_insensitive(!options.case_sensitive)
            .build()?;

        Ok(Self {
            regex,
            invert_match: options.invert_match,
            reverse: options.reverse,
            before: options.before_context.unwrap_or(options.context),
            after: options.after_context.unwrap_or(options.context),
            seek_start: options.seek_start,
            limit: options.limit,
        })
    }

    pub fn is_hit(&self, entry: &LogEntry) -> bool {
        self.regex.is_match(&sanitize(&entry.content)) != self.invert_match
    }

    /// Rows to scan and the direction to scan them in
    fn scan_plan(&self, total: u64) -> (std::ops::Range<u64>, Direction) {
        let seek = self.seek_start.unwrap_or(0);
        if seek >= total && seek > 0 {
            return (total..total, Direction::Forward);
        }
        if self.reverse {
            let end = if seek == 0 { total } else { seek + 1 };
            (0..end, Direction::Backward)
        } else {
            (seek..total, Direction::Forward)
        }
    }

    fn with_context(&self, snapshot: &dyn LogSnapshot, matched: LogEntry) -> Result<SearchResult> {
        let row = matched.row_number;
        let before = snapshot
            .scan(row.saturating_sub(self.before)..row, Direction::Forward)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let after_start = row.saturating_add(1);
        let after = snapshot
            .scan(after_start..after_start.saturating_add(self.after), Direction::Forward)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(SearchResult {
            row_number: row,
            before,
            matched,
            after,
        })
    }
}

/// Matches in scan order, stopping after the query's limit
pub fn search<'a>(
    snapshot: &'a dyn LogSnapshot,
    query: &'a SearchQuery,
    cancel: &'a CancellationToken,
) -> impl Iterator<Item = Result<SearchResult>> + 'a {
    let (rows, direction) = query.scan_plan(snapshot.row_count());
    Checked::new(snapshot.scan(rows, direction), cancel)
        .filter_map(move |entry| match entry {
            Ok(entry) if query.is_hit(&entry) => Some(query.with_context(snapshot, entry)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .take(limit_to_count(query.limit))
}
