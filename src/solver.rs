use crate::classify::{classify, CategoryCursor, Step};
use crate::error::{Result, SolverError};
use crate::normalize::{normalize_category, normalize_hint};
use crate::statement::{open_statements, ScanConfig, Statements};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

/// Default cap on matched words per query
pub const DEFAULT_LIMIT: usize = 200;

/// Normalized category ids a query is restricted to
pub type AllowedCategorySet = FxHashSet<String>;

/// How a record's hint is compared with the query hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchMode {
    /// Compare two already-normalized hints
    #[inline]
    pub fn matches(self, hint: &str, query: &str) -> bool {
        match self {
            MatchMode::Exact => hint == query,
            MatchMode::Contains => hint.contains(query),
            MatchMode::StartsWith => hint.starts_with(query),
            MatchMode::EndsWith => hint.ends_with(query),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Contains => "contains",
            MatchMode::StartsWith => "startswith",
            MatchMode::EndsWith => "endswith",
        }
    }
}

impl FromStr for MatchMode {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "contains" => Ok(MatchMode::Contains),
            "startswith" => Ok(MatchMode::StartsWith),
            "endswith" => Ok(MatchMode::EndsWith),
            _ => Err(SolverError::UnknownMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query options
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions<'a> {
    /// Hint comparison mode
    pub mode: MatchMode,

    /// Stop the scan once this many words have matched
    pub limit: usize,

    /// Restrict matches to these normalized category ids (None = all)
    pub allowed: Option<&'a AllowedCategorySet>,
}

impl Default for QueryOptions<'_> {
    fn default() -> Self {
        Self {
            mode: MatchMode::Exact,
            limit: DEFAULT_LIMIT,
            allowed: None,
        }
    }
}

/// Words matched under one category, in scan order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchGroup {
    /// `"{name} ({id})"`
    pub header: String,
    pub words: Vec<String>,
}

/// Matches grouped by category header, groups in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedMatches {
    groups: Vec<MatchGroup>,
    #[serde(skip)]
    lookup: FxHashMap<String, usize>,
}

impl GroupedMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `word` to the group for `header`, creating the group if needed
    pub fn push(&mut self, header: &str, word: String) {
        let idx = match self.lookup.get(header) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.lookup.insert(header.to_string(), idx);
                self.groups.push(MatchGroup {
                    header: header.to_string(),
                    words: Vec::new(),
                });
                idx
            }
        };
        self.groups[idx].words.push(word);
    }

    /// Words for one header
    pub fn get(&self, header: &str) -> Option<&[String]> {
        self.lookup
            .get(header)
            .map(|&idx| self.groups[idx].words.as_slice())
    }

    pub fn groups(&self) -> &[MatchGroup] {
        &self.groups
    }

    /// Total matched words across all groups
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.words.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<H: Into<String>> FromIterator<(H, Vec<String>)> for GroupedMatches {
    fn from_iter<T: IntoIterator<Item = (H, Vec<String>)>>(iter: T) -> Self {
        let mut grouped = GroupedMatches::new();
        for (header, words) in iter {
            let header = header.into();
            for word in words {
                grouped.push(&header, word);
            }
        }
        grouped
    }
}

/// Why a scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStop {
    /// The source was read to the end
    Exhausted,
    /// `limit` words matched
    LimitReached,
    /// The statement ceiling was hit
    StatementCeiling,
}

/// Result of a query scan
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub matches: GroupedMatches,

    /// Statements read before the scan ended
    pub statements_scanned: usize,

    pub stop: ScanStop,
}

/// Run one query scan over a statement stream
///
/// The limit truncates the scan in file order: once `limit` words match the
/// scan stops, so categories later in the file may be missing entirely even
/// if they hold matches. It is not a top-K over the whole dataset.
///
/// The iterator's end is taken as end of input. Use [`solve_stream`] to have
/// read errors reported.
pub fn solve_statements<I>(
    statements: I,
    query_hint: &str,
    options: &QueryOptions<'_>,
    max_statements: Option<usize>,
) -> QueryResult
where
    I: IntoIterator<Item = String>,
{
    let mut matches = GroupedMatches::new();
    let mut statements_scanned = 0;

    if options.limit == 0 {
        return QueryResult {
            matches,
            statements_scanned,
            stop: ScanStop::LimitReached,
        };
    }

    let query = normalize_hint(query_hint);
    let mut cursor = CategoryCursor::new();
    let mut cursor_key = normalize_category(cursor.id());
    let mut header = format!("{} ({})", cursor.name(), cursor.id());
    let mut total = 0;

    for statement in statements {
        if max_statements.is_some_and(|max| statements_scanned >= max) {
            log::debug!("Query scan hit statement ceiling after {statements_scanned} statements");
            return QueryResult {
                matches,
                statements_scanned,
                stop: ScanStop::StatementCeiling,
            };
        }
        statements_scanned += 1;

        match cursor.advance(classify(&statement)) {
            Step::CategoryChanged => {
                cursor_key = normalize_category(cursor.id());
                header = format!("{} ({})", cursor.name(), cursor.id());
            }
            Step::Entry { word, hint } => {
                if let Some(allowed) = options.allowed {
                    if !allowed.contains(&cursor_key) {
                        continue;
                    }
                }

                if !options.mode.matches(&normalize_hint(&hint), &query) {
                    continue;
                }

                matches.push(&header, word);
                total += 1;

                if total >= options.limit {
                    log::debug!("Query scan reached limit of {} matches", options.limit);
                    return QueryResult {
                        matches,
                        statements_scanned,
                        stop: ScanStop::LimitReached,
                    };
                }
            }
            Step::Skip => {}
        }
    }

    QueryResult {
        matches,
        statements_scanned,
        stop: ScanStop::Exhausted,
    }
}

/// Run one query scan over a statement stream, failing if a read breaks off
pub fn solve_stream<R: BufRead>(
    mut statements: Statements<R>,
    query_hint: &str,
    options: &QueryOptions<'_>,
    max_statements: Option<usize>,
) -> Result<QueryResult> {
    let result = solve_statements(statements.by_ref(), query_hint, options, max_statements);

    match statements.take_error() {
        Some(e) => Err(e.into()),
        None => Ok(result),
    }
}

/// Scan the dataset at `path` for words whose hint matches `query_hint`
pub fn solve(
    path: &Path,
    query_hint: &str,
    options: &QueryOptions<'_>,
    config: &ScanConfig,
) -> Result<QueryResult> {
    let start = Instant::now();
    let statements = open_statements(path, config)?;
    let result = solve_stream(statements, query_hint, options, config.max_statements)?;

    log::debug!(
        "Solved {:?} ({}) in {:.3}ms: {} matches over {} statements",
        query_hint,
        options.mode,
        start.elapsed().as_secs_f64() * 1000.0,
        result.matches.total(),
        result.statements_scanned
    );

    Ok(result)
}

/// Solve several hints in parallel, each with its own scan of the dataset
///
/// Results come back in the order of `hints`.
pub fn solve_batch(
    path: &Path,
    hints: &[String],
    options: &QueryOptions<'_>,
    config: &ScanConfig,
) -> Vec<Result<QueryResult>> {
    hints
        .par_iter()
        .map(|hint| solve(path, hint, options, config))
        .collect()
}
