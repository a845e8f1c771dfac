//! Streaming hint solver over loosely-structured word dumps
//!
//! The dataset is a text dump in informal object-literal notation: category
//! definitions (`{'category_id': '1', 'name': 'Foods & Drinks'};`) followed by
//! the word/hint entries that belong to them (`{'word': 'Bread', 'hint': 'Yeast'};`).
//! Nothing is loaded whole. Every operation is one forward scan over
//! `;`-terminated statements with bounded buffering.
//!
//! # Example
//!
//! ```no_run
//! use hintsolver::{build_category_index, format_compact, solve, QueryOptions, ScanConfig};
//! use std::path::Path;
//!
//! let path = Path::new("words.js");
//! let config = ScanConfig::default();
//!
//! // Built once per process, read-only afterwards
//! let registry = build_category_index(path, &config).unwrap();
//!
//! // Restrict a query to one category
//! let food = registry.resolve_alias("foods and drinks").unwrap();
//! let allowed: hintsolver::AllowedCategorySet = [hintsolver::normalize_category(&food.id)]
//!     .into_iter()
//!     .collect();
//! let options = QueryOptions {
//!     allowed: Some(&allowed),
//!     ..QueryOptions::default()
//! };
//!
//! let result = solve(path, "yeast", &options, &config).unwrap();
//! println!("{}", format_compact(&result.matches));
//! ```

mod classify;
mod error;
mod filters;
mod format;
mod normalize;
mod registry;
mod solver;
mod statement;

// Re-export public API
pub use classify::{classify, CategoryCursor, Record, Step};
pub use error::{Result, SolverError};
pub use filters::{parse_category_args, FilterOutcome, FilterStore};
pub use format::{format_category_list, format_compact, NO_CATEGORY_MATCHES, NO_MATCHES};
pub use normalize::{normalize_category, normalize_hint};
pub use registry::{
    build_category_index, resolve_category_alias, search_categories, Category, CategoryRegistry,
};
pub use solver::{
    solve, solve_batch, solve_statements, solve_stream, AllowedCategorySet, GroupedMatches,
    MatchGroup, MatchMode, QueryOptions, QueryResult, ScanStop, DEFAULT_LIMIT,
};
pub use statement::{
    open_statements, LoadMode, MappedReader, ScanConfig, SourceReader, Statements,
    DEFAULT_MAX_STATEMENT_LEN, STATEMENT_TERMINATOR,
};
