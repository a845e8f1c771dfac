use crate::normalize::normalize_category;
use crate::registry::{Category, CategoryRegistry};
use crate::solver::AllowedCategorySet;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

static ARG_RE: OnceLock<Regex> = OnceLock::new();

/// Split a free-form argument string into tokens
///
/// Double-quoted phrases are one token: `"Foods & Drinks" sports` gives
/// `["Foods & Drinks", "sports"]`.
pub fn parse_category_args(args: &str) -> Vec<String> {
    let re = ARG_RE.get_or_init(|| Regex::new(r#""([^"]+)"|(\S+)"#).expect("valid argument pattern"));

    re.captures_iter(args)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Outcome of a filter command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// No arguments were given
    Usage,

    /// The session's filter was removed
    Cleared,

    /// The session's current filter, sorted (None = no filter)
    Current(Option<Vec<String>>),

    /// A new filter was stored. Unresolved tokens were ignored.
    Set {
        resolved: Vec<Category>,
        unresolved: Vec<String>,
    },

    /// Nothing resolved; the previous filter is untouched
    NoneRecognized { unresolved: Vec<String> },
}

impl fmt::Display for FilterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOutcome::Usage => write!(
                f,
                "Usage: categories \"Everyday Objects\" \"Foods & Drinks\"  OR  categories clear  OR  categories show"
            ),
            FilterOutcome::Cleared => write!(f, "Cleared category filter (all categories allowed)."),
            FilterOutcome::Current(None) => {
                write!(f, "No category filter set (all categories allowed).")
            }
            FilterOutcome::Current(Some(ids)) => {
                write!(f, "Current allowed category IDs:\n{}", ids.join("\n"))
            }
            FilterOutcome::Set {
                resolved,
                unresolved,
            } => {
                write!(f, "Set!\nAllowed:")?;
                for category in resolved {
                    write!(f, "\n- {} ({})", category.name, category.id)?;
                }
                if !unresolved.is_empty() {
                    write!(f, "\nIgnored (unknown):")?;
                    for token in unresolved {
                        write!(f, "\n- {token}")?;
                    }
                    write!(f, "\nTip: use `findcat <term>` to find the exact category name/id.")?;
                }
                Ok(())
            }
            FilterOutcome::NoneRecognized { .. } => write!(
                f,
                "No valid categories recognized.\nTip: use `findcat food` or `findcat drink` to discover the exact category name/id."
            ),
        }
    }
}

/// Per-session allow-sets, safe to share between request handlers
///
/// Readers get an `Arc` snapshot, so a running query keeps the filter it
/// started with even if the session replaces it mid-scan.
#[derive(Debug)]
pub struct FilterStore<K> {
    filters: RwLock<FxHashMap<K, Arc<AllowedCategorySet>>>,
}

impl<K: Eq + Hash + Clone> FilterStore<K> {
    pub fn new() -> Self {
        Self {
            filters: RwLock::new(FxHashMap::default()),
        }
    }

    /// Current allow-set for a session, or None when all categories are allowed
    pub fn get(&self, session: &K) -> Option<Arc<AllowedCategorySet>> {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session)
            .cloned()
    }

    /// Replace a session's allow-set
    pub fn set(&self, session: K, allowed: AllowedCategorySet) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, Arc::new(allowed));
    }

    /// Remove a session's allow-set. Returns true if one existed.
    pub fn clear(&self, session: &K) -> bool {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session)
            .is_some()
    }

    /// Run a filter command for `session`
    ///
    /// `clear` and `show` are reserved single-token commands. Otherwise each
    /// token is resolved through the registry's aliases; unresolved tokens
    /// are reported and never stored. If nothing resolves the existing
    /// filter stays as it was.
    pub fn apply(&self, session: K, registry: &CategoryRegistry, args: &str) -> FilterOutcome {
        let tokens = parse_category_args(args);

        if tokens.is_empty() {
            return FilterOutcome::Usage;
        }

        if let [only] = tokens.as_slice() {
            if only.eq_ignore_ascii_case("clear") {
                self.clear(&session);
                return FilterOutcome::Cleared;
            }
            if only.eq_ignore_ascii_case("show") {
                let current = self.get(&session).filter(|set| !set.is_empty()).map(|set| {
                    let mut ids: Vec<String> = set.iter().cloned().collect();
                    ids.sort();
                    ids
                });
                return FilterOutcome::Current(current);
            }
        }

        let mut allowed = AllowedCategorySet::default();
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();

        for token in tokens {
            match registry.resolve_alias(&token) {
                Some(category) => {
                    allowed.insert(normalize_category(&category.id));
                    resolved.push(category.clone());
                }
                None => unresolved.push(token),
            }
        }

        if allowed.is_empty() {
            return FilterOutcome::NoneRecognized { unresolved };
        }

        log::debug!("Category filter set with {} categories", allowed.len());
        self.set(session, allowed);

        FilterOutcome::Set {
            resolved,
            unresolved,
        }
    }
}

impl<K: Eq + Hash + Clone> Default for FilterStore<K> {
    fn default() -> Self {
        Self::new()
    }
}
