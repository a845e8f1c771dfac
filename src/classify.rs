use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Cursor seed used before any category definition has been seen
pub const UNKNOWN_CATEGORY_ID: &str = "unknown";
pub const UNKNOWN_CATEGORY_NAME: &str = "Unknown";

/// A statement after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Category definition with both fields extracted
    Category { id: String, name: String },

    /// Looked like a category definition but the fields could not be extracted
    MalformedCategory,

    /// Word/hint entry
    Entry { word: String, hint: String },

    /// Anything else, including word/hint lookalikes that fail extraction
    Skip,
}

// A quoted value in either quote style. Group `sq` or `dq` holds the text.
const QUOTED_VALUE: &str = r#"(?:'(?P<sq>[^']*)'|"(?P<dq>[^"]*)")"#;

static CATEGORY_ID_RE: OnceLock<Regex> = OnceLock::new();
static CATEGORY_NAME_RE: OnceLock<Regex> = OnceLock::new();
static WORD_HINT_RE: OnceLock<Regex> = OnceLock::new();

fn key_value_regex(key: &str) -> Regex {
    let pattern = format!(r#"(?:'{key}'|"{key}")\s*:\s*{QUOTED_VALUE}"#);
    Regex::new(&pattern).expect("valid key/value pattern")
}

fn category_id_re() -> &'static Regex {
    CATEGORY_ID_RE.get_or_init(|| key_value_regex("category_id"))
}

fn category_name_re() -> &'static Regex {
    CATEGORY_NAME_RE.get_or_init(|| key_value_regex("name"))
}

fn word_hint_re() -> &'static Regex {
    WORD_HINT_RE.get_or_init(|| {
        let pattern = concat!(
            r#"\{\s*(?:'word'|"word")\s*:\s*(?:'(?P<wsq>[^']*)'|"(?P<wdq>[^"]*)")"#,
            r#"\s*,\s*(?:'hint'|"hint")\s*:\s*(?:'(?P<hsq>[^']*)'|"(?P<hdq>[^"]*)")\s*\}"#,
        );
        Regex::new(pattern).expect("valid word/hint pattern")
    })
}

/// Text of whichever quote-style group matched
fn quoted<'t>(caps: &Captures<'t>, single: &str, double: &str) -> Option<&'t str> {
    caps.name(single)
        .or_else(|| caps.name(double))
        .map(|m| m.as_str())
}

fn extract_value<'t>(re: &Regex, statement: &'t str) -> Option<&'t str> {
    let caps = re.captures(statement)?;
    quoted(&caps, "sq", "dq")
}

/// Classify one statement
///
/// Category definitions take priority over word/hint entries. Anything that
/// does not fit is skipped, never reported.
pub fn classify(statement: &str) -> Record {
    if statement.contains("category_id") && statement.contains("name") {
        let id = extract_value(category_id_re(), statement);
        let name = extract_value(category_name_re(), statement);

        return match (id, name) {
            (Some(id), Some(name)) => Record::Category {
                id: id.to_string(),
                name: name.to_string(),
            },
            _ => Record::MalformedCategory,
        };
    }

    if statement.contains("word") && statement.contains("hint") {
        if let Some(caps) = word_hint_re().captures(statement) {
            if let (Some(word), Some(hint)) =
                (quoted(&caps, "wsq", "wdq"), quoted(&caps, "hsq", "hdq"))
            {
                return Record::Entry {
                    word: word.to_string(),
                    hint: hint.to_string(),
                };
            }
        }
        log::trace!("Skipping malformed word/hint statement");
    }

    Record::Skip
}

/// What a record did to the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The cursor moved to a new category
    CategoryChanged,

    /// A word/hint entry attributed to the cursor's current category
    Entry { word: String, hint: String },

    /// Nothing happened
    Skip,
}

/// The category most recently defined during a forward scan
///
/// Local to one scan; entries are attributed to whatever category the cursor
/// holds when they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCursor {
    id: String,
    name: String,
}

impl CategoryCursor {
    pub fn new() -> Self {
        Self {
            id: UNKNOWN_CATEGORY_ID.to_string(),
            name: UNKNOWN_CATEGORY_NAME.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply one classified record
    pub fn advance(&mut self, record: Record) -> Step {
        match record {
            Record::Category { id, name } => {
                self.id = id;
                self.name = name;
                Step::CategoryChanged
            }
            Record::Entry { word, hint } => Step::Entry { word, hint },
            Record::MalformedCategory | Record::Skip => Step::Skip,
        }
    }
}

impl Default for CategoryCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_single_quotes() {
        let record = classify("r0 = {'category_id': '1', 'name': 'Foods & Drinks'};");
        assert_eq!(
            record,
            Record::Category {
                id: "1".to_string(),
                name: "Foods & Drinks".to_string(),
            }
        );
    }

    #[test]
    fn test_category_double_quotes_and_extra_fields() {
        let record =
            classify(r#"r0 = {"name": "Sports", "icon": "ball", "category_id": "sp-2"};"#);
        assert_eq!(
            record,
            Record::Category {
                id: "sp-2".to_string(),
                name: "Sports".to_string(),
            }
        );
    }

    #[test]
    fn test_category_mixed_quotes() {
        let record = classify(r#"r0 = {'category_id': "7", "name": 'Animals'};"#);
        assert_eq!(
            record,
            Record::Category {
                id: "7".to_string(),
                name: "Animals".to_string(),
            }
        );
    }

    #[test]
    fn test_category_missing_name_value() {
        let record = classify("r0 = {'category_id': '1', name: Foods};");
        assert_eq!(record, Record::MalformedCategory);
    }

    #[test]
    fn test_category_takes_priority() {
        let record =
            classify("r0 = {'category_id': '3', 'name': 'X', 'word': 'a', 'hint': 'b'};");
        assert!(matches!(record, Record::Category { .. }));
    }

    #[test]
    fn test_entry_single_quotes() {
        let record = classify("r1.push({'word': 'Bread', 'hint': 'Yeast'});");
        assert_eq!(
            record,
            Record::Entry {
                word: "Bread".to_string(),
                hint: "Yeast".to_string(),
            }
        );
    }

    #[test]
    fn test_entry_double_quotes_with_spacing() {
        let record = classify(r#"x = { "word" :"Beer" ,  "hint":  "Yeast" };"#);
        assert_eq!(
            record,
            Record::Entry {
                word: "Beer".to_string(),
                hint: "Yeast".to_string(),
            }
        );
    }

    #[test]
    fn test_entry_empty_hint() {
        let record = classify("x = {'word': 'Solo', 'hint': ''};");
        assert_eq!(
            record,
            Record::Entry {
                word: "Solo".to_string(),
                hint: String::new(),
            }
        );
    }

    #[test]
    fn test_entry_lookalike_is_skipped() {
        assert_eq!(classify("// the word 'hint' appears here;"), Record::Skip);
        assert_eq!(classify("x = {'word': 'a'};"), Record::Skip);
        assert_eq!(classify("x = {'word': a, 'hint': b};"), Record::Skip);
    }

    #[test]
    fn test_unrelated_statement() {
        assert_eq!(classify("var r2 = [];"), Record::Skip);
        assert_eq!(classify(""), Record::Skip);
    }

    #[test]
    fn test_cursor_starts_unknown() {
        let cursor = CategoryCursor::new();
        assert_eq!(cursor.id(), "unknown");
        assert_eq!(cursor.name(), "Unknown");
    }

    #[test]
    fn test_cursor_follows_categories() {
        let mut cursor = CategoryCursor::new();

        let step = cursor.advance(Record::Category {
            id: "1".to_string(),
            name: "Foods".to_string(),
        });
        assert_eq!(step, Step::CategoryChanged);
        assert_eq!(cursor.id(), "1");

        // Malformed definitions leave the cursor alone
        assert_eq!(cursor.advance(Record::MalformedCategory), Step::Skip);
        assert_eq!(cursor.id(), "1");
        assert_eq!(cursor.name(), "Foods");

        let step = cursor.advance(Record::Entry {
            word: "Bread".to_string(),
            hint: "Yeast".to_string(),
        });
        assert!(matches!(step, Step::Entry { .. }));
    }
}
