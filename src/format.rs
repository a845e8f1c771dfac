use crate::registry::Category;
use crate::solver::GroupedMatches;
use rustc_hash::FxHashSet;

/// Reply when a query matched nothing
pub const NO_MATCHES: &str = "No matches.";

/// Reply when a category search matched nothing
pub const NO_CATEGORY_MATCHES: &str = "No category matches.";

/// Most categories listed by [`format_category_list`]
pub const MAX_LISTED_CATEGORIES: usize = 40;

/// Flatten grouped matches into a compact reply
///
/// Groups are walked largest first, ties broken by header (case-insensitive).
/// Words are deduplicated case-insensitively; the first spelling seen is kept.
pub fn format_compact(grouped: &GroupedMatches) -> String {
    let mut groups: Vec<_> = grouped.groups().iter().collect();
    groups.sort_by_cached_key(|g| (std::cmp::Reverse(g.words.len()), g.header.to_lowercase()));

    let mut seen = FxHashSet::default();
    let words: Vec<&str> = groups
        .into_iter()
        .flat_map(|g| g.words.iter())
        .filter(|w| seen.insert(w.to_lowercase()))
        .map(String::as_str)
        .collect();

    match words.len() {
        0 => NO_MATCHES.to_string(),
        1 => format!("1 Match:\n{}", words[0]),
        n => format!("{} Matches:\n{}", n, words.join("\n")),
    }
}

/// List categories as `- {name}  (id: {id})`, capped at [`MAX_LISTED_CATEGORIES`]
pub fn format_category_list(categories: &[&Category]) -> String {
    if categories.is_empty() {
        return NO_CATEGORY_MATCHES.to_string();
    }

    let mut out = String::from("Matching categories:");
    for category in categories.iter().take(MAX_LISTED_CATEGORIES) {
        out.push_str(&format!("\n- {}  (id: {})", category.name, category.id));
    }

    if categories.len() > MAX_LISTED_CATEGORIES {
        out.push_str(&format!(
            "\n…(+{} more)",
            categories.len() - MAX_LISTED_CATEGORIES
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped(groups: Vec<(&str, Vec<&str>)>) -> GroupedMatches {
        groups
            .into_iter()
            .map(|(header, words)| {
                let words: Vec<String> = words.into_iter().map(String::from).collect();
                (header, words)
            })
            .collect()
    }

    #[test]
    fn test_no_matches() {
        assert_eq!(format_compact(&GroupedMatches::new()), "No matches.");
    }

    #[test]
    fn test_single_match() {
        let g = grouped(vec![("Foods (1)", vec!["Rye"])]);
        assert_eq!(format_compact(&g), "1 Match:\nRye");
    }

    #[test]
    fn test_dedup_keeps_first_casing() {
        let g = grouped(vec![("Foods (1)", vec!["Rye", "rye", "Wheat"])]);
        assert_eq!(format_compact(&g), "2 Matches:\nRye\nWheat");
    }

    #[test]
    fn test_duplicates_collapse_to_one_match() {
        let g = grouped(vec![("Foods (1)", vec!["Rye", "RYE"])]);
        assert_eq!(format_compact(&g), "1 Match:\nRye");
    }

    #[test]
    fn test_scan_order_within_group() {
        let g = grouped(vec![("Foods & Drinks (1)", vec!["Bread", "Beer"])]);
        assert_eq!(format_compact(&g), "2 Matches:\nBread\nBeer");
    }

    #[test]
    fn test_larger_groups_first() {
        let g = grouped(vec![
            ("Sports (2)", vec!["Referee"]),
            ("Foods (1)", vec!["Bread", "Beer"]),
        ]);
        assert_eq!(format_compact(&g), "3 Matches:\nBread\nBeer\nReferee");
    }

    #[test]
    fn test_ties_sorted_by_header_case_insensitive() {
        let g = grouped(vec![
            ("zoo (3)", vec!["Zebra"]),
            ("Animals (1)", vec!["Ant"]),
            ("birds (2)", vec!["Bat", "ant"]),
        ]);
        // birds has two words, then Animals before zoo
        assert_eq!(format_compact(&g), "3 Matches:\nBat\nant\nZebra");
    }

    #[test]
    fn test_category_list_empty() {
        assert_eq!(format_category_list(&[]), "No category matches.");
    }

    #[test]
    fn test_category_list_lines() {
        let food = Category {
            id: "1".to_string(),
            name: "Foods & Drinks".to_string(),
        };
        let sports = Category {
            id: "2".to_string(),
            name: "Sports".to_string(),
        };

        assert_eq!(
            format_category_list(&[&food, &sports]),
            "Matching categories:\n- Foods & Drinks  (id: 1)\n- Sports  (id: 2)"
        );
    }

    #[test]
    fn test_category_list_truncates() {
        let categories: Vec<Category> = (0..45)
            .map(|i| Category {
                id: i.to_string(),
                name: format!("Cat {i}"),
            })
            .collect();
        let refs: Vec<&Category> = categories.iter().collect();

        let out = format_category_list(&refs);
        assert_eq!(out.lines().count(), 1 + MAX_LISTED_CATEGORIES + 1);
        assert!(out.ends_with("…(+5 more)"));
    }
}
