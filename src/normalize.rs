/// Normalize a hint for comparison: trimmed and lower-cased, punctuation kept
pub fn normalize_hint(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Normalize a category id or name into an alias key
///
/// `&` and `/` are spelled out as `and`, every run of characters outside
/// `[a-z0-9]` collapses to one space, and the result is trimmed. So
/// `"Foods & Drinks"`, `"Foods and Drinks"` and `"foods/drinks"` all map to
/// `"foods and drinks"`.
///
/// A slash between words reads as `and` too, so `"Rock/Pop"` becomes
/// `"rock and pop"`, not `"rock pop"`. The registry adds the slash-as-space
/// spelling as an extra alias for names that contain `/`.
pub fn normalize_category(s: &str) -> String {
    let lowered = s
        .trim()
        .to_lowercase()
        .replace(['&', '/'], " and ");

    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.chars() {
        if is_key_char(ch) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Characters that survive category normalization
#[inline]
fn is_key_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit()
}
