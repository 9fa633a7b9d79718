//! Slug generation and sanitization.
//!
//! Slugs follow `owner/type` for at-most-one-per-user facts and
//! `owner/type.identifier` for multi-instance facts. The grammar is a
//! caller convention — the store only enforces `(user_id, slug)`
//! uniqueness.

/// Make a string safe for use as a slug: lowercase, spaces to hyphens,
/// everything outside `[a-z0-9\-_./]` stripped.
pub fn safify(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '/'))
        .collect()
}

/// Generate an entity slug following the shared pattern.
///
/// Examples:
/// - `make_entity_slug("dave", "father", "john", None)` → `"dave/father.john"`
/// - `make_entity_slug("sarah", "goal", "marathon", Some("5a3b2"))` → `"sarah/goal.marathon-5a3b2"`
pub fn make_entity_slug(
    user_handle: &str,
    entity_type: &str,
    identifier: &str,
    short_id: Option<&str>,
) -> String {
    let mut slug = format!("{user_handle}/{entity_type}.{identifier}");
    if let Some(short_id) = short_id {
        slug.push('-');
        slug.push_str(short_id);
    }
    safify(&slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safify_lowercases_and_hyphenates() {
        assert_eq!(safify("Dave Smith"), "dave-smith");
        assert_eq!(safify("  padded  "), "padded");
    }

    #[test]
    fn safify_strips_special_characters() {
        assert_eq!(safify("dave/goal.marathon!"), "dave/goal.marathon");
        assert_eq!(safify("o'brien@home"), "obrienhome");
        assert_eq!(safify("keep_under-score.dot/slash"), "keep_under-score.dot/slash");
    }

    #[test]
    fn slug_without_short_id() {
        assert_eq!(
            make_entity_slug("dave", "father", "john", None),
            "dave/father.john"
        );
    }

    #[test]
    fn slug_with_short_id() {
        assert_eq!(
            make_entity_slug("sarah", "goal", "marathon", Some("5a3b2")),
            "sarah/goal.marathon-5a3b2"
        );
    }

    #[test]
    fn slug_sanitizes_components() {
        assert_eq!(
            make_entity_slug("Mike", "favorite food", "Pizza", None),
            "mike/favorite-food.pizza"
        );
    }
}
