//! Dynamic field resolution.
//!
//! A field is either a literal or a `$n` placeholder naming capture group `n`.
//! Resolution never fails: a bad index yields the empty string.

const PLACEHOLDER_PREFIX: char = '$';

/// Resolve `field` against the captures of the route's own pattern.
pub fn resolve_field(field: &str, captures: &[String]) -> String {
    let Some(index) = field.strip_prefix(PLACEHOLDER_PREFIX) else {
        return field.to_string();
    };

    // `usize::from_str` accepts a leading '+', placeholders do not.
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        tracing::debug!(field, "Placeholder is not numeric");
        return String::new();
    }

    match index.parse::<usize>().ok().and_then(|n| captures.get(n)) {
        Some(value) => value.clone(),
        None => {
            tracing::debug!(field, groups = captures.len(), "Placeholder out of range");
            String::new()
        }
    }
}

/// Split a comma-separated controller list, trimming entries and dropping
/// blank ones. An empty list yields no controllers (`""` → `[]`) rather than
/// a single empty name.
pub fn split_controllers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> Vec<String> {
        vec!["/widget/abc".into(), "abc".into()]
    }

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(resolve_field("widgets", &caps()), "widgets");
        assert_eq!(resolve_field("", &caps()), "");
        assert_eq!(resolve_field("a$1", &caps()), "a$1");
    }

    #[test]
    fn test_placeholder_in_range() {
        assert_eq!(resolve_field("$0", &caps()), "/widget/abc");
        assert_eq!(resolve_field("$1", &caps()), "abc");
    }

    #[test]
    fn test_placeholder_out_of_range() {
        assert_eq!(resolve_field("$2", &caps()), "");
        assert_eq!(resolve_field("$99999999999999999999999", &caps()), "");
        assert_eq!(resolve_field("$1", &[]), "");
    }

    #[test]
    fn test_placeholder_not_numeric() {
        assert_eq!(resolve_field("$", &caps()), "");
        assert_eq!(resolve_field("$x", &caps()), "");
        assert_eq!(resolve_field("$-1", &caps()), "");
        assert_eq!(resolve_field("$+1", &caps()), "");
        assert_eq!(resolve_field("$1a", &caps()), "");
    }

    #[test]
    fn test_multi_digit_placeholder() {
        let groups: Vec<String> = (0..12).map(|i| format!("g{i}")).collect();
        assert_eq!(resolve_field("$11", &groups), "g11");
    }

    #[test]
    fn test_split_controllers() {
        assert_eq!(split_controllers("index, nav ,footer"), vec!["index", "nav", "footer"]);
        assert!(split_controllers("").is_empty());
        assert_eq!(split_controllers("a,,b"), vec!["a", "b"]);
    }
}
