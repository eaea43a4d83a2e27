//! Helper filters available to every template.

use std::sync::LazyLock;

use minijinja::Value;
use regex::Regex;

static SPECIAL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\-\s]+"));

/// Slugify a display string: `"Blue Widget - Large"` → `"blue-widget_-_large"`.
pub fn to_key(s: String) -> String {
    let lower = s.to_lowercase();
    let stripped = match SPECIAL.as_ref() {
        Ok(re) => re.replace_all(&lower, "").into_owned(),
        Err(_) => lower,
    };
    stripped
        .replace(" - ", "_-_")
        .replace(' ', "-")
        .trim_matches('-')
        .to_string()
}

/// Inverse of [`to_key`], title-casing each word.
pub fn from_key(s: String) -> String {
    let spaced = s.replace('-', " ").replace("_ _", " - ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_' || c == '\'');
    }
    out.trim_matches(' ').to_string()
}

/// Format an amount in cents as dollars.
pub fn usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Mark a string as safe markup, bypassing auto-escaping.
pub fn unescaped(s: String) -> Value {
    Value::from_safe_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_key() {
        assert_eq!(to_key("Blue Widget - Large".into()), "blue-widget_-_large");
        assert_eq!(to_key("  Hello, World!  ".into()), "hello-world");
        assert_eq!(to_key("a_b".into()), "a_b");
    }

    #[test]
    fn test_from_key() {
        assert_eq!(from_key("blue-widget_-_large".into()), "Blue Widget - Large");
        assert_eq!(from_key("hello-world".into()), "Hello World");
    }

    #[test]
    fn test_usd() {
        assert_eq!(usd(1999), "$19.99");
        assert_eq!(usd(5), "$0.05");
        assert_eq!(usd(-250), "-$2.50");
    }
}
