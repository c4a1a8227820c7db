//! Value formatting for field-change before/after strings.

use activity_types::AttributeValue;

/// Text longer than this many characters is shortened in a field change.
pub const FORMAT_MAX_CHARS: usize = 1_000;

pub const FORMAT_ELLIPSIS: &str = "...";

/// Render an attribute value as a field-change string.
///
/// Null has no rendering; booleans render as `true`/`false`; composites as compact JSON.
/// Applying it again to its own output returns the same string.
pub fn format_value(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Null => None,
        AttributeValue::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        AttributeValue::Number(n) => Some(n.to_string()),
        AttributeValue::Uuid(id) => Some(id.to_string()),
        AttributeValue::Composite(v) => Some(v.to_string()),
        AttributeValue::Text(s) => Some(truncate_chars(s, FORMAT_MAX_CHARS, FORMAT_ELLIPSIS)),
    }
}

/// `s` unchanged if it has at most `max` characters, else its first `max` characters + `marker`.
pub(crate) fn truncate_chars(s: &str, max: usize, marker: &str) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + marker.len());
            out.push_str(&s[..cut]);
            out.push_str(marker);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_render_as_strings() {
        assert_eq!(format_value(&AttributeValue::Null), None);
        assert_eq!(format_value(&true.into()).as_deref(), Some("true"));
        assert_eq!(format_value(&false.into()).as_deref(), Some("false"));
        assert_eq!(format_value(&42i64.into()).as_deref(), Some("42"));
        assert_eq!(format_value(&"Hi".into()).as_deref(), Some("Hi"));
    }

    #[test]
    fn composites_render_compact_json() {
        let v = AttributeValue::from(serde_json::json!({ "tags": ["a", "b"] }));
        assert_eq!(format_value(&v).as_deref(), Some(r#"{"tags":["a","b"]}"#));
    }

    #[test]
    fn long_text_is_cut_at_char_boundary() {
        let s = "é".repeat(1_500);
        let out = format_value(&s.as_str().into()).unwrap();
        assert_eq!(out.chars().count(), FORMAT_MAX_CHARS + FORMAT_ELLIPSIS.len());
        assert!(out.ends_with("..."));

        let again = format_value(&out.as_str().into()).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn exactly_max_chars_is_untouched() {
        let s = "a".repeat(FORMAT_MAX_CHARS);
        assert_eq!(format_value(&s.as_str().into()).unwrap(), s);
    }
}
