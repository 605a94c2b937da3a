//! Filter scripts evaluated by the routing service for every inbound event
//!
//! A script is a JavaScript `handler(input)` function. It returns `null` to drop
//! the event and `{ payload: input }` to forward it unchanged. Target values are
//! embedded as single-quoted string literals, see [`escape_literal`].

/// Error type for filter construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid field path: {0:?}")]
    InvalidFieldPath(String),

    #[error("A filter needs at least one condition")]
    NoConditions,

    #[error("Invalid escape sequence in literal: {0}")]
    InvalidEscape(String),
}

/// Anything that can render itself as a routing filter script
pub trait FilterScript: Send + Sync {
    fn build(&self) -> String;
}

const REJECT: &str = "return null;";
const ACCEPT: &str = "return { payload: input };";

/// Forwards an event when `input.<field_path>` equals `value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatchFilter {
    field_path: String,
    value: String,
}

impl FieldMatchFilter {
    pub fn new(field_path: impl Into<String>, value: impl Into<String>) -> Result<Self, FilterError> {
        let field_path = field_path.into();
        validate_field_path(&field_path)?;
        Ok(Self {
            field_path,
            value: value.into(),
        })
    }

    fn mismatch_condition(&self) -> String {
        format!(
            "input.{} !== '{}'",
            self.field_path,
            escape_literal(&self.value)
        )
    }
}

impl FilterScript for FieldMatchFilter {
    fn build(&self) -> String {
        render_handler(&[self.mismatch_condition()])
    }
}

/// Forwards an event only when every field matches its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllFieldsMatchFilter {
    conditions: Vec<FieldMatchFilter>,
}

impl AllFieldsMatchFilter {
    pub fn new<I, F, V>(conditions: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        let conditions = conditions
            .into_iter()
            .map(|(field, value)| FieldMatchFilter::new(field, value))
            .collect::<Result<Vec<_>, _>>()?;

        if conditions.is_empty() {
            return Err(FilterError::NoConditions);
        }

        Ok(Self { conditions })
    }
}

impl FilterScript for AllFieldsMatchFilter {
    fn build(&self) -> String {
        let conditions: Vec<String> = self
            .conditions
            .iter()
            .map(FieldMatchFilter::mismatch_condition)
            .collect();
        render_handler(&conditions)
    }
}

fn render_handler(mismatch_conditions: &[String]) -> String {
    format!(
        "function handler(input) {{\n  if ({}) {{\n    {}\n  }}\n  {}\n}}\n",
        mismatch_conditions.join(" || "),
        REJECT,
        ACCEPT
    )
}

fn validate_field_path(path: &str) -> Result<(), FilterError> {
    let valid = !path.is_empty() && path.split('.').all(is_identifier);
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidFieldPath(path.to_string()))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escape a value for embedding between single quotes
///
/// Quotes, backslashes and every character that would end a JavaScript line
/// are escaped, so the literal cannot be terminated early.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\'' => escaped.push_str("\\'"),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                escaped.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Reverse [`escape_literal`]
pub fn unescape_literal(literal: &str) -> Result<String, FilterError> {
    let mut value = String::with_capacity(literal.len());
    let mut chars = literal.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }

        match chars.next() {
            Some('\'') => value.push('\''),
            Some('\\') => value.push('\\'),
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some('t') => value.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| FilterError::InvalidEscape(format!("\\u{}", hex)))?;
                value.push(decoded);
            }
            Some(other) => return Err(FilterError::InvalidEscape(format!("\\{}", other))),
            None => return Err(FilterError::InvalidEscape("trailing backslash".to_string())),
        }
    }

    Ok(value)
}

/// Locate the first embedded string literal in a script, without its quotes
pub fn extract_literal(script: &str) -> Option<&str> {
    let start = script.find('\'')? + 1;
    let mut escaped = false;

    for (offset, c) in script[start..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '\'' => return Some(&script[start..start + offset]),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builds_single_field_handler() {
        let script = FieldMatchFilter::new("account", "acct_1").unwrap().build();
        assert_eq!(
            script,
            "function handler(input) {\n  if (input.account !== 'acct_1') {\n    return null;\n  }\n  return { payload: input };\n}\n"
        );
    }

    #[test]
    fn rejects_invalid_field_paths() {
        for path in ["", "a..b", "1abc", "a.b-c", "a; alert(1)", ".a", "a."] {
            assert_eq!(
                FieldMatchFilter::new(path, "x"),
                Err(FilterError::InvalidFieldPath(path.to_string())),
                "path {path:?} should be rejected"
            );
        }
        assert!(FieldMatchFilter::new("data.object.$id_2", "x").is_ok());
    }

    #[test]
    fn quote_injection_stays_inside_literal() {
        let value = "acct_1' || true || '";
        let script = FieldMatchFilter::new("account", value).unwrap().build();
        assert!(!script.contains(value));
        assert_eq!(
            unescape_literal(extract_literal(&script).unwrap()).unwrap(),
            value
        );
    }

    #[test]
    fn line_terminators_are_escaped() {
        let script = FieldMatchFilter::new("account", "a\nb\r\u{2028}c\u{0}")
            .unwrap()
            .build();
        assert!(script.contains("'a\\nb\\r\\u2028c\\u0000'"));
    }

    #[test]
    fn all_fields_filter_joins_conditions() {
        let script = AllFieldsMatchFilter::new([("account", "acct_1"), ("livemode", "true")])
            .unwrap()
            .build();
        assert!(script.contains("input.account !== 'acct_1' || input.livemode !== 'true'"));
        assert!(script.contains(ACCEPT));
    }

    #[test]
    fn all_fields_filter_needs_conditions() {
        let empty: Vec<(String, String)> = Vec::new();
        assert_eq!(
            AllFieldsMatchFilter::new(empty),
            Err(FilterError::NoConditions)
        );
    }

    #[test]
    fn unescape_rejects_unknown_sequences() {
        assert!(matches!(
            unescape_literal("\\x41"),
            Err(FilterError::InvalidEscape(_))
        ));
        assert!(unescape_literal("abc\\").is_err());
        assert!(unescape_literal("\\u12").is_err());
    }

    proptest! {
        #[test]
        fn embedded_literal_round_trips(
            field in "[a-z_][a-z0-9_]{0,8}(\\.[a-z_][a-z0-9_]{0,8}){0,3}",
            value in any::<String>(),
        ) {
            let script = FieldMatchFilter::new(field.clone(), value.clone()).unwrap().build();
            let literal = extract_literal(&script).unwrap();
            prop_assert_eq!(unescape_literal(literal).unwrap(), value);
            let check = format!("if (input.{} !== '", field);
            prop_assert!(script.contains(&check));
            prop_assert!(script.contains(ACCEPT));
        }

        #[test]
        fn quoted_values_never_appear_raw(value in "[a-z0-9]{1,6}'[a-z0-9 ]{0,6}") {
            let script = FieldMatchFilter::new("account", value.clone()).unwrap().build();
            prop_assert!(!script.contains(&value));
        }

        #[test]
        fn build_is_deterministic(value in any::<String>()) {
            let filter = FieldMatchFilter::new("merchant_id", value).unwrap();
            prop_assert_eq!(filter.build(), filter.build());
        }
    }
}
