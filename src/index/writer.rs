//! Canonical serializer for search index literals.
//!
//! Output is stable: writing a parsed index yields the same bytes the original
//! documentation build produced, and writing twice never changes the result.

use super::literal::{Dialect, SET_INDEX_PREFIX, SET_INDEX_SUFFIX};
use serde_json::Value;
use std::fmt::Write as _;

/// JavaScript reserved words; these keys are always quoted in the legacy dialect.
const RESERVED_WORDS: &[&str] = &[
    "abstract",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "double",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "function",
    "goto",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "volatile",
    "while",
    "with",
];

/// Writes a complete `Search.setIndex(...)` document.
pub fn write_index_text(value: &Value, dialect: Dialect) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(SET_INDEX_PREFIX);
    write_value(&mut out, value, dialect);
    out.push_str(SET_INDEX_SUFFIX);
    out
}

/// Writes a bare literal without the call wrapper.
pub fn write_literal(value: &Value, dialect: Dialect) -> String {
    let mut out = String::new();
    write_value(&mut out, value, dialect);
    out
}

fn write_value(out: &mut String, value: &Value, dialect: Dialect) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => encode_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, dialect);
            }
            out.push(']');
        }
        Value::Object(map) => match dialect {
            Dialect::Legacy => {
                // Members sort by their encoded `key:value` text, not by key alone.
                let mut members: Vec<String> = map
                    .iter()
                    .map(|(key, value)| {
                        let mut member = String::new();
                        encode_key(&mut member, key);
                        member.push(':');
                        write_value(&mut member, value, dialect);
                        member
                    })
                    .collect();
                members.sort_unstable();
                out.push('{');
                out.push_str(&members.join(","));
                out.push('}');
            }
            Dialect::Json => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort_unstable();
                out.push('{');
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    encode_string(out, key);
                    out.push(':');
                    write_value(out, &map[key.as_str()], dialect);
                }
                out.push('}');
            }
        },
    }
}

fn encode_key(out: &mut String, key: &str) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        encode_string(out, key);
    }
}

/// Whether a key can be emitted without quotes in the legacy dialect.
pub(crate) fn is_bare_key(key: &str) -> bool {
    let mut bytes = key.bytes();
    let Some(first) = bytes.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && !RESERVED_WORDS.contains(&key)
}

fn encode_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::literal::parse_index_text;
    use assert2::check;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("docnames", true)]
    #[case("_exampl", true)]
    #[case("p1y", true)]
    #[case("A", true)]
    #[case("boolean", false)]
    #[case("default", false)]
    #[case("2000", false)]
    #[case("", false)]
    #[case("cylc[bar]", false)]
    #[case("sphinx.domains.c", false)]
    fn bare_key_rules(#[case] key: &str, #[case] bare: bool) {
        check!(is_bare_key(key) == bare);
    }

    #[test]
    fn legacy_orders_by_encoded_member() {
        let value = json!({"a": 1, "a1": 2, "B": 3, "2": 4, "class": 5});
        check!(write_literal(&value, Dialect::Legacy) == r#"{"2":4,"class":5,B:3,a1:2,a:1}"#);
    }

    #[test]
    fn json_orders_by_key() {
        let value = json!({"a": 1, "a1": 2, "B": 3});
        check!(write_literal(&value, Dialect::Json) == r#"{"B":3,"a":1,"a1":2}"#);
    }

    #[rstest]
    #[case("été", r#""\u00e9t\u00e9""#)]
    #[case("🦀", r#""\ud83e\udd80""#)]
    #[case("a\"b\\c\n", r#""a\"b\\c\n""#)]
    #[case("\u{1}", r#""\u0001""#)]
    fn escapes_strings(#[case] input: &str, #[case] expected: &str) {
        check!(write_literal(&json!(input), Dialect::Legacy) == expected);
    }

    #[test]
    fn delete_char_is_escaped_in_both_dialects() {
        check!(write_literal(&json!("\u{7f}"), Dialect::Legacy) == r#""\u007f""#);
        check!(write_literal(&json!("\u{7f}"), Dialect::Json) == r#""\u007f""#);
    }

    #[test]
    fn writing_is_idempotent() {
        let value = json!({
            "docnames": ["a", "b"],
            "terms": {"foo": [[0, 1, 1, ""]], "bar": 1, "do": [0, 1]},
            "titles": ["Ä", "B"]
        });
        for dialect in [Dialect::Legacy, Dialect::Json] {
            let first = write_index_text(&value, dialect);
            let reparsed = parse_index_text(&first).unwrap();
            check!(reparsed.value == value);
            check!(write_index_text(&reparsed.value, dialect) == first);
        }
    }
}
