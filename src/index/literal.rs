//! Tolerant reader for the `Search.setIndex({...})` payload.
//!
//! Older documentation builds emit a JavaScript object literal with bare
//! identifier keys (`docnames:[...]`, `sphinx:56`); newer ones emit strict JSON.
//! Both are read into a [`serde_json::Value`] and the writer style is recorded
//! as a [`Dialect`] so the index can be written back the same way.

use crate::error::ParseError;
use serde_json::{Map, Number, Value};

/// Call wrapper emitted around the literal.
pub const SET_INDEX_PREFIX: &str = "Search.setIndex(";
pub const SET_INDEX_SUFFIX: &str = ")";

/// Which historical writer produced the index text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// JavaScript literal with bare identifier keys where possible.
    #[default]
    Legacy,
    /// Strict JSON, every key quoted.
    Json,
}

impl Dialect {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "js" | "jsdump" => Ok(Self::Legacy),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown dialect '{}' (expected 'legacy' or 'json')", other)),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reading index text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLiteral {
    pub value: Value,
    pub dialect: Dialect,
}

/// Parses index text, with or without the `Search.setIndex(...)` wrapper.
pub fn parse_index_text(source: &str) -> Result<ParsedLiteral, ParseError> {
    let mut reader = Reader::new(source);
    reader.skip_bom();
    reader.skip_whitespace();

    let wrapped = reader.eat_str(SET_INDEX_PREFIX);
    let value = reader.parse_value()?;
    reader.skip_whitespace();

    if wrapped {
        if !reader.eat_str(SET_INDEX_SUFFIX) {
            return Err(reader.error("expected ')' closing Search.setIndex("));
        }
        reader.skip_whitespace();
        reader.eat_str(";");
        reader.skip_whitespace();
    }

    if !reader.at_end() {
        return Err(reader.error("unexpected trailing characters"));
    }

    let dialect = if reader.saw_bare_key {
        Dialect::Legacy
    } else {
        Dialect::Json
    };

    Ok(ParsedLiteral { value, dialect })
}

/// Nesting limit; real indexes are at most four levels deep.
const MAX_DEPTH: usize = 128;

struct Reader<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    saw_bare_key: bool,
}

impl<'a> Reader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            depth: 0,
            saw_bare_key: false,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.source, self.pos, message)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_bom(&mut self) {
        if self.source.starts_with('\u{feff}') {
            self.pos += '\u{feff}'.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.source[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.nested(Self::parse_object),
            Some(b'[') => self.nested(Self::parse_array),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b't') if self.eat_str("true") => Ok(Value::Bool(true)),
            Some(b'f') if self.eat_str("false") => Ok(Value::Bool(false)),
            Some(b'n') if self.eat_str("null") => Ok(Value::Null),
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, ParseError>,
    ) -> Result<Value, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("literal nested too deeply"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        self.expect(b'{')?;
        let mut map = Map::new();

        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(map));
        }

        loop {
            self.skip_whitespace();
            let key_start = self.pos;
            let key = self.parse_key()?;
            self.skip_whitespace();
            self.expect(b':')?;
            let value = self.parse_value()?;

            if map.contains_key(&key) {
                return Err(ParseError::at(
                    self.source,
                    key_start,
                    format!("duplicate key {:?}", key),
                ));
            }
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => return Err(self.error("expected ',' or '}' in object")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(b'"') => self.parse_string(),
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_continue) {
                    self.pos += 1;
                }
                self.saw_bare_key = true;
                Ok(self.source[start..self.pos].to_string())
            }
            _ => Err(self.error("expected an object key")),
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        self.expect(b'[')?;
        let mut items = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(self.error("expected ',' or ']' in array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.expect(b'"')?;
        let mut out = String::new();

        loop {
            let run_start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'"' || b == b'\\' || b < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&self.source[run_start..self.pos]);

            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                }
                Some(_) => return Err(self.error("control character in string")),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape sequence"));
        };
        self.pos += 1;
        match b {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'\'' => out.push('\''),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let high = self.parse_hex4()?;
                let ch = if (0xD800..0xDC00).contains(&high) {
                    if !self.eat_str("\\u") {
                        return Err(self.error("unpaired high surrogate"));
                    }
                    let low = self.parse_hex4()?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.error("invalid low surrogate"));
                    }
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code)
                } else {
                    char::from_u32(high)
                };
                match ch {
                    Some(ch) => out.push(ch),
                    None => return Err(self.error("invalid unicode escape")),
                }
            }
            _ => {
                self.pos -= 1;
                return Err(self.error("invalid escape sequence"));
            }
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u32, ParseError> {
        let digits = self
            .source
            .get(self.pos..self.pos + 4)
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("expected four hex digits"))?;
        let value =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("expected four hex digits"))?;
        self.pos += 4;
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let mut is_float = false;

        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        if !self.consume_digits() {
            return Err(self.error("expected digits"));
        }
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            if !self.consume_digits() {
                return Err(self.error("expected digits after '.'"));
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if !self.consume_digits() {
                return Err(self.error("expected exponent digits"));
            }
        }

        let text = &self.source[start..self.pos];
        let number = if is_float {
            None
        } else if let Ok(n) = text.parse::<i64>() {
            Some(Number::from(n))
        } else if let Ok(n) = text.parse::<u64>() {
            Some(Number::from(n))
        } else {
            None
        };

        let number = match number {
            Some(n) => n,
            None => text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .ok_or_else(|| ParseError::at(self.source, start, "number out of range"))?,
        };

        Ok(Value::Number(number))
    }

    fn consume_digits(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos > start
    }
}

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

const fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn reads_bare_keys_and_wrapper() {
        let parsed =
            parse_index_text(r#"Search.setIndex({docnames:["a"],envversion:{sphinx:56}})"#).unwrap();
        check!(parsed.dialect == Dialect::Legacy);
        check!(parsed.value == json!({"docnames": ["a"], "envversion": {"sphinx": 56}}));
    }

    #[test]
    fn reads_json_without_wrapper() {
        let parsed = parse_index_text(r#" {"docnames": ["a", "b"], "titles": ["A", "B"]} "#).unwrap();
        check!(parsed.dialect == Dialect::Json);
        check!(parsed.value["titles"] == json!(["A", "B"]));
    }

    #[test]
    fn accepts_trailing_semicolon_and_newline() {
        let parsed = parse_index_text("Search.setIndex({\"a\":1});\n").unwrap();
        check!(parsed.value == json!({"a": 1}));
    }

    #[rstest]
    #[case(r#""\u00e9t\u00e9""#, "été")]
    #[case(r#""\ud83e\udd80""#, "🦀")]
    #[case(r#""tab\there""#, "tab\there")]
    #[case(r#""q\"uote\\""#, "q\"uote\\")]
    fn decodes_escapes(#[case] input: &str, #[case] expected: &str) {
        let parsed = parse_index_text(input).unwrap();
        check!(parsed.value == Value::String(expected.to_string()));
    }

    #[rstest]
    #[case("-1", json!(-1))]
    #[case("18446744073709551615", json!(18_446_744_073_709_551_615_u64))]
    #[case("0.5", json!(0.5))]
    #[case("1e3", json!(1000.0))]
    fn reads_numbers(#[case] input: &str, #[case] expected: Value) {
        check!(parse_index_text(input).unwrap().value == expected);
    }

    #[rstest]
    #[case("{a:1", "expected ',' or '}' in object")]
    #[case("{a:1,a:2}", "duplicate key \"a\"")]
    #[case("Search.setIndex({}", "expected ')' closing Search.setIndex(")]
    #[case("{} x", "unexpected trailing characters")]
    #[case("[1,]", "expected a value")]
    #[case("\"\\ud800\"", "unpaired high surrogate")]
    #[case("{1:2}", "expected an object key")]
    fn reports_errors(#[case] input: &str, #[case] message: &str) {
        let_assert!(Err(err) = parse_index_text(input));
        check!(err.message == message);
    }

    #[test]
    fn error_points_at_duplicate_key() {
        let_assert!(Err(err) = parse_index_text("{a:1,\nab:2,ab:3}"));
        check!(err.line == 2);
        check!(err.column == 6);
    }

    #[test]
    fn rejects_excessive_nesting() {
        let deep = "[".repeat(MAX_DEPTH + 1);
        let_assert!(Err(err) = parse_index_text(&deep));
        check!(err.message == "literal nested too deeply");
    }

    #[test]
    fn dialect_from_str() {
        check!("JSON".parse::<Dialect>() == Ok(Dialect::Json));
        check!("legacy".parse::<Dialect>() == Ok(Dialect::Legacy));
        check!("yaml".parse::<Dialect>().is_err());
    }
}
