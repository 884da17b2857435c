//! Restricted parser for Python-style dict literals.
//!
//! Accepted values: quoted strings, integers, `True`, `False`, `None` and
//! `datetime.date(Y, M, D)`. Any other token is rejected.

use chrono::NaiveDate;

use crate::types::ProfileRecord;

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    Date(NaiveDate),
}

impl Literal {
    fn kind(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Int(_) => "integer",
            Literal::Bool(_) => "bool",
            Literal::None => "None",
            Literal::Date(_) => "date",
        }
    }
}

/// Parse one dict literal into a [`ProfileRecord`]. Unknown keys are ignored.
pub(crate) fn parse_profile(input: &str) -> Result<ProfileRecord, String> {
    let mut parser = Parser::new(input);
    let entries = parser.parse_dict()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(format!("unexpected trailing character '{c}' at offset {}", parser.pos));
    }

    let mut record = ProfileRecord::default();
    for (key, value) in entries {
        match key.as_str() {
            "username" => record.username = string_field(&key, value)?,
            "sex" => record.sex = Some(string_field(&key, value)?),
            "mail" => record.mail = string_field(&key, value)?,
            "birthdate" => {
                record.birthdate = match value {
                    Literal::Date(d) => Some(d),
                    Literal::None => None,
                    other => {
                        return Err(format!("field 'birthdate' must be a date, got {}", other.kind()));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(record)
}

fn string_field(key: &str, value: Literal) -> Result<Option<String>, String> {
    match value {
        Literal::Str(s) => Ok(Some(s)),
        Literal::None => Ok(None),
        other => Err(format!("field '{key}' must be a string, got {}", other.kind())),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(format!(
                "expected '{want}' but found '{c}' at offset {}",
                self.pos - c.len_utf8()
            )),
            None => Err(format!("expected '{want}' but reached end of line")),
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.src[self.pos..].starts_with(kw) {
            let after = self.src[self.pos + kw.len()..].chars().next();
            if !matches!(after, Some(c) if c.is_alphanumeric() || c == '_') {
                self.pos += kw.len();
                return true;
            }
        }
        false
    }

    fn parse_dict(&mut self) -> Result<Vec<(String, Literal)>, String> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(entries);
            }
            let key = match self.parse_value()? {
                Literal::Str(s) => s,
                other => return Err(format!("dict keys must be strings, got {}", other.kind())),
            };
            self.expect(':')?;
            let value = self.parse_value()?;
            entries.push((key, value));

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(entries),
                Some(c) => return Err(format!("expected ',' or '}}' but found '{c}'")),
                None => return Err("unterminated dict literal".to_string()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.peek() {
            Some('\'') | Some('"') => self.parse_string().map(Literal::Str),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_int().map(Literal::Int),
            Some(_) => {
                if self.eat_keyword("True") {
                    Ok(Literal::Bool(true))
                } else if self.eat_keyword("False") {
                    Ok(Literal::Bool(false))
                } else if self.eat_keyword("None") {
                    Ok(Literal::None)
                } else if self.eat_keyword("datetime.date") {
                    self.parse_date_args().map(Literal::Date)
                } else {
                    Err(format!("unsupported value at offset {}", self.pos))
                }
            }
            None => Err("expected a value but reached end of line".to_string()),
        }
    }

    fn parse_int(&mut self) -> Result<i64, String> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        text.parse::<i64>()
            .map_err(|e| format!("invalid integer '{text}': {e}"))
    }

    fn parse_date_args(&mut self) -> Result<NaiveDate, String> {
        self.expect('(')?;
        let year = self.parse_int()?;
        self.expect(',')?;
        let month = self.parse_int()?;
        self.expect(',')?;
        let day = self.parse_int()?;
        self.skip_ws();
        if self.peek() == Some(',') {
            self.bump();
        }
        self.expect(')')?;

        let (Ok(y), Ok(m), Ok(d)) = (i32::try_from(year), u32::try_from(month), u32::try_from(day))
        else {
            return Err(format!("date out of range: {year}-{month}-{day}"));
        };
        NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("invalid date: {year}-{month}-{day}"))
    }

    fn parse_string(&mut self) -> Result<String, String> {
        let quote = self.bump().ok_or("expected string")?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string literal".to_string()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let esc = self.bump().ok_or("unterminated escape sequence")?;
                    match esc {
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        '0' => out.push('\0'),
                        'x' => out.push(self.parse_hex_escape(2)?),
                        'u' => out.push(self.parse_hex_escape(4)?),
                        'U' => out.push(self.parse_hex_escape(8)?),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, String> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or("truncated hex escape")?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("invalid hex escape '{hex}'"));
        }
        let code =
            u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex escape '{hex}'"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| format!("invalid code point {code:#x}"))
    }
}
