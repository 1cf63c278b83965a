use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::ModelOpenError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; integers are widened so `0` and `0.` read the same.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StepValue::Real(f) => Some(*f),
            StepValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// References held in a list value, skipping anything else.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        self.as_list()
            .map(|list| list.iter().filter_map(StepValue::as_reference).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    #[must_use]
    pub fn string_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(StepValue::as_str)
    }

    #[must_use]
    pub fn real_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(StepValue::as_f64)
    }

    #[must_use]
    pub fn reference_at(&self, index: usize) -> Option<u64> {
        self.values.get(index).and_then(StepValue::as_reference)
    }

    #[must_use]
    pub fn references_at(&self, index: usize) -> Vec<u64> {
        self.values
            .get(index)
            .map(StepValue::references)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is(&self, entity_type: &str) -> bool {
        self.entity_type == entity_type
    }
}

#[derive(Debug, Default)]
pub struct StepFile {
    pub entities: HashMap<u64, StepEntity>,
    pub schema: String,
}

impl StepFile {
    /// Parses the physical file. Statements may span lines; anything outside
    /// the DATA section except `FILE_SCHEMA` is ignored.
    pub fn parse(content: &str) -> Result<Self, ModelOpenError> {
        let mut entities = HashMap::new();
        let mut schema = String::new();
        let mut in_data = false;
        let mut saw_data = false;
        let mut saw_magic = false;

        for statement in split_statements(content) {
            let statement = statement.as_ref();
            if statement.starts_with("ISO-10303-21") {
                saw_magic = true;
                continue;
            }

            if statement.starts_with("FILE_SCHEMA") {
                if let Some(start) = statement.find('\'') {
                    if let Some(end) = statement[start + 1..].find('\'') {
                        schema = statement[start + 1..start + 1 + end].to_string();
                    }
                }
                continue;
            }

            if statement == "DATA" || statement.starts_with("DATA(") {
                in_data = true;
                saw_data = true;
                continue;
            }
            if statement == "ENDSEC" {
                in_data = false;
                continue;
            }

            if in_data && statement.starts_with('#') {
                let entity = Self::parse_entity(statement)?;
                if let Some(entity) = entity {
                    entities.insert(entity.id, entity);
                }
            }
        }

        if !saw_magic {
            return Err(ModelOpenError::InvalidStep {
                message: "missing ISO-10303-21 header".to_string(),
            });
        }
        if !saw_data {
            return Err(ModelOpenError::InvalidStep {
                message: "missing DATA section".to_string(),
            });
        }

        Ok(StepFile { entities, schema })
    }

    /// `#123=IFCWALL('guid',#ref,'name',...)`. Complex instances
    /// (`#1=(A()B())`) are not used by IFC product data and are skipped.
    fn parse_entity(statement: &str) -> Result<Option<StepEntity>, ModelOpenError> {
        let invalid = |message: String| ModelOpenError::InvalidStep { message };

        let eq_pos = statement
            .find('=')
            .ok_or_else(|| invalid(format!("entity without '=': {statement}")))?;
        let id: u64 = statement[1..eq_pos]
            .trim()
            .parse()
            .map_err(|_| invalid(format!("bad entity id in: {statement}")))?;

        let rest = statement[eq_pos + 1..].trim();
        if rest.starts_with('(') {
            return Ok(None);
        }
        let paren_pos = rest
            .find('(')
            .ok_or_else(|| invalid(format!("entity #{id} has no attribute list")))?;
        let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();

        let mut cursor = Cursor::new(&rest[paren_pos + 1..]);
        let values = cursor
            .parse_list()
            .map_err(|e| invalid(format!("entity #{id}: {e}")))?;

        Ok(Some(StepEntity {
            id,
            entity_type,
            values,
        }))
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Entities of one type, ordered by id so callers see file order.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        let mut found: Vec<&StepEntity> = self
            .entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .collect();
        found.sort_by_key(|e| e.id);
        found
    }
}

/// Splits on `;` outside of strings, trimming each statement. Comments are
/// removed wherever they occur outside a string.
fn split_statements(content: &str) -> Vec<Cow<'_, str>> {
    let mut statements = Vec::new();
    let bytes = content.as_bytes();
    let mut start = 0;
    let mut pending: Option<String> = None;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'*') => {
                let close = content[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                let head = &content[start..i];
                if pending.is_some() || !head.trim().is_empty() {
                    let buffer = pending.get_or_insert_with(String::new);
                    buffer.push_str(head);
                    buffer.push(' ');
                }
                start = close;
                i = close;
                continue;
            }
            b';' if !in_string => {
                let tail = &content[start..i];
                let statement = match pending.take() {
                    Some(mut buffer) => {
                        buffer.push_str(tail);
                        Cow::Owned(buffer.trim().to_string())
                    }
                    None => Cow::Borrowed(tail.trim()),
                };
                if !statement.is_empty() {
                    statements.push(statement);
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    statements
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// Parses list items up to and including the closing `)`. The opening
    /// parenthesis has already been consumed.
    fn parse_list(&mut self) -> Result<Vec<StepValue>, String> {
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(values);
        }

        loop {
            values.push(self.parse_value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(values),
                Some(other) => return Err(format!("unexpected '{other}' in list")),
                None => return Err("unterminated list".to_string()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<StepValue, String> {
        self.skip_whitespace();
        let ch = self.peek().ok_or("unexpected end of attribute list")?;

        match ch {
            '$' => {
                self.bump();
                Ok(StepValue::Null)
            }
            '*' => {
                self.bump();
                Ok(StepValue::Derived)
            }
            '#' => {
                self.bump();
                let digits = self.take_while(|c| c.is_ascii_digit());
                digits
                    .parse()
                    .map(StepValue::Reference)
                    .map_err(|_| format!("bad reference '#{digits}'"))
            }
            '\'' => {
                self.bump();
                let start = self.pos;
                loop {
                    match self.bump() {
                        Some('\'') if self.peek() == Some('\'') => {
                            self.bump();
                        }
                        Some('\'') => break,
                        Some(_) => {}
                        None => return Err("unterminated string".to_string()),
                    }
                }
                let raw = &self.src[start..self.pos - 1];
                Ok(StepValue::String(decode_step_string(raw)))
            }
            '"' => {
                self.bump();
                let hex = self.take_while(|c| c != '"');
                self.bump();
                Ok(StepValue::String(hex.to_string()))
            }
            '.' => {
                self.bump();
                let inner = self.take_while(|c| c != '.');
                self.bump();
                Ok(match inner {
                    "T" => StepValue::Boolean(true),
                    "F" => StepValue::Boolean(false),
                    other => StepValue::Enum(other.to_string()),
                })
            }
            '(' => {
                self.bump();
                self.parse_list().map(StepValue::List)
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let text = self.take_while(|c| {
                    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'E' | 'e')
                });
                if let Ok(i) = text.parse::<i64>() {
                    return Ok(StepValue::Integer(i));
                }
                text.parse::<f64>()
                    .map(StepValue::Real)
                    .map_err(|_| format!("bad number '{text}'"))
            }
            c if c.is_ascii_alphabetic() => {
                // Typed value like IFCBOOLEAN(.T.) or IFCLENGTHMEASURE(2.5)
                let keyword = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                self.skip_whitespace();
                if self.peek() != Some('(') {
                    return Ok(StepValue::Enum(keyword.to_string()));
                }
                self.bump();
                let mut inner = self.parse_list()?;
                Ok(if inner.len() == 1 {
                    inner.remove(0)
                } else {
                    StepValue::List(inner)
                })
            }
            other => Err(format!("unexpected '{other}'")),
        }
    }
}

/// Decode STEP/IFC encoded strings with Unicode escape sequences.
/// Supports:
/// - `\X2\XXXX\X0\` - 2-byte Unicode (BMP), can have multiple 4-char hex codes
/// - `\X\XX` - 1-byte ISO 8859-1
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('X') => {
                    chars.next();
                    match chars.peek() {
                        Some('2') => {
                            chars.next(); // '2'
                            chars.next(); // '\'

                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // \X0\
                            for _ in 0..4 {
                                chars.next();
                            }
                            for chunk in hex.as_bytes().chunks(4) {
                                let decoded = std::str::from_utf8(chunk)
                                    .ok()
                                    .and_then(|s| u32::from_str_radix(s, 16).ok())
                                    .and_then(char::from_u32);
                                if let Some(c) = decoded {
                                    result.push(c);
                                }
                            }
                        }
                        Some('\\') => {
                            chars.next();
                            let hex: String = chars.by_ref().take(2).collect();
                            if let Ok(code) = u8::from_str_radix(&hex, 16) {
                                result.push(char::from(code));
                            }
                        }
                        _ => {
                            result.push('\\');
                            result.push('X');
                        }
                    }
                }
                Some('\\') => {
                    chars.next();
                    result.push('\\');
                }
                Some('S') => {
                    // \S\X - single char shift (ISO 8859-1 high bit)
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        if let Ok(low) = u8::try_from(u32::from(c)) {
                            result.push(char::from(low.wrapping_add(128)));
                        }
                    }
                }
                _ => result.push('\\'),
            }
        } else if ch == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            }
            result.push('\'');
        } else {
            result.push(ch);
        }
    }

    result
}
