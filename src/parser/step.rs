use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// Defined-type wrapper such as `IFCREAL(2.5)` or `IFCLABEL('x')`.
    Typed(String, Box<StepValue>),
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

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StepValue::Real(f) => Some(*f),
            StepValue::Integer(i) => Some(*i as f64),
            StepValue::Typed(_, inner) => inner.as_real(),
            _ => None,
        }
    }

    /// References held by a list value, ignoring any other members.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        match self {
            StepValue::List(list) => list.iter().filter_map(StepValue::as_reference).collect(),
            _ => Vec::new(),
        }
    }

    /// Serializes the value in STEP physical-file notation.
    #[must_use]
    pub fn to_step(&self) -> String {
        match self {
            StepValue::String(s) => encode_step_string(s),
            StepValue::Real(f) => format_real(*f),
            StepValue::Integer(i) => i.to_string(),
            StepValue::Boolean(true) => ".T.".to_string(),
            StepValue::Boolean(false) => ".F.".to_string(),
            StepValue::Enum(e) => format!(".{e}."),
            StepValue::Reference(id) => format!("#{id}"),
            StepValue::List(list) => format!("({})", join_values(list)),
            StepValue::Typed(name, inner) => format!("{name}({})", inner.to_step()),
            StepValue::Null => "$".to_string(),
            StepValue::Derived => "*".to_string(),
        }
    }
}

/// One `KEYWORD(...)` record of the HEADER section.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub keyword: String,
    pub values: Vec<StepValue>,
    /// Source text of the record, without the trailing `;`.
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
    /// Source text after `#id=`, without the trailing `;`.
    pub raw: String,
}

#[derive(Debug)]
pub struct StepFile {
    pub header: Vec<StepRecord>,
    pub entities: Vec<StepEntity>,
    pub schema: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Header,
    Data,
    Done,
}

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut header = Vec::new();
        let mut entities = Vec::new();
        let mut schema = String::new();
        let mut section = Section::Preamble;
        let mut saw_data = false;

        for statement in split_statements(content)? {
            match statement {
                "ISO-10303-21" | "END-ISO-10303-21" => continue,
                "HEADER" => {
                    section = Section::Header;
                    continue;
                }
                "DATA" => {
                    section = Section::Data;
                    saw_data = true;
                    continue;
                }
                "ENDSEC" => {
                    section = Section::Done;
                    continue;
                }
                _ => {}
            }

            match section {
                Section::Header => {
                    let record = Self::parse_header_record(statement)?;
                    if record.keyword == "FILE_SCHEMA" {
                        if let Some(StepValue::List(names)) = record.values.first() {
                            if let Some(name) = names.first().and_then(StepValue::as_str) {
                                schema = name.to_string();
                            }
                        }
                    }
                    header.push(record);
                }
                Section::Data => entities.push(Self::parse_entity(statement)?),
                Section::Preamble | Section::Done => {
                    return Err(invalid(format!(
                        "statement outside HEADER/DATA: {}",
                        snippet(statement)
                    )));
                }
            }
        }

        if !saw_data {
            return Err(invalid("missing DATA section".to_string()));
        }

        Ok(StepFile {
            header,
            entities,
            schema,
        })
    }

    fn parse_header_record(statement: &str) -> Result<StepRecord, ParseError> {
        let paren_pos = statement
            .find('(')
            .ok_or_else(|| invalid(format!("malformed header record: {}", snippet(statement))))?;
        let keyword = statement[..paren_pos].trim().to_string();
        let values = Self::parse_values(parenthesized(statement, paren_pos)?);

        Ok(StepRecord {
            keyword,
            values,
            raw: statement.to_string(),
        })
    }

    fn parse_entity(statement: &str) -> Result<StepEntity, ParseError> {
        // Format: #123=IFCWALL('guid',#ref,'name',...)
        let malformed = || invalid(format!("malformed entity instance: {}", snippet(statement)));

        let rest = statement.strip_prefix('#').ok_or_else(malformed)?;
        let eq_pos = rest.find('=').ok_or_else(malformed)?;
        let id: u64 = rest[..eq_pos].trim().parse().map_err(|_| malformed())?;

        let body = rest[eq_pos + 1..].trim();
        // Complex instances `(IFCA() IFCB())` are kept verbatim without attributes.
        if body.starts_with('(') {
            return Ok(StepEntity {
                id,
                entity_type: String::new(),
                values: Vec::new(),
                raw: body.to_string(),
            });
        }

        let paren_pos = body.find('(').ok_or_else(malformed)?;
        let entity_type = body[..paren_pos].trim().to_ascii_uppercase();
        let values = Self::parse_values(parenthesized(body, paren_pos)?);

        Ok(StepEntity {
            id,
            entity_type,
            values,
            raw: body.to_string(),
        })
    }

    pub(crate) fn parse_values(s: &str) -> Vec<StepValue> {
        let mut values = Vec::new();
        let mut current = String::new();
        let mut in_string = false;
        let mut paren_depth = 0;

        for ch in s.chars() {
            match ch {
                '\'' => {
                    in_string = !in_string;
                    current.push(ch);
                }
                '(' if !in_string => {
                    paren_depth += 1;
                    current.push(ch);
                }
                ')' if !in_string => {
                    paren_depth -= 1;
                    current.push(ch);
                }
                ',' if !in_string && paren_depth == 0 => {
                    values.push(Self::parse_single_value(current.trim()));
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.trim().is_empty() {
            values.push(Self::parse_single_value(current.trim()));
        }

        values
    }

    fn parse_single_value(s: &str) -> StepValue {
        let s = s.trim();

        if s == "$" {
            return StepValue::Null;
        }
        if s == "*" {
            return StepValue::Derived;
        }
        if let Some(stripped) = s.strip_prefix('#') {
            if let Ok(id) = stripped.parse::<u64>() {
                return StepValue::Reference(id);
            }
        }
        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            let raw = &s[1..s.len() - 1];
            return StepValue::String(decode_step_string(raw));
        }
        if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
            let inner = &s[1..s.len() - 1];
            if inner == "T" {
                return StepValue::Boolean(true);
            }
            if inner == "F" {
                return StepValue::Boolean(false);
            }
            return StepValue::Enum(inner.to_string());
        }
        if s.starts_with('(') && s.ends_with(')') {
            let inner = &s[1..s.len() - 1];
            return StepValue::List(Self::parse_values(inner));
        }
        if let Ok(i) = s.parse::<i64>() {
            return StepValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return StepValue::Real(f);
        }
        // Typed value like IFCBOOLEAN(.T.)
        if let Some(paren_pos) = s.find('(') {
            if s.ends_with(')') {
                let name = s[..paren_pos].trim().to_ascii_uppercase();
                let inner = &s[paren_pos + 1..s.len() - 1];
                return StepValue::Typed(name, Box::new(Self::parse_single_value(inner)));
            }
        }

        StepValue::String(s.to_string())
    }

    #[must_use]
    pub fn header_record(&self, keyword: &str) -> Option<&StepRecord> {
        self.header.iter().find(|r| r.keyword == keyword)
    }
}

fn invalid(message: String) -> ParseError {
    ParseError::InvalidStep { message }
}

fn snippet(statement: &str) -> String {
    statement.chars().take(60).collect()
}

/// Returns the text between the `(` at `open` and the record's final `)`.
fn parenthesized(text: &str, open: usize) -> Result<&str, ParseError> {
    let close = text
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| invalid(format!("unbalanced parentheses: {}", snippet(text))))?;
    Ok(&text[open + 1..close])
}

/// Splits a physical file into `;`-terminated statements, honouring string
/// literals and `/* */` comments. Returned statements are trimmed.
fn split_statements(content: &str) -> Result<Vec<&str>, ParseError> {
    let bytes = content.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'*') => {
                let end = content[i + 2..]
                    .find("*/")
                    .ok_or_else(|| invalid("unterminated comment".to_string()))?;
                i += end + 4;
                continue;
            }
            b';' if !in_string => {
                let statement = strip_comments(content[start..i].trim());
                if !statement.is_empty() {
                    statements.push(statement);
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if in_string {
        return Err(invalid("unterminated string literal".to_string()));
    }

    Ok(statements)
}

/// Drops a leading comment so keyword matching sees the statement itself.
fn strip_comments(mut statement: &str) -> &str {
    while let Some(rest) = statement.strip_prefix("/*") {
        match rest.find("*/") {
            Some(end) => statement = rest[end + 2..].trim_start(),
            None => break,
        }
    }
    statement
}

fn join_values(values: &[StepValue]) -> String {
    values
        .iter()
        .map(StepValue::to_step)
        .collect::<Vec<_>>()
        .join(",")
}

/// Serializes a full attribute list, e.g. `('abc',$,#12)`.
#[must_use]
pub fn format_attributes(values: &[StepValue]) -> String {
    format!("({})", join_values(values))
}

/// STEP reals always carry a decimal point and use an upper-case exponent.
fn format_real(value: f64) -> String {
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.E{exponent}"),
        None => text,
    }
}

/// Encode a string as a quoted STEP literal.
/// Printable ASCII is written as-is (with `'` and `\` doubled); anything
/// else goes through `\X2\` (BMP) or `\X4\` runs.
#[must_use]
pub fn encode_step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    let mut in_x2 = false;
    out.push('\'');

    for ch in s.chars() {
        let code = ch as u32;
        if (0x20..0x7F).contains(&code) {
            if in_x2 {
                out.push_str("\\X0\\");
                in_x2 = false;
            }
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        } else if code <= 0xFFFF {
            if !in_x2 {
                out.push_str("\\X2\\");
                in_x2 = true;
            }
            out.push_str(&format!("{code:04X}"));
        } else {
            if in_x2 {
                out.push_str("\\X0\\");
                in_x2 = false;
            }
            out.push_str(&format!("\\X4\\{code:08X}\\X0\\"));
        }
    }

    if in_x2 {
        out.push_str("\\X0\\");
    }
    out.push('\'');
    out
}

/// Decode STEP/IFC encoded strings with Unicode escape sequences.
/// Supports:
/// - `\X2\XXXX\X0\` - 2-byte Unicode (BMP), can have multiple 4-char hex codes
/// - `\X4\XXXXXXXX\X0\` - 4-byte Unicode
/// - `\X\XX` - 1-byte ISO 8859-1
/// - `\S\X` - single char shifted into the upper half of ISO 8859-1
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
#[must_use]
pub fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('X') => {
                    chars.next(); // consume 'X'
                    match chars.peek().copied() {
                        Some(width @ ('2' | '4')) => {
                            chars.next(); // consume width digit
                            chars.next(); // consume '\'

                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // Skip \X0\
                            if chars.peek() == Some(&'\\') {
                                for _ in 0..4 {
                                    chars.next();
                                }
                            }
                            let chunk_len = if width == '2' { 4 } else { 8 };
                            for chunk in hex.as_bytes().chunks(chunk_len) {
                                let code = std::str::from_utf8(chunk)
                                    .ok()
                                    .and_then(|s| u32::from_str_radix(s, 16).ok())
                                    .and_then(char::from_u32);
                                if let Some(c) = code {
                                    result.push(c);
                                }
                            }
                        }
                        Some('\\') => {
                            // \X\ followed by 2 hex digits - ISO 8859-1
                            chars.next(); // consume '\'
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
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        if let Some(shifted) = char::from_u32(c as u32 + 0x80) {
                            result.push(shifted);
                        }
                    }
                }
                _ => result.push('\\'),
            }
        } else if ch == '\'' {
            // '' is escaped apostrophe in STEP
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('model.ifc','2024-01-01T00:00:00',('Author'),('Org'),'pre','sys','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
/* spans two lines */
#1=IFCPROPERTYSINGLEVALUE('PipeLength',$,IFCREAL(2500.),
  #2);
#2=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#3=IFCPROPERTYSET('0u4wgLe6n0ABVaiXyikbkA',$,'Pset; with semicolon',$,(#1));
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn parses_header_and_multiline_entities() {
        let file = StepFile::parse(SAMPLE).unwrap();

        assert_eq!(file.schema, "IFC4");
        assert_eq!(file.header.len(), 3);
        assert_eq!(file.entities.len(), 3);

        let property = &file.entities[0];
        assert_eq!(property.entity_type, "IFCPROPERTYSINGLEVALUE");
        assert_eq!(
            property.values[2],
            StepValue::Typed("IFCREAL".to_string(), Box::new(StepValue::Real(2500.0)))
        );
        assert_eq!(property.values[3], StepValue::Reference(2));

        let pset = &file.entities[2];
        assert_eq!(pset.values[2].as_str(), Some("Pset; with semicolon"));
        assert_eq!(pset.values[4].references(), vec![1]);
    }

    #[test]
    fn unit_enums_and_derived_values() {
        let file = StepFile::parse(SAMPLE).unwrap();
        let unit = &file.entities[1];

        assert_eq!(unit.values[0], StepValue::Derived);
        assert_eq!(unit.values[1], StepValue::Enum("LENGTHUNIT".to_string()));
    }

    #[test]
    fn header_string_keeps_embedded_semicolon() {
        let file = StepFile::parse(SAMPLE).unwrap();
        let description = file.header_record("FILE_DESCRIPTION").unwrap();

        assert_eq!(description.values[1].as_str(), Some("2;1"));
    }

    #[test]
    fn rejects_missing_data_section() {
        let err = StepFile::parse("ISO-10303-21;\nHEADER;\nENDSEC;\nEND-ISO-10303-21;\n");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = StepFile::parse("ISO-10303-21;\nDATA;\n#1=IFCWALL('oops);\n");
        assert!(err.is_err());
    }

    #[test]
    fn decodes_unicode_escapes() {
        assert_eq!(decode_step_string("\\X2\\0422043504410442\\X0\\"), "Тест");
        assert_eq!(decode_step_string("O''Brien"), "O'Brien");
        assert_eq!(decode_step_string("\\X\\E9t\\X\\E9"), "été");
        assert_eq!(decode_step_string("a\\\\b"), "a\\b");
    }

    #[test]
    fn encodes_non_ascii_runs() {
        assert_eq!(
            encode_step_string("Труба 1"),
            "'\\X2\\04220440044304310430\\X0\\ 1'"
        );
        assert_eq!(encode_step_string("it's"), "'it''s'");
        assert_eq!(decode_step_string("\\X2\\0422044004430431\\X0\\"), "Труб");
    }

    #[test]
    fn reals_always_have_a_decimal_point() {
        assert_eq!(StepValue::Real(2500.0).to_step(), "2500.0");
        assert_eq!(StepValue::Real(0.1).to_step(), "0.1");
        assert_eq!(StepValue::Real(1e-7).to_step(), "1.E-7");
        assert_eq!(StepValue::Real(1.5e-7).to_step(), "1.5E-7");
    }
}
