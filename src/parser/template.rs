// Key templates such as `{source_city}-{destination_city}`

use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::is_not,
    character::complete::char,
    combinator::{all_consuming, map},
    multi::many1,
    sequence::delimited,
    IResult,
};
use std::fmt;
use std::str::FromStr;

use super::lexer::{identifier, ws};
use crate::data::{Field, Record};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Field(Field),
}

/// A grouping key derived from record fields.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTemplate {
    segments: Vec<Segment>,
}

impl KeyTemplate {
    pub fn field(field: Field) -> Self {
        Self {
            segments: vec![Segment::Field(field)],
        }
    }

    /// Render the key for `record`; `None` when a referenced field is absent.
    pub fn render(&self, record: &Record) -> Option<String> {
        let mut key = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Field(field) => key.push_str(&record.text(*field)?),
            }
        }
        Some(key)
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [Segment::Field(field)] = self.segments.as_slice() {
            return write!(f, "{}", field);
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Field(field) => write!(f, "{{{}}}", field)?,
            }
        }
        Ok(())
    }
}

impl FromStr for KeyTemplate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_key_spec(s)
    }
}

#[derive(Debug)]
enum RawSegment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// `{ field }`
fn placeholder(input: &str) -> IResult<&str, &str> {
    delimited(char('{'), ws(identifier), char('}'))(input)
}

fn literal(input: &str) -> IResult<&str, &str> {
    is_not("{}")(input)
}

fn template(input: &str) -> IResult<&str, Vec<RawSegment<'_>>> {
    all_consuming(many1(alt((
        map(placeholder, RawSegment::Placeholder),
        map(literal, RawSegment::Literal),
    ))))(input)
}

fn bare_field(input: &str) -> IResult<&str, &str> {
    all_consuming(ws(identifier))(input)
}

fn resolve_field(name: &str) -> Result<Field> {
    name.parse::<Field>()
}

/// Parse a key expression: a bare field name (`days_left`) or a template of
/// literal text and `{field}` placeholders (`{airline}-{days_left}`).
pub fn parse_key_spec(input: &str) -> Result<KeyTemplate> {
    if let Ok((_, name)) = bare_field(input) {
        return Ok(KeyTemplate::field(resolve_field(name)?));
    }

    let (_, raw) = template(input)
        .map_err(|e| anyhow!("Invalid key template '{}': {:?}", input, e))?;

    let mut segments = Vec::with_capacity(raw.len());
    for segment in raw {
        segments.push(match segment {
            RawSegment::Literal(text) => Segment::Literal(text.to_string()),
            RawSegment::Placeholder(name) => Segment::Field(resolve_field(name)?),
        });
    }

    if !segments.iter().any(|s| matches!(s, Segment::Field(_))) {
        return Err(anyhow!("Key template '{}' references no field", input));
    }
    Ok(KeyTemplate { segments })
}
