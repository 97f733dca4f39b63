//! Filter expression parser using nom.
//!
//! Turns the compact expressions accepted on the command line into
//! `(filter name, FilterData)` pairs.
//!
//! # Syntax Overview
//!
//! ```text
//! |name~"foo bar"
//! ┬──┬─┬────┬────
//! │  │ │    └── Value (bare, quoted, or a comma list)
//! │  │ └── Operator
//! │  └── Filter name
//! └── Optional OR marker
//! ```
//!
//! | operator | filter type        |
//! |----------|--------------------|
//! | `~`      | `contains`         |
//! | `!~`     | `not_contains`     |
//! | `^`      | `starts_with`      |
//! | `$`      | `ends_with`        |
//! | `=`      | `equal`            |
//! | `!=`     | `not_equal`        |
//! | `>` `>=` `<` `<=` | `gt` `gte` `lt` `lte` |

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, rest, value},
    sequence::delimited,
    IResult,
};

use crate::ast::LogicalOp;
use crate::error::{GridError, GridResult};
use crate::filter::FilterData;

/// One parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    pub name: String,
    pub condition: LogicalOp,
    pub data: FilterData,
}

/// Parse a complete filter expression.
pub fn parse(input: &str) -> GridResult<FilterExpression> {
    let input = input.trim();

    match all_consuming(parse_expression)(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(GridError::parse(
            input.len() - e.input.len(),
            format!("unexpected input in '{}'", input),
        )),
        Err(nom::Err::Incomplete(_)) => Err(GridError::parse(input.len(), "incomplete expression")),
    }
}

/// Parse several expressions, failing on the first bad one.
pub fn parse_all<I, S>(inputs: I) -> GridResult<Vec<FilterExpression>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs.into_iter().map(|s| parse(s.as_ref())).collect()
}

fn parse_expression(input: &str) -> IResult<&str, FilterExpression> {
    let (input, or) = opt(char('|'))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, name) = parse_identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, kind) = parse_operator(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_value(input)?;

    let condition = if or.is_some() { LogicalOp::Or } else { LogicalOp::And };
    Ok((
        input,
        FilterExpression {
            name: name.to_string(),
            condition,
            data: FilterData::with_type(kind, value),
        },
    ))
}

/// Parse a filter name (letters, digits, `_` and `.`).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.')(input)
}

/// Parse an operator into the filter type name it stands for.
fn parse_operator(input: &str) -> IResult<&str, &'static str> {
    // longest operators first
    alt((
        value("not_contains", tag("!~")),
        value("not_equal", tag("!=")),
        value("gte", tag(">=")),
        value("lte", tag("<=")),
        value("contains", char('~')),
        value("starts_with", char('^')),
        value("ends_with", char('$')),
        value("equal", char('=')),
        value("gt", char('>')),
        value("lt", char('<')),
    ))(input)
}

fn parse_value(input: &str) -> IResult<&str, serde_json::Value> {
    if input.starts_with('"') {
        return map(parse_quoted, serde_json::Value::String)(input);
    }
    map(rest, bare_value)(input)
}

/// Parse a double-quoted string with `\"` and `\\` escapes.
fn parse_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

/// Bare values: comma lists become arrays, numbers become numbers.
fn bare_value(raw: &str) -> serde_json::Value {
    let raw = raw.trim();
    if raw.contains(',') {
        return serde_json::Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(scalar)
                .collect(),
        );
    }
    scalar(raw)
}

fn scalar(raw: &str) -> serde_json::Value {
    if let Ok(n) = raw.parse::<i64>() {
        return n.into();
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return serde_json::Value::Number(n);
    }
    raw.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn data(input: &str) -> FilterData {
        parse(input).unwrap().data
    }

    #[test]
    fn test_operators() {
        assert_eq!(data("name~foo"), FilterData::with_type("contains", "foo"));
        assert_eq!(data("name!~foo"), FilterData::with_type("not_contains", "foo"));
        assert_eq!(data("name^fo"), FilterData::with_type("starts_with", "fo"));
        assert_eq!(data("name$oo"), FilterData::with_type("ends_with", "oo"));
        assert_eq!(data("age>=30"), FilterData::with_type("gte", 30));
        assert_eq!(data("age < 30"), FilterData::with_type("lt", 30));
        assert_eq!(data("status!=draft"), FilterData::with_type("not_equal", "draft"));
    }

    #[test]
    fn test_values() {
        assert_eq!(data("title=\"a \\\"b\\\", c\"").value, json!("a \"b\", c"));
        assert_eq!(data("title=\"\"").value, json!(""));
        assert_eq!(data("price>9.5").value, json!(9.5));
        assert_eq!(data("status=draft, published").value, json!(["draft", "published"]));
        assert_eq!(data("id=1,2,3").value, json!([1, 2, 3]));
    }

    #[test]
    fn test_or_marker_and_nested_field() {
        let expr = parse("| author.name ~ Gibson").unwrap();
        assert_eq!(expr.name, "author.name");
        assert_eq!(expr.condition, LogicalOp::Or);
        assert_eq!(expr.data.value, json!("Gibson"));
    }

    #[test]
    fn test_errors_have_positions() {
        match parse("name foo") {
            Err(GridError::Parse { position, .. }) => assert_eq!(position, 5),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse("~foo").is_err());
        assert!(parse("title=\"open").is_err());
    }

    #[test]
    fn test_parse_all() {
        let exprs = parse_all(["a=1", "|b~x"]).unwrap();
        assert_eq!(exprs.len(), 2);
        assert!(parse_all(["a=1", "bad"]).is_err());
    }
}
