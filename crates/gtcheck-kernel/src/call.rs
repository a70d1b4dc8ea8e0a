//! Call-expression parsing.
//!
//! Ground-truth traces are written as source-like call strings, e.g.
//! `send_message("u1", "to@x.com", "Subj", "Body")` or
//! `gmail.get_message("me", "18c2a0f3b4d5e6f7")`. This parser recognizes
//! only what those traces need and is not an expression evaluator:
//!
//! ```text
//! call       := callee arguments EOF
//! callee     := identifier ( '.' identifier | arguments )*
//! arguments  := '(' [ argument ( ',' argument )* [','] ] ')'
//! argument   := '**' expr | identifier '=' expr | expr
//! expr       := primary &separator | opaque
//! primary    := string+ | number | list | brace | paren | '*' expr | reference
//! reference  := identifier ( '.' identifier | arguments )*
//! opaque     := balanced token run up to a top-level ',' or closing bracket
//! ```
//!
//! Anything that is not a bare primary (subscripts, operators, conditionals,
//! lambdas, hex or imaginary literals) is read as an opaque run and reduces
//! to [`ArgShape::Unknown`].
//!
//! Positional arguments are reduced to an [`ArgShape`]; keyword arguments
//! are accepted and dropped.

use crate::error::CallSyntaxError;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while_m_n},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, not, opt, recognize},
    error::{Error as NomError, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use serde_json::Value;
use std::fmt;

/// Coarse shape of one positional call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgShape {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    Dict,
    List,
    /// Names, nested calls, tuples, sets, starred and byte/f-strings.
    Unknown,
}

impl ArgShape {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Text of an argument usable as an entity id (strings and integers).
    pub fn as_id(&self) -> Option<String> {
        match self {
            Self::Str(value) => Some(value.clone()),
            Self::Int(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// JSON rendering: literals pass through, tags render as
    /// `"dict"`, `"list"` and `"unknown"`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(value) => Value::String(value.clone()),
            Self::Int(value) => Value::from(*value),
            Self::Float(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(value) => Value::Bool(*value),
            Self::None => Value::Null,
            Self::Dict => Value::String("dict".to_string()),
            Self::List => Value::String("list".to_string()),
            Self::Unknown => Value::String("unknown".to_string()),
        }
    }
}

/// Text form used in findings: literals as written, tags by name.
impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::None => f.write_str("None"),
            Self::Dict => f.write_str("dict"),
            Self::List => f.write_str("list"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Result of parsing one call string. `method_name` is `None` when the
/// string is not a call expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedCall {
    pub method_name: Option<String>,
    pub args: Vec<ArgShape>,
}

impl ParsedCall {
    pub fn is_parsed(&self) -> bool {
        self.method_name.is_some()
    }

    pub fn arg(&self, index: usize) -> Option<&ArgShape> {
        self.args.get(index)
    }
}

/// Parse a call string, folding every failure into an unparsed call.
pub fn parse_call(call_str: &str) -> ParsedCall {
    try_parse_call(call_str).unwrap_or_default()
}

/// Parse a call string, reporting why it is not a call.
pub fn try_parse_call(call_str: &str) -> Result<ParsedCall, CallSyntaxError> {
    if call_str.trim().is_empty() {
        return Err(CallSyntaxError::Empty);
    }

    let (_, (head, links)) = all_consuming(delimited(
        multispace0,
        pair(identifier, many0(postfix)),
        multispace0,
    ))(call_str)
    .map_err(|err| syntax_error(call_str, err))?;

    // The callee of the outermost call is the name or attribute right
    // before its argument list; `f()()` calls a call result.
    let mut callee = Some(head.to_string());
    let mut outer = None;
    for link in links {
        match link {
            Postfix::Attr(name) => {
                callee = Some(name);
                outer = None;
            }
            Postfix::Call(args) => outer = Some((callee.take(), args)),
        }
    }

    match outer {
        Some((Some(method_name), args)) => Ok(ParsedCall {
            method_name: Some(method_name),
            args,
        }),
        _ => Err(CallSyntaxError::NotACall),
    }
}

fn syntax_error(source: &str, err: nom::Err<NomError<&str>>) -> CallSyntaxError {
    let rest = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
        nom::Err::Incomplete(_) => "",
    };
    CallSyntaxError::Unexpected {
        offset: source.len().saturating_sub(rest.len()),
        near: rest.chars().take(16).collect(),
    }
}

fn fail(input: &str, kind: ErrorKind) -> nom::Err<NomError<&str>> {
    nom::Err::Error(NomError::new(input, kind))
}

// ============================================================================
// Names and call chains
// ============================================================================

enum Postfix {
    Attr(String),
    Call(Vec<ArgShape>),
}

enum Argument {
    Positional(ArgShape),
    Keyword,
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_identifier_start), take_while(is_identifier_char)))(input)
}

fn postfix(input: &str) -> IResult<&str, Postfix> {
    preceded(
        multispace0,
        alt((
            map(
                preceded(pair(char('.'), multispace0), identifier),
                |name: &str| Postfix::Attr(name.to_string()),
            ),
            map(arguments, Postfix::Call),
        )),
    )(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<ArgShape>> {
    let (rest, items) = delimited(
        pair(char('('), multispace0),
        terminated(separated_list0(comma, argument), opt(comma)),
        pair(multispace0, char(')')),
    )(input)?;

    let positional = items
        .into_iter()
        .filter_map(|item| match item {
            Argument::Positional(shape) => Some(shape),
            Argument::Keyword => None,
        })
        .collect();
    Ok((rest, positional))
}

fn argument(input: &str) -> IResult<&str, Argument> {
    alt((
        map(preceded(pair(tag("**"), multispace0), expression), |_| {
            Argument::Keyword
        }),
        map(
            tuple((
                identifier,
                multispace0,
                char('='),
                not(char('=')),
                multispace0,
                expression,
            )),
            |_| Argument::Keyword,
        ),
        map(expression, Argument::Positional),
    ))(input)
}

// ============================================================================
// Argument expressions
// ============================================================================

fn expression(input: &str) -> IResult<&str, ArgShape> {
    bounded_expression(input, "")
}

fn dict_key(input: &str) -> IResult<&str, ArgShape> {
    bounded_expression(input, ":")
}

fn bounded_expression<'a>(input: &'a str, extra_stops: &str) -> IResult<&'a str, ArgShape> {
    if let Ok((rest, shape)) = primary(input)
        && at_separator(rest, extra_stops)
    {
        return Ok((rest, shape));
    }
    opaque_run(input, extra_stops)
}

fn at_separator(rest: &str, extra_stops: &str) -> bool {
    match rest.trim_start().chars().next() {
        None => true,
        Some(c) => matches!(c, ',' | ')' | ']' | '}') || extra_stops.contains(c),
    }
}

/// Consumes tokens up to the next top-level separator, skipping quoted
/// strings and nested brackets. Fails on an empty or unbalanced run.
fn opaque_run<'a>(input: &'a str, extra_stops: &str) -> IResult<&'a str, ArgShape> {
    let mut depth = 0usize;
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        match c {
            '"' | '\'' => {
                let (after, _) = quoted_body(rest, true)?;
                rest = after;
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => break,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => break,
            _ if depth == 0 && extra_stops.contains(c) => break,
            _ => {}
        }
        rest = &rest[c.len_utf8()..];
    }
    if depth > 0 {
        return Err(fail(rest, ErrorKind::Eof));
    }

    let consumed = input[..input.len() - rest.len()].trim_end();
    if consumed.is_empty() {
        return Err(fail(input, ErrorKind::Verify));
    }
    Ok((&input[consumed.len()..], ArgShape::Unknown))
}

fn primary(input: &str) -> IResult<&str, ArgShape> {
    alt((
        string_literal,
        number_literal,
        list_display,
        brace_display,
        paren_display,
        starred,
        reference,
    ))(input)
}

fn reference(input: &str) -> IResult<&str, ArgShape> {
    let (rest, (head, links)) = pair(identifier, many0(postfix))(input)?;
    let shape = if links.is_empty() {
        match head {
            "True" => ArgShape::Bool(true),
            "False" => ArgShape::Bool(false),
            "None" => ArgShape::None,
            _ => ArgShape::Unknown,
        }
    } else {
        ArgShape::Unknown
    };
    Ok((rest, shape))
}

fn starred(input: &str) -> IResult<&str, ArgShape> {
    map(
        preceded(
            pair(char('*'), not(char('*'))),
            preceded(multispace0, expression),
        ),
        |_| ArgShape::Unknown,
    )(input)
}

fn list_display(input: &str) -> IResult<&str, ArgShape> {
    map(
        delimited(
            pair(char('['), multispace0),
            terminated(separated_list0(comma, expression), opt(comma)),
            pair(multispace0, char(']')),
        ),
        |_| ArgShape::List,
    )(input)
}

enum BraceItem {
    Pair,
    Single,
}

fn brace_item(input: &str) -> IResult<&str, BraceItem> {
    alt((
        map(preceded(pair(tag("**"), multispace0), expression), |_| {
            BraceItem::Pair
        }),
        map(
            pair(
                dict_key,
                opt(preceded(
                    delimited(multispace0, char(':'), multispace0),
                    expression,
                )),
            ),
            |(_, value)| {
                if value.is_some() {
                    BraceItem::Pair
                } else {
                    BraceItem::Single
                }
            },
        ),
    ))(input)
}

/// `{}` and `{k: v, ...}` are dicts; `{a, b}` is a set.
fn brace_display(input: &str) -> IResult<&str, ArgShape> {
    let (rest, items) = delimited(
        pair(char('{'), multispace0),
        terminated(separated_list0(comma, brace_item), opt(comma)),
        pair(multispace0, char('}')),
    )(input)?;

    let shape = if items.iter().all(|item| matches!(item, BraceItem::Pair)) {
        ArgShape::Dict
    } else {
        ArgShape::Unknown
    };
    Ok((rest, shape))
}

/// `(x)` is just `x`; `()`, `(x,)` and `(x, y)` are tuples.
fn paren_display(input: &str) -> IResult<&str, ArgShape> {
    let (rest, (items, trailing)) = delimited(
        pair(char('('), multispace0),
        pair(separated_list0(comma, expression), opt(comma)),
        pair(multispace0, char(')')),
    )(input)?;

    let shape = match (items.as_slice(), trailing) {
        ([single], None) => single.clone(),
        _ => ArgShape::Unknown,
    };
    Ok((rest, shape))
}

// ============================================================================
// Literals
// ============================================================================

fn digits(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, many0(alt((digit1, tag("_"))))))(input)
}

fn number_literal(input: &str) -> IResult<&str, ArgShape> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        alt((
            recognize(pair(digits, opt(pair(char('.'), opt(digits))))),
            recognize(pair(char('.'), digits)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digits))),
    )))(input)?;
    let (rest, _) = not(satisfy(is_identifier_char))(rest)?;

    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let is_float = cleaned.contains(['.', 'e', 'E']);
    let shape = match (is_float, cleaned.parse::<i64>()) {
        (false, Ok(value)) => ArgShape::Int(value),
        _ => cleaned
            .parse::<f64>()
            .map(ArgShape::Float)
            .unwrap_or(ArgShape::Unknown),
    };
    Ok((rest, shape))
}

enum Piece {
    Text(String),
    Opaque,
}

/// One or more adjacent string literals, concatenated.
fn string_literal(input: &str) -> IResult<&str, ArgShape> {
    let (rest, first) = string_piece(input)?;
    let (rest, more) = many0(preceded(multispace0, string_piece))(rest)?;

    let mut text = String::new();
    for piece in std::iter::once(first).chain(more) {
        match piece {
            Piece::Text(part) => text.push_str(&part),
            Piece::Opaque => return Ok((rest, ArgShape::Unknown)),
        }
    }
    Ok((rest, ArgShape::Str(text)))
}

fn string_piece(input: &str) -> IResult<&str, Piece> {
    let (rest, prefix) = take_while_m_n(0, 2, |c: char| {
        matches!(c, 'r' | 'R' | 'b' | 'B' | 'f' | 'F' | 'u' | 'U')
    })(input)?;
    let raw = prefix.contains(['r', 'R']);
    let opaque = prefix.contains(['b', 'B', 'f', 'F']);
    let (rest, text) = quoted_body(rest, raw)?;
    let piece = if opaque {
        Piece::Opaque
    } else {
        Piece::Text(text)
    };
    Ok((rest, piece))
}

fn quoted_body(input: &str, raw: bool) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(fail(input, ErrorKind::Char)),
    };
    let triple = quote.to_string().repeat(3);
    let delimiter = if input.starts_with(&triple) {
        triple.as_str()
    } else {
        &triple[..1]
    };
    let body = &input[delimiter.len()..];

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        if body[idx..].starts_with(delimiter) {
            return Ok((&body[idx + delimiter.len()..], out));
        }
        match c {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                if raw {
                    out.push('\\');
                    out.push(escaped);
                    continue;
                }
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'a' => out.push('\x07'),
                    'b' => out.push('\x08'),
                    'f' => out.push('\x0c'),
                    'v' => out.push('\x0b'),
                    '\\' | '\'' | '"' => out.push(escaped),
                    '\n' => {}
                    'x' | 'u' | 'U' => {
                        let width = match escaped {
                            'x' => 2,
                            'u' => 4,
                            _ => 8,
                        };
                        let hex: String = chars.by_ref().take(width).map(|(_, h)| h).collect();
                        let decoded = (hex.len() == width)
                            .then(|| u32::from_str_radix(&hex, 16).ok())
                            .flatten()
                            .and_then(char::from_u32);
                        match decoded {
                            Some(ch) => out.push(ch),
                            None => return Err(fail(input, ErrorKind::HexDigit)),
                        }
                    }
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '\n' if delimiter.len() == 1 => break,
            _ => out.push(c),
        }
    }
    Err(fail(input, ErrorKind::Char))
}
