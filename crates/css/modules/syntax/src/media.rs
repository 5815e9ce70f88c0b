//! Media-query fragment parsing on top of the `cssparser` tokenizer.

use crate::shifted;
use css_tree::{ErrorKind, EvalError, EvalResult, Loc, MediaQuery, Node, NodeKind};
use cssparser::{ParseError, Parser, ParserInput, SourceLocation, Token};
use std::rc::Rc;

/// Parse one media query, e.g. `only screen and (min-width: 40em)`.
pub fn parse_media_query(source: &str, base: &Loc) -> EvalResult<MediaQuery> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    let parts = parser
        .parse_entirely(|input| query_parts(input, base))
        .map_err(|error| {
            EvalError::new(
                ErrorKind::Parse,
                format!("invalid media query '{}': {:?}", source.trim(), error.kind),
                &located(base, error.location),
            )
        })?;
    if parts.is_empty() {
        return Err(EvalError::new(ErrorKind::Parse, "expected a media query", base));
    }
    Ok(MediaQuery::new(parts, base.clone()))
}

/// Map a tokenizer location (0-based line, 1-based column) into the file.
fn located(base: &Loc, location: SourceLocation) -> Loc {
    if location.line == 0 {
        let column = usize::try_from(location.column.saturating_sub(1)).unwrap_or(0);
        return shifted(base, column);
    }
    Loc {
        filename: Rc::clone(&base.filename),
        line: base.line.saturating_add(location.line),
        column: location.column,
    }
}

fn query_parts<'input>(
    input: &mut Parser<'input, '_>,
    base: &Loc,
) -> Result<Vec<Node>, ParseError<'input, ()>> {
    let mut parts = Vec::new();
    while !input.is_exhausted() {
        let loc = located(base, input.current_source_location());
        let token = input.next()?.clone();
        match token {
            Token::Ident(name) => {
                let lower = name.to_ascii_lowercase();
                let kind = if matches!(lower.as_str(), "and" | "only" | "not") {
                    NodeKind::MediaKeyword(lower)
                } else {
                    NodeKind::MediaType(Box::new(Node::ident(&name, loc.clone())))
                };
                parts.push(Node::new(kind, loc));
            }
            Token::ParenthesisBlock => {
                let node = input.parse_nested_block(|block| feature(block, &loc))?;
                parts.push(node);
            }
            other => return Err(input.new_unexpected_token_error(other)),
        }
    }
    Ok(parts)
}

/// `(name)` or `(name: value)`.
fn feature<'input>(
    input: &mut Parser<'input, '_>,
    loc: &Loc,
) -> Result<Node, ParseError<'input, ()>> {
    let name = input.expect_ident()?.to_string();
    let value = input
        .try_parse(Parser::expect_colon)
        .ok()
        .map(|()| feature_value(input, loc))
        .transpose()?
        .map(Box::new);
    Ok(Node::new(
        NodeKind::MediaFeature {
            name: Box::new(Node::ident(&name, loc.clone())),
            value,
        },
        loc.clone(),
    ))
}

/// A single token becomes a typed value; anything longer (ratios, lists) stays raw.
fn feature_value<'input>(
    input: &mut Parser<'input, '_>,
    loc: &Loc,
) -> Result<Node, ParseError<'input, ()>> {
    let start = input.position();
    let mut tokens = Vec::new();
    while !input.is_exhausted() {
        tokens.push(input.next()?.clone());
    }
    if tokens.is_empty() {
        return Err(input.new_error_for_next_token());
    }
    let text = input.slice_from(start).trim();
    let typed = match tokens.as_slice() {
        [Token::Number { value, .. }] => Some(Node::number(
            text.parse().unwrap_or(f64::from(*value)),
            loc.clone(),
        )),
        [Token::Percentage { unit_value, .. }] => {
            let fallback = f64::from(*unit_value) * 100.0;
            let number = text.trim_end_matches('%').parse().unwrap_or(fallback);
            Some(Node::new(NodeKind::Percentage(number), loc.clone()))
        }
        [Token::Dimension { value, unit, .. }] => {
            let number = text
                .get(..text.len().saturating_sub(unit.len()))
                .and_then(|digits| digits.parse().ok())
                .unwrap_or(f64::from(*value));
            Some(Node::dimension(number, unit, loc.clone()))
        }
        [Token::Ident(name)] => Some(Node::ident(name, loc.clone())),
        _ => None,
    };
    Ok(typed.unwrap_or_else(|| Node::raw(text, loc.clone())))
}
