//! Selector fragment parsing.

use crate::shifted;
use css_tree::value::quoted;
use css_tree::{ErrorKind, EvalError, EvalResult, Loc, Node, NodeKind, Quote, Selector};

/// Parse one complex selector, e.g. `> .item:hover`.
pub fn parse_selector(source: &str, base: &Loc) -> EvalResult<Selector> {
    let mut tokenizer = SelectorTokenizer::new(source, base);
    let parts = tokenizer.sequence(false)?;
    if parts.is_empty() {
        return Err(tokenizer.error("expected a selector"));
    }
    Ok(Selector::new(parts, base.clone()))
}

/// Byte cursor over selector text.
struct SelectorTokenizer<'src> {
    /// Source bytes.
    input_bytes: &'src [u8],
    /// Current cursor index into `input_bytes`.
    index: usize,
    /// Location of the first byte.
    base: Loc,
}

impl<'src> SelectorTokenizer<'src> {
    fn new(input: &'src str, base: &Loc) -> Self {
        Self {
            input_bytes: input.as_bytes(),
            index: 0,
            base: base.clone(),
        }
    }

    fn loc(&self) -> Loc {
        shifted(&self.base, self.index)
    }

    fn error(&self, message: &str) -> EvalError {
        EvalError::new(ErrorKind::Parse, message, &self.loc())
    }

    fn peek(&self) -> Option<u8> {
        self.input_bytes.get(self.index).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Skip whitespace, reporting whether any was seen.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.index;
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
        self.index > start
    }

    /// Simple selectors and combinators up to the end, or up to `)` when nested.
    fn sequence(&mut self, nested: bool) -> EvalResult<Vec<Node>> {
        let mut parts: Vec<Node> = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            let Some(byte) = self.peek() else {
                break;
            };
            match byte {
                b')' if nested => break,
                b',' => return Err(self.error("selector lists cannot be interpolated")),
                b'>' | b'+' | b'~' => {
                    let loc = self.loc();
                    self.bump();
                    parts.push(Node::new(NodeKind::Combinator(char::from(byte).to_string()), loc));
                }
                _ => {
                    let after_compound = parts.last().is_some_and(|last| !last.is_combinator());
                    if spaced && after_compound {
                        parts.push(Node::new(NodeKind::Combinator(" ".to_owned()), self.loc()));
                    }
                    parts.push(self.simple()?);
                }
            }
        }
        Ok(parts)
    }

    fn simple(&mut self) -> EvalResult<Node> {
        let loc = self.loc();
        let kind = match self.peek() {
            Some(b'*') => {
                self.bump();
                NodeKind::UniversalSelector
            }
            Some(b'.') => {
                self.bump();
                NodeKind::ClassSelector(Box::new(self.required_ident()?))
            }
            Some(b'#') => {
                self.bump();
                NodeKind::HashSelector(Box::new(self.required_ident()?))
            }
            Some(b'&') => {
                self.bump();
                let suffix = self.ident().map(Box::new);
                NodeKind::AmpersandSelector(suffix)
            }
            Some(b'[') => self.attribute()?,
            Some(b':') => self.pseudo()?,
            Some(byte) if is_ident_byte(byte) => {
                NodeKind::TypeSelector(Box::new(self.required_ident()?))
            }
            _ => return Err(self.error("unexpected character in selector")),
        };
        Ok(Node::new(kind, loc))
    }

    /// Identifier made of ASCII alphanumerics, `-`, `_`, non-ASCII bytes and escapes.
    fn ident(&mut self) -> Option<Node> {
        let loc = self.loc();
        let start = self.index;
        while let Some(byte) = self.peek() {
            if byte == b'\\' {
                self.bump();
                self.bump();
            } else if is_ident_byte(byte) {
                self.bump();
            } else {
                break;
            }
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        if slice.is_empty() {
            return None;
        }
        Some(Node::ident(&String::from_utf8_lossy(slice), loc))
    }

    fn required_ident(&mut self) -> EvalResult<Node> {
        self.ident().ok_or_else(|| self.error("expected an identifier"))
    }

    /// `[name]` or `[name op value]`, value quoted or bare.
    fn attribute(&mut self) -> EvalResult<NodeKind> {
        self.bump();
        self.skip_whitespace();
        let name = self.required_ident()?;
        self.skip_whitespace();
        let operator_start = self.index;
        while self
            .peek()
            .is_some_and(|byte| matches!(byte, b'=' | b'~' | b'|' | b'^' | b'$' | b'*'))
        {
            self.bump();
        }
        let operator = self
            .input_bytes
            .get(operator_start..self.index)
            .filter(|slice| !slice.is_empty())
            .map(|slice| String::from_utf8_lossy(slice).into_owned());
        self.skip_whitespace();
        let value = operator
            .as_ref()
            .map(|_| self.attribute_value())
            .transpose()?
            .map(Box::new);
        self.skip_whitespace();
        if self.peek() != Some(b']') {
            return Err(self.error("expected ']'"));
        }
        self.bump();
        Ok(NodeKind::AttributeSelector {
            name: Box::new(name),
            operator,
            value,
        })
    }

    fn attribute_value(&mut self) -> EvalResult<Node> {
        let loc = self.loc();
        let quote = match self.peek() {
            Some(b'"') => Quote::Double,
            Some(b'\'') => Quote::Single,
            _ => return self.required_ident(),
        };
        let delimiter = u8::try_from(quote.as_char()).unwrap_or(b'"');
        self.bump();
        let start = self.index;
        while matches!(self.peek(), Some(byte) if byte != delimiter) {
            self.bump();
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        let text = String::from_utf8_lossy(slice).into_owned();
        if self.peek().is_none() {
            return Err(self.error("unterminated string"));
        }
        self.bump();
        Ok(quoted(&text, quote, loc))
    }

    /// `:name`, `::name`, `:name(argument)` or `:not(selector)`.
    fn pseudo(&mut self) -> EvalResult<NodeKind> {
        self.bump();
        let double_colon = self.peek() == Some(b':');
        if double_colon {
            self.bump();
        }
        let name = self.required_ident()?;
        if self.peek() != Some(b'(') {
            return Ok(NodeKind::PseudoSelector {
                double_colon,
                name: Box::new(name),
                argument: None,
            });
        }
        self.bump();
        let negation = !double_colon
            && name
                .identifier_text()
                .is_some_and(|text| text.eq_ignore_ascii_case("not"));
        if negation {
            let loc = self.loc();
            let inner = self.sequence(true)?;
            self.close_paren()?;
            return Ok(NodeKind::NegationSelector(Box::new(Selector::new(inner, loc))));
        }

        let loc = self.loc();
        let start = self.index;
        let mut depth = 0_usize;
        while let Some(byte) = self.peek() {
            match byte {
                b'(' => depth = depth.saturating_add(1),
                b')' if depth == 0 => break,
                b')' => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        let argument = Node::raw(String::from_utf8_lossy(slice).trim(), loc);
        self.close_paren()?;
        Ok(NodeKind::PseudoSelector {
            double_colon,
            name: Box::new(name),
            argument: Some(Box::new(argument)),
        })
    }

    fn close_paren(&mut self) -> EvalResult<()> {
        self.skip_whitespace();
        if self.peek() != Some(b')') {
            return Err(self.error("expected ')'"));
        }
        self.bump();
        Ok(())
    }
}

const fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> EvalResult<Vec<Node>> {
        parse_selector(source, &Loc::new("test.roo", 1, 1)).map(|selector| selector.parts)
    }

    fn class(name: &str) -> Node {
        Node::new(
            NodeKind::ClassSelector(Box::new(Node::ident(name, Loc::default()))),
            Loc::default(),
        )
    }

    fn combinator(symbol: &str) -> Node {
        Node::new(NodeKind::Combinator(symbol.to_owned()), Loc::default())
    }

    #[test]
    fn whitespace_becomes_a_descendant_combinator() -> EvalResult<()> {
        assert_eq!(parse(" .a  .b ")?, vec![class("a"), combinator(" "), class("b")]);
        assert_eq!(parse(".a > .b")?, vec![class("a"), combinator(">"), class("b")]);
        assert_eq!(parse("+ .b")?, vec![combinator("+"), class("b")]);
        Ok(())
    }

    #[test]
    fn ampersand_with_suffix() -> EvalResult<()> {
        let parts = parse("&-item")?;
        let expected = Node::new(
            NodeKind::AmpersandSelector(Some(Box::new(Node::ident("-item", Loc::default())))),
            Loc::default(),
        );
        assert_eq!(parts, vec![expected]);
        Ok(())
    }

    #[test]
    fn attributes_pseudos_and_negation() -> EvalResult<()> {
        let parts = parse("a[href^='http']:not(.x):nth-child(2n + 1)::before")?;
        assert_eq!(parts.len(), 5);
        let is_negation = parts
            .get(2)
            .is_some_and(|part| matches!(part.kind, NodeKind::NegationSelector(_)));
        assert!(is_negation);
        let Some(NodeKind::PseudoSelector { argument, .. }) = parts.get(3).map(|part| &part.kind)
        else {
            return Err(EvalError::new(
                ErrorKind::Parse,
                "expected a pseudo selector",
                &Loc::default(),
            ));
        };
        assert_eq!(argument.as_deref(), Some(&Node::raw("2n + 1", Loc::default())));
        Ok(())
    }

    #[test]
    fn lists_and_garbage_are_rejected() {
        assert!(parse(".a, .b").is_err_and(|error| error.kind == ErrorKind::Parse));
        assert!(parse(".").is_err_and(|error| error.kind == ErrorKind::Parse));
        assert!(parse("").is_err_and(|error| error.kind == ErrorKind::Parse));
    }

    #[test]
    fn locations_follow_the_fragment_base() -> EvalResult<()> {
        let selector = parse_selector(".a .b", &Loc::new("x.roo", 3, 10))?;
        let columns: Vec<u32> = selector.parts.iter().map(|part| part.loc.column).collect();
        assert_eq!(columns, vec![10, 13, 13]);
        Ok(())
    }
}
