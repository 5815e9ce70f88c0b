//! Parser interface and the fragment parser used for interpolation.
//!
//! Whole stylesheets come from a [`SourceParser`] supplied by the caller. The
//! evaluator also re-parses interpolated selector and media-query text while it
//! runs; [`FragmentParser`] handles those two start rules on its own.

mod media;
mod selector;

use css_tree::{ErrorKind, EvalError, EvalResult, Loc, MediaQuery, Node, Selector};
use std::rc::Rc;

/// Grammar entry point requested from a parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartRule {
    Stylesheet,
    Selector,
    MediaQuery,
}

/// Context for one parse request.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// File the text belongs to.
    pub filename: String,
    pub start_rule: StartRule,
    /// Location of the fragment inside its file, for interpolated text.
    pub loc: Option<Loc>,
}

impl ParseOptions {
    pub fn new(filename: &str, start_rule: StartRule) -> Self {
        Self {
            filename: filename.to_owned(),
            start_rule,
            loc: None,
        }
    }

    #[must_use]
    pub fn at(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    /// Location of the first character of the parsed text.
    pub fn base_loc(&self) -> Loc {
        self.loc
            .clone()
            .unwrap_or_else(|| Loc::new(&self.filename, 1, 1))
    }
}

/// Result of a parse, shaped by the start rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    Stylesheet(Vec<Node>),
    Selector(Selector),
    MediaQuery(MediaQuery),
}

/// Turns source text into tree nodes.
pub trait SourceParser {
    /// Parse `source` according to `options.start_rule`.
    ///
    /// # Errors
    /// Returns a parse error when the text does not match the start rule.
    fn parse(&self, source: &str, options: &ParseOptions) -> EvalResult<Parsed>;
}

/// Parses selector and media-query fragments. Stylesheets are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct FragmentParser;

impl SourceParser for FragmentParser {
    fn parse(&self, source: &str, options: &ParseOptions) -> EvalResult<Parsed> {
        let base = options.base_loc();
        match options.start_rule {
            StartRule::Selector => selector::parse_selector(source, &base).map(Parsed::Selector),
            StartRule::MediaQuery => {
                media::parse_media_query(source, &base).map(Parsed::MediaQuery)
            }
            StartRule::Stylesheet => Err(EvalError::new(
                ErrorKind::Parse,
                "the fragment parser cannot parse whole stylesheets",
                &base,
            )),
        }
    }
}

/// `base` moved `offset` columns to the right.
pub(crate) fn shifted(base: &Loc, offset: usize) -> Loc {
    let offset = u32::try_from(offset).unwrap_or(u32::MAX);
    Loc {
        filename: Rc::clone(&base.filename),
        line: base.line,
        column: base.column.saturating_add(offset),
    }
}
