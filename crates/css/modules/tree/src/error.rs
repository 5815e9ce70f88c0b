use crate::node::{Loc, Node};
use core::error::Error;
use core::fmt;

/// Failure categories reported by the evaluation passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A variable was used before being defined.
    UndefinedVariable,
    /// An operation was applied to an incompatible node kind.
    Type,
    /// A construct appeared where it is not allowed.
    Structure,
    /// No candidate path resolved an `@import`.
    ModuleNotFound,
    /// A mixin targets a ruleset that is currently being expanded.
    CircularMixin,
    /// The parser rejected a source or fragment.
    Parse,
    /// Loading a file failed for a reason other than "not found".
    Io,
}

/// An evaluation failure with the location of the offending node.
#[derive(Debug)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub loc: Loc,
    pub source: Option<anyhow::Error>,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, loc: &Loc) -> Self {
        Self {
            kind,
            message: message.into(),
            loc: loc.clone(),
            source: None,
        }
    }

    pub fn undefined(name: &str, node: &Node) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("${name} is undefined"),
            &node.loc,
        )
    }

    pub fn type_error(message: impl Into<String>, node: &Node) -> Self {
        Self::new(ErrorKind::Type, message, &node.loc)
    }

    pub fn structure(message: impl Into<String>, loc: &Loc) -> Self {
        Self::new(ErrorKind::Structure, message, loc)
    }

    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.loc, self.message)
    }
}

impl Error for EvalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        let error = self.source.as_ref()?;
        let source: &(dyn Error + 'static) = error.as_ref();
        Some(source)
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
