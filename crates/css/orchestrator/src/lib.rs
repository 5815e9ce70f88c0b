//! Stylesheet evaluation pipeline.
//!
//! A parsed stylesheet goes through three passes:
//! - the evaluator runs variables, control flow, functions, imports and selector nesting
//! - the reevaluator applies `@extend` and mixin-by-selector against the whole tree
//! - the normalizer flattens nesting into plain CSS and drops empty blocks
//!
//! Parsing and loading are supplied by the caller through [`SourceParser`] and
//! [`Loader`]. Evaluation is single-threaded and suspends only while loading.

mod context;
mod evaluator;
mod loader;
mod normalizer;
mod reevaluator;
mod resolver;

use anyhow::Error;
use css_syntax::{ParseOptions, Parsed, SourceParser, StartRule};
use css_tree::{ErrorKind, EvalError, EvalResult, Loc, Node, NodeKind, Options};
use evaluator::Evaluator;
use log::debug;
use normalizer::normalize;
use reevaluator::reevaluate;

pub use loader::{FsLoader, Loader};
pub use resolver::{Resolver, SourceFile};

/// One compilation: options plus the parser and loader it runs with.
pub struct Pipeline<'pipe> {
    options: Options,
    parser: &'pipe dyn SourceParser,
    loader: &'pipe dyn Loader,
}

impl<'pipe> Pipeline<'pipe> {
    #[inline]
    pub fn new(
        options: Options,
        parser: &'pipe dyn SourceParser,
        loader: &'pipe dyn Loader,
    ) -> Self {
        Self {
            options,
            parser,
            loader,
        }
    }

    /// Evaluate, reevaluate and normalize a `Stylesheet` node.
    ///
    /// # Errors
    /// Returns the first evaluation failure. Nothing is emitted on error.
    pub async fn evaluate(&mut self, stylesheet: Node) -> EvalResult<Node> {
        let Node { kind, loc, .. } = stylesheet;
        let NodeKind::Stylesheet(rules) = kind else {
            return Err(EvalError::structure("expected a stylesheet", &loc));
        };
        debug!("evaluating {}", self.options.filename.display());

        let mut rules = Evaluator::new(&mut self.options, self.parser, self.loader)
            .evaluate(rules)
            .await?;
        reevaluate(&mut rules)?;
        let rules = normalize(rules)?;
        Ok(Node::new(NodeKind::Stylesheet(rules), loc))
    }

    /// Parse `source` as the root file, then evaluate it.
    ///
    /// # Errors
    /// Parse failures, then anything [`Self::evaluate`] reports.
    pub async fn evaluate_source(&mut self, source: &str) -> EvalResult<Node> {
        let filename = self.options.filename.to_string_lossy().into_owned();
        let loc = Loc::new(&filename, 1, 1);
        let options = ParseOptions::new(&filename, StartRule::Stylesheet);
        let Parsed::Stylesheet(rules) = self.parser.parse(source, &options)? else {
            return Err(EvalError::new(
                ErrorKind::Parse,
                format!("{filename} did not parse as a stylesheet"),
                &loc,
            ));
        };
        self.evaluate(Node::new(NodeKind::Stylesheet(rules), loc)).await
    }

    /// Load the root file through the loader, then evaluate it.
    ///
    /// # Errors
    /// `Io` when the root file cannot be read, then anything
    /// [`Self::evaluate_source`] reports.
    pub async fn evaluate_file(&mut self) -> EvalResult<Node> {
        let path = self.options.filename.clone();
        let source = self.loader.load(&path).await.map_err(|error| {
            let loc = Loc::new(&path.to_string_lossy(), 1, 1);
            let message = format!("cannot read {}: {error}", path.display());
            EvalError::new(ErrorKind::Io, message, &loc).with_source(Error::new(error))
        })?;
        self.evaluate_source(&source).await
    }

    /// Options as updated by the last evaluation, including loaded imports.
    #[inline]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn into_options(self) -> Options {
        self.options
    }
}
