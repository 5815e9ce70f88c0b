//! Selector and media-query lists.
//!
//! A selector is a flat run of simple selectors and combinators, the way it is
//! written in source. Lists compare structurally and ignore bookkeeping fields.

use crate::node::{Loc, Node};

#[derive(Clone, Debug, Default)]
pub struct Selector {
    pub parts: Vec<Node>,
    pub loc: Loc,
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Selector {
    pub const fn new(parts: Vec<Node>, loc: Loc) -> Self {
        Self { parts, loc }
    }

    pub fn starts_with_combinator(&self) -> bool {
        self.parts.first().is_some_and(Node::is_combinator)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
    /// Selectors as written, before joining with the ancestor list.
    pub original: Option<Vec<Selector>>,
    /// Selectors appended by `@extend`s coming from outside a void.
    pub extended: Option<Vec<Selector>>,
    /// Written directly in a `@module` body. Extending it leaves nested rulesets alone.
    pub module: bool,
    pub loc: Loc,
}

impl PartialEq for SelectorList {
    fn eq(&self, other: &Self) -> bool {
        self.selectors == other.selectors
    }
}

impl SelectorList {
    pub const fn new(selectors: Vec<Selector>, loc: Loc) -> Self {
        Self {
            selectors,
            original: None,
            extended: None,
            module: false,
            loc,
        }
    }

    /// Unjoined form of this list: `original` when recorded, the live selectors otherwise.
    pub fn unjoined(&self) -> Self {
        let selectors = self
            .original
            .clone()
            .unwrap_or_else(|| self.selectors.clone());
        Self::new(selectors, self.loc.clone())
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.selectors.iter().any(|candidate| candidate == selector)
    }

    /// Record selectors appended by an extension.
    pub fn record_extended(&mut self, appended: &[Selector]) {
        self.extended
            .get_or_insert_with(Vec::new)
            .extend_from_slice(appended);
    }
}

#[derive(Clone, Debug, Default)]
pub struct MediaQuery {
    /// Media types, features and `and`/`only`/`not` keywords in source order.
    pub parts: Vec<Node>,
    pub loc: Loc,
}

impl PartialEq for MediaQuery {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl MediaQuery {
    pub const fn new(parts: Vec<Node>, loc: Loc) -> Self {
        Self { parts, loc }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MediaQueryList {
    pub queries: Vec<MediaQuery>,
    pub loc: Loc,
}

impl PartialEq for MediaQueryList {
    fn eq(&self, other: &Self) -> bool {
        self.queries == other.queries
    }
}

impl MediaQueryList {
    pub const fn new(queries: Vec<MediaQuery>, loc: Loc) -> Self {
        Self { queries, loc }
    }
}
