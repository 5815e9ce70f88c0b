//! Ancestor state threaded through the evaluator.
//!
//! A [`Context`] is never mutated in place. Nested visits derive a new one
//! and the caller's copy is what remains when the visit returns.

use css_tree::{MediaQueryList, SelectorList};
use std::rc::Rc;

/// What kind of call body is being evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallKind {
    #[default]
    None,
    Function,
    Mixin,
}

#[derive(Clone, Debug, Default)]
pub struct Context {
    /// Joined selectors of the enclosing ruleset.
    pub selectors: Option<Rc<SelectorList>>,
    /// Joined queries of the enclosing media block.
    pub media: Option<Rc<MediaQueryList>>,
    /// Accumulated `@module` name and separator prepended to class selectors.
    pub module_prefix: String,
    /// Directly inside a `@module` body, with no ruleset in between.
    pub module_root: bool,
    pub in_void: bool,
    pub call: CallKind,
    /// Inside `calc()` arguments: operands are evaluated, arithmetic is not folded.
    pub retain_arithmetic: bool,
}

impl Context {
    pub fn with_selectors(&self, selectors: SelectorList) -> Self {
        Self {
            selectors: Some(Rc::new(selectors)),
            module_root: false,
            ..self.clone()
        }
    }

    pub fn with_media(&self, media: MediaQueryList) -> Self {
        Self {
            media: Some(Rc::new(media)),
            ..self.clone()
        }
    }

    pub fn with_module_prefix(&self, module_prefix: String) -> Self {
        Self {
            module_prefix,
            module_root: true,
            ..self.clone()
        }
    }

    pub fn voided(&self) -> Self {
        Self {
            in_void: true,
            ..self.clone()
        }
    }

    pub fn calling(&self, call: CallKind) -> Self {
        Self {
            call,
            retain_arithmetic: false,
            ..self.clone()
        }
    }

    pub fn retaining(&self) -> Self {
        Self {
            retain_arithmetic: true,
            ..self.clone()
        }
    }

    /// Same ancestors with arithmetic folded again.
    pub fn folding(&self) -> Self {
        Self {
            retain_arithmetic: false,
            ..self.clone()
        }
    }
}
