//! Lexical scope chain.
//!
//! Frames are linked from innermost to outermost and shared by reference, so
//! capturing a closure is a pointer copy. A push made through one handle never
//! shows up in another handle, while bindings written into a shared frame are
//! visible through every handle that reaches it.

use crate::node::Node;
use core::cell::RefCell;
use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

/// Bindings of one block. Variables, functions and mixins share the namespace.
pub type Frame = HashMap<String, Node>;

struct Link {
    frame: RefCell<Frame>,
    parent: Option<Rc<Link>>,
}

#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Rc<Link>>,
}

impl Scope {
    /// Build a chain from frames listed outermost first.
    pub fn new(frames: Vec<Frame>) -> Self {
        let mut scope = Self::default();
        for frame in frames {
            scope.push_frame(frame);
        }
        scope
    }

    pub fn push(&mut self) {
        self.push_frame(Frame::new());
    }

    fn push_frame(&mut self, frame: Frame) {
        let parent = self.head.take();
        self.head = Some(Rc::new(Link {
            frame: RefCell::new(frame),
            parent,
        }));
    }

    pub fn pop(&mut self) {
        if let Some(link) = self.head.take() {
            self.head.clone_from(&link.parent);
        }
    }

    /// Bind `name` in the innermost frame.
    pub fn define(&self, name: &str, value: Node) {
        if let Some(link) = &self.head {
            link.frame.borrow_mut().insert(name.to_owned(), value);
        }
    }

    /// Nearest binding of `name`, walking outward.
    pub fn resolve(&self, name: &str) -> Option<Node> {
        let mut current = self.head.as_ref();
        while let Some(link) = current {
            if let Some(value) = link.frame.borrow().get(name) {
                return Some(value.clone());
            }
            current = link.parent.as_ref();
        }
        None
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0_usize;
        let mut current = self.head.as_ref();
        while let Some(link) = current {
            depth = depth.saturating_add(1);
            current = link.parent.as_ref();
        }
        depth
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Scope")
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Loc;

    fn number(value: f64) -> Node {
        Node::number(value, Loc::default())
    }

    #[test]
    fn inner_definitions_shadow_and_pop() {
        let mut scope = Scope::new(vec![Frame::new()]);
        scope.define("x", number(1.0));
        scope.push();
        scope.define("x", number(2.0));
        assert_eq!(scope.resolve("x"), Some(number(2.0)));
        scope.pop();
        assert_eq!(scope.resolve("x"), Some(number(1.0)));
    }

    #[test]
    fn captured_chain_ignores_later_pushes_but_sees_shared_frames() {
        let mut scope = Scope::new(vec![Frame::new()]);
        let captured = scope.clone();
        scope.push();
        scope.define("local", number(1.0));
        assert!(!captured.is_bound("local"));

        scope.pop();
        scope.define("global", number(3.0));
        assert_eq!(captured.resolve("global"), Some(number(3.0)));
        assert_eq!(captured.depth(), 1);
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let scope = Scope::new(vec![Frame::new(), Frame::new()]);
        assert!(scope.resolve("missing").is_none());
        assert_eq!(scope.depth(), 2);
    }
}
