//! Syntax tree, values and scoping shared by the stylesheet evaluation passes.

pub mod error;
pub mod list;
pub mod node;
pub mod options;
pub mod paths;
pub mod scope;
pub mod selector;
pub mod value;

pub use error::{ErrorKind, EvalError, EvalResult};
pub use node::{
    AssignOp, BinaryOp, Builtin, BuiltinVariable, ForLoop, FunctionDef, Loc, Media, Node,
    NodeKind, Param, Quote, RuleList, Ruleset, UnaryOp,
};
pub use options::Options;
pub use scope::{Frame, Scope};
pub use selector::{MediaQuery, MediaQueryList, Selector, SelectorList};
