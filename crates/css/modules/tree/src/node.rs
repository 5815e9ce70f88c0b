//! Syntax tree nodes shared by the parser, the evaluation passes and the printer.

use crate::scope::Scope;
use crate::selector::{MediaQueryList, Selector, SelectorList};
use core::fmt;
use std::rc::Rc;

/// Source location of a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Loc {
    /// File the node was parsed from.
    pub filename: Rc<str>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl Loc {
    pub fn new(filename: &str, line: u32, column: u32) -> Self {
        Self {
            filename: Rc::from(filename),
            line,
            column,
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

/// Quote style of a string literal. Single-quoted strings are never interpolated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl Quote {
    pub const fn as_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    Is,
    Isnt,
}

impl BinaryOp {
    /// True for the operators folded numerically (and retained inside `calc()`).
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Greater | Self::GreaterEqual | Self::Less | Self::LessEqual
        )
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::And => "and",
            Self::Or => "or",
            Self::Is => "is",
            Self::Isnt => "isnt",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Assignment operators: `=`, `?=` and the compound forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AssignIfUnbound,
    Compound(BinaryOp),
}

/// Native functions provided by the builtin frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Len,
    Opp,
    Unit,
    List,
    Push,
    Pop,
    Shift,
    Unshift,
}

impl Builtin {
    pub const ALL: [Self; 8] = [
        Self::Len,
        Self::Opp,
        Self::Unit,
        Self::List,
        Self::Push,
        Self::Pop,
        Self::Shift,
        Self::Unshift,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Opp => "opp",
            Self::Unit => "unit",
            Self::List => "list",
            Self::Push => "push",
            Self::Pop => "pop",
            Self::Shift => "shift",
            Self::Unshift => "unshift",
        }
    }
}

/// Native variables computed at reference time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinVariable {
    Dirname,
}

impl BuiltinVariable {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dirname => "__dirname",
        }
    }
}

/// A function or mixin parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Node>,
    /// Collects the remaining positional arguments into a list.
    pub rest: bool,
}

/// A function/mixin literal. Once evaluated, `closure` holds the scope chain
/// captured at definition time.
#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub params: Vec<Param>,
    pub body: Vec<Node>,
    pub closure: Option<Scope>,
}

impl PartialEq for FunctionDef {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.body == other.body
    }
}

/// Body of a block-carrying rule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleList {
    pub rules: Vec<Node>,
    /// Set when the list had no rules before evaluation. Such blocks survive
    /// normalization even when they produce no properties.
    pub empty: bool,
}

impl RuleList {
    pub const fn new(rules: Vec<Node>) -> Self {
        Self {
            rules,
            empty: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ruleset {
    pub selectors: SelectorList,
    pub body: RuleList,
    /// Assigned by the evaluator; copies made by mixins keep their source id.
    pub id: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Media {
    pub queries: MediaQueryList,
    pub body: RuleList,
    /// Set once the normalizer has promoted this block out of another media block.
    pub nested: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForLoop {
    pub value: String,
    pub index: Option<String>,
    pub step: Option<Node>,
    pub iterable: Node,
    pub body: RuleList,
}

/// Every kind of node the passes understand.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Null,
    Boolean(bool),
    Number(f64),
    Percentage(f64),
    Dimension(f64, String),
    /// Quoted string made of literal `Raw` pieces and interpolated expressions.
    Str {
        quote: Quote,
        parts: Vec<Node>,
    },
    /// Identifier made of literal `Raw` pieces and interpolated expressions.
    Identifier(Vec<Node>),
    Raw(String),
    /// Color as written, including the leading `#`.
    Color(String),
    Url(Box<Node>),
    /// Items and separators alternate.
    List(Vec<Node>),
    Separator(String),
    Range {
        from: Box<Node>,
        to: Box<Node>,
        exclusive: bool,
    },
    Function(Rc<FunctionDef>),
    Builtin(Builtin),
    BuiltinVariable(BuiltinVariable),

    Variable(String),
    Member {
        object: Box<Node>,
        index: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        mixin: bool,
    },

    Stylesheet(Vec<Node>),
    Ruleset(Ruleset),
    Property {
        name: Box<Node>,
        value: Box<Node>,
        important: bool,
    },
    Media(Media),
    Void(RuleList),
    Block(RuleList),
    Extend {
        selectors: SelectorList,
        /// False when the `@extend` sits inside a void.
        recorded: bool,
    },
    /// Mixin-by-selector, expanded by the reevaluator.
    Mixin(SelectorList),
    Import {
        url: Box<Node>,
        media: Option<MediaQueryList>,
    },
    If {
        condition: Box<Node>,
        consequent: RuleList,
        /// Either another `If` or a `Block` for the `else` branch.
        alternate: Option<Box<Node>>,
    },
    For(Box<ForLoop>),
    Assignment {
        op: AssignOp,
        target: Box<Node>,
        value: Box<Node>,
    },
    Return(Box<Node>),
    Module {
        name: Box<Node>,
        separator: Option<Box<Node>>,
        body: RuleList,
    },
    Keyframes {
        prefix: String,
        name: Box<Node>,
        body: RuleList,
    },
    Keyframe {
        selectors: Vec<Node>,
        body: RuleList,
    },
    Page {
        selector: Option<Box<Node>>,
        body: RuleList,
    },
    FontFace(RuleList),
    Charset(Box<Node>),

    TypeSelector(Box<Node>),
    UniversalSelector,
    ClassSelector(Box<Node>),
    HashSelector(Box<Node>),
    AttributeSelector {
        name: Box<Node>,
        operator: Option<String>,
        value: Option<Box<Node>>,
    },
    PseudoSelector {
        double_colon: bool,
        name: Box<Node>,
        argument: Option<Box<Node>>,
    },
    NegationSelector(Box<Selector>),
    /// `&`, optionally followed by a suffix (`&-item`).
    AmpersandSelector(Option<Box<Node>>),
    SelectorInterpolation(Box<Node>),
    Combinator(String),

    MediaType(Box<Node>),
    MediaFeature {
        name: Box<Node>,
        value: Option<Box<Node>>,
    },
    MediaKeyword(String),
    MediaInterpolation(Box<Node>),
}

/// A node with its location. Equality is structural and ignores `loc` and `level`.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Loc,
    /// CSS nesting depth assigned by the normalizer.
    pub level: u32,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Node {
    pub const fn new(kind: NodeKind, loc: Loc) -> Self {
        Self {
            kind,
            loc,
            level: 0,
        }
    }

    pub const fn null(loc: Loc) -> Self {
        Self::new(NodeKind::Null, loc)
    }

    pub const fn boolean(value: bool, loc: Loc) -> Self {
        Self::new(NodeKind::Boolean(value), loc)
    }

    pub const fn number(value: f64, loc: Loc) -> Self {
        Self::new(NodeKind::Number(value), loc)
    }

    pub fn dimension(value: f64, unit: &str, loc: Loc) -> Self {
        Self::new(NodeKind::Dimension(value, unit.to_owned()), loc)
    }

    pub fn raw(text: &str, loc: Loc) -> Self {
        Self::new(NodeKind::Raw(text.to_owned()), loc)
    }

    /// A literal identifier with a single raw part.
    pub fn ident(text: &str, loc: Loc) -> Self {
        let part = Self::raw(text, loc.clone());
        Self::new(NodeKind::Identifier(vec![part]), loc)
    }

    /// A literal double-quoted string.
    pub fn string(text: &str, loc: Loc) -> Self {
        let part = Self::raw(text, loc.clone());
        Self::new(
            NodeKind::Str {
                quote: Quote::Double,
                parts: vec![part],
            },
            loc,
        )
    }

    pub fn variable(name: &str, loc: Loc) -> Self {
        Self::new(NodeKind::Variable(name.to_owned()), loc)
    }

    /// Human-readable kind name used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Null => "null",
            NodeKind::Boolean(_) => "boolean",
            NodeKind::Number(_) => "number",
            NodeKind::Percentage(_) => "percentage",
            NodeKind::Dimension(..) => "dimension",
            NodeKind::Str { .. } => "string",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Raw(_) => "raw",
            NodeKind::Color(_) => "color",
            NodeKind::Url(_) => "url",
            NodeKind::List(_) => "list",
            NodeKind::Separator(_) => "separator",
            NodeKind::Range { .. } => "range",
            NodeKind::Function(_) => "function",
            NodeKind::Builtin(_) => "builtin",
            NodeKind::BuiltinVariable(_) => "builtin variable",
            NodeKind::Variable(_) => "variable",
            NodeKind::Member { .. } => "member expression",
            NodeKind::Binary { .. } => "binary expression",
            NodeKind::Unary { .. } => "unary expression",
            NodeKind::Call { .. } => "call",
            NodeKind::Stylesheet(_) => "stylesheet",
            NodeKind::Ruleset(_) => "ruleset",
            NodeKind::Property { .. } => "property",
            NodeKind::Media(_) => "media",
            NodeKind::Void(_) => "void",
            NodeKind::Block(_) => "block",
            NodeKind::Extend { .. } => "extend",
            NodeKind::Mixin(_) => "mixin",
            NodeKind::Import { .. } => "import",
            NodeKind::If { .. } => "if",
            NodeKind::For(_) => "for",
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::Return(_) => "return",
            NodeKind::Module { .. } => "module",
            NodeKind::Keyframes { .. } => "keyframes",
            NodeKind::Keyframe { .. } => "keyframe",
            NodeKind::Page { .. } => "page",
            NodeKind::FontFace(_) => "font-face",
            NodeKind::Charset(_) => "charset",
            NodeKind::TypeSelector(_) => "type selector",
            NodeKind::UniversalSelector => "universal selector",
            NodeKind::ClassSelector(_) => "class selector",
            NodeKind::HashSelector(_) => "hash selector",
            NodeKind::AttributeSelector { .. } => "attribute selector",
            NodeKind::PseudoSelector { .. } => "pseudo selector",
            NodeKind::NegationSelector(_) => "negation selector",
            NodeKind::AmpersandSelector(_) => "ampersand selector",
            NodeKind::SelectorInterpolation(_) => "selector interpolation",
            NodeKind::Combinator(_) => "combinator",
            NodeKind::MediaType(_) => "media type",
            NodeKind::MediaFeature { .. } => "media feature",
            NodeKind::MediaKeyword(_) => "media keyword",
            NodeKind::MediaInterpolation(_) => "media interpolation",
        }
    }

    /// Text of an identifier made of literal parts only.
    pub fn identifier_text(&self) -> Option<String> {
        let NodeKind::Identifier(parts) = &self.kind else {
            return None;
        };
        let mut out = String::new();
        for part in parts {
            let NodeKind::Raw(text) = &part.kind else {
                return None;
            };
            out.push_str(text);
        }
        Some(out)
    }

    pub const fn is_property(&self) -> bool {
        matches!(self.kind, NodeKind::Property { .. })
    }

    pub const fn is_combinator(&self) -> bool {
        matches!(self.kind, NodeKind::Combinator(_))
    }

    /// Body of the nodes the selector algebra descends through.
    pub const fn rule_body(&self) -> Option<&RuleList> {
        match &self.kind {
            NodeKind::Ruleset(ruleset) => Some(&ruleset.body),
            NodeKind::Media(media) => Some(&media.body),
            NodeKind::Void(body) => Some(body),
            _ => None,
        }
    }

    pub fn rule_body_mut(&mut self) -> Option<&mut RuleList> {
        match &mut self.kind {
            NodeKind::Ruleset(ruleset) => Some(&mut ruleset.body),
            NodeKind::Media(media) => Some(&mut media.body),
            NodeKind::Void(body) => Some(body),
            _ => None,
        }
    }
}
