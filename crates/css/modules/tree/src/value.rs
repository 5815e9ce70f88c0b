//! Coercions and operators over evaluated value nodes.

use crate::error::{EvalError, EvalResult};
use crate::node::{BinaryOp, Loc, Node, NodeKind, Quote};
use core::cmp::Ordering;

/// Numeric flavour of a number-like node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unit {
    None,
    Percent,
    Named(String),
}

impl Unit {
    pub fn of(node: &Node) -> Option<Self> {
        match &node.kind {
            NodeKind::Number(_) => Some(Self::None),
            NodeKind::Percentage(_) => Some(Self::Percent),
            NodeKind::Dimension(_, unit) => Some(Self::Named(unit.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "",
            Self::Percent => "%",
            Self::Named(unit) => unit,
        }
    }

    /// Parse a unit written as text: empty for unitless, `%` for percentages.
    pub fn parse(text: &str) -> Self {
        match text {
            "" => Self::None,
            "%" => Self::Percent,
            other => Self::Named(other.to_owned()),
        }
    }

    /// A number-like node carrying `value` in this unit.
    pub fn apply(&self, value: f64, loc: Loc) -> Node {
        match self {
            Self::None => Node::number(value, loc),
            Self::Percent => Node::new(NodeKind::Percentage(value), loc),
            Self::Named(unit) => Node::dimension(value, unit, loc),
        }
    }
}

pub const fn to_number(node: &Node) -> Option<f64> {
    match &node.kind {
        NodeKind::Number(value) | NodeKind::Percentage(value) | NodeKind::Dimension(value, _) => {
            Some(*value)
        }
        _ => None,
    }
}

/// `false`, `null`, numeric zero and the empty string are falsy.
pub fn to_boolean(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Null | NodeKind::Boolean(false) => false,
        NodeKind::Number(value) | NodeKind::Percentage(value) | NodeKind::Dimension(value, _) => {
            *value != 0.0
        }
        NodeKind::Str { .. } => literal_text(node).is_none_or(|text| !text.is_empty()),
        _ => true,
    }
}

/// Concatenated raw parts of a string or identifier. `None` while interpolations remain.
pub fn literal_text(node: &Node) -> Option<String> {
    let parts = match &node.kind {
        NodeKind::Str { parts, .. } | NodeKind::Identifier(parts) => parts,
        NodeKind::Raw(text) => return Some(text.clone()),
        _ => return None,
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

/// Text used when a value is interpolated or concatenated.
pub fn to_text(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::Number(value) => Some(value.to_string()),
        NodeKind::Percentage(value) => Some(format!("{value}%")),
        NodeKind::Dimension(value, unit) => Some(format!("{value}{unit}")),
        NodeKind::Boolean(value) => Some(value.to_string()),
        NodeKind::Str { .. } | NodeKind::Identifier(_) | NodeKind::Raw(_) => literal_text(node),
        NodeKind::Color(color) => Some(color.clone()),
        NodeKind::Separator(separator) => Some(separator_text(separator).to_owned()),
        NodeKind::List(nodes) => {
            let mut out = String::new();
            for item in nodes {
                out.push_str(&to_text(item)?);
            }
            Some(out)
        }
        _ => None,
    }
}

fn separator_text(separator: &str) -> &str {
    if separator.starts_with(',') {
        ", "
    } else {
        separator
    }
}

fn not_coercible(op: BinaryOp, left: &Node, right: &Node) -> EvalError {
    EvalError::type_error(
        format!(
            "unsupported binary operation: {} {} {}",
            left.type_name(),
            op.symbol(),
            right.type_name()
        ),
        left,
    )
}

/// Apply an arithmetic operator to two evaluated operands.
pub fn perform(op: BinaryOp, left: &Node, right: &Node) -> EvalResult<Node> {
    let loc = left.loc.clone();
    if let (Some(lhs), Some(rhs)) = (to_number(left), to_number(right)) {
        let unit = match (Unit::of(left), Unit::of(right)) {
            (Some(Unit::None), Some(unit)) | (Some(unit), _) => unit,
            (None, _) => return Err(not_coercible(op, left, right)),
        };
        if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && rhs == 0.0 {
            return Err(EvalError::type_error("divide by zero", right));
        }
        let value = match op {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Subtract => lhs - rhs,
            BinaryOp::Multiply => lhs * rhs,
            BinaryOp::Divide => lhs / rhs,
            BinaryOp::Modulo => lhs % rhs,
            _ => return Err(not_coercible(op, left, right)),
        };
        return Ok(unit.apply(value, loc));
    }
    if op != BinaryOp::Add {
        return Err(not_coercible(op, left, right));
    }
    match (&left.kind, &right.kind) {
        (NodeKind::Str { quote, .. }, _) | (_, NodeKind::Str { quote, .. }) => {
            let quote = *quote;
            let (Some(lhs), Some(rhs)) = (to_text(left), to_text(right)) else {
                return Err(not_coercible(op, left, right));
            };
            Ok(quoted(&format!("{lhs}{rhs}"), quote, loc))
        }
        (NodeKind::Identifier(_), NodeKind::Identifier(_) | NodeKind::Number(_))
        | (NodeKind::Number(_), NodeKind::Identifier(_)) => {
            let (Some(lhs), Some(rhs)) = (to_text(left), to_text(right)) else {
                return Err(not_coercible(op, left, right));
            };
            Ok(Node::ident(&format!("{lhs}{rhs}"), loc))
        }
        _ => Err(not_coercible(op, left, right)),
    }
}

pub fn quoted(text: &str, quote: Quote, loc: Loc) -> Node {
    let part = Node::raw(text, loc.clone());
    Node::new(
        NodeKind::Str {
            quote,
            parts: vec![part],
        },
        loc,
    )
}

/// Apply `>`, `>=`, `<` or `<=`. Numbers compare numerically, text lexically.
pub fn compare(op: BinaryOp, left: &Node, right: &Node) -> EvalResult<Node> {
    let ordering = if let (Some(lhs), Some(rhs)) = (to_number(left), to_number(right)) {
        lhs.partial_cmp(&rhs)
    } else {
        match (&left.kind, &right.kind) {
            (
                NodeKind::Str { .. } | NodeKind::Identifier(_),
                NodeKind::Str { .. } | NodeKind::Identifier(_),
            ) => literal_text(left)
                .zip(literal_text(right))
                .map(|(lhs, rhs)| lhs.cmp(&rhs)),
            _ => None,
        }
    };
    let Some(ordering) = ordering else {
        return Err(not_coercible(op, left, right));
    };
    let result = match op {
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterEqual => ordering != Ordering::Less,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        _ => return Err(not_coercible(op, left, right)),
    };
    Ok(Node::boolean(result, left.loc.clone()))
}

/// Swap `left`/`right` and `top`/`bottom`, element-wise on lists.
pub fn opposite(node: &Node) -> Node {
    let swap = |text: &str| -> Option<&'static str> {
        match text {
            "left" => Some("right"),
            "right" => Some("left"),
            "top" => Some("bottom"),
            "bottom" => Some("top"),
            "center" => Some("center"),
            _ => None,
        }
    };
    match &node.kind {
        NodeKind::List(nodes) => Node::new(
            NodeKind::List(nodes.iter().map(opposite).collect()),
            node.loc.clone(),
        ),
        NodeKind::Identifier(_) => literal_text(node)
            .as_deref()
            .and_then(swap)
            .map_or_else(|| node.clone(), |text| Node::ident(text, node.loc.clone())),
        NodeKind::Str { quote, .. } => literal_text(node)
            .as_deref()
            .and_then(swap)
            .map_or_else(|| node.clone(), |text| quoted(text, *quote, node.loc.clone())),
        _ => node.clone(),
    }
}
