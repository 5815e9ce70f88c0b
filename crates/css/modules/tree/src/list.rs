//! Lists, ranges and natural-order indexing.
//!
//! A list alternates items and separators. Indices and ranges are converted to
//! a half-open natural range `[start, end)` against the list length before
//! reading or splicing; negative positions count from the end.

use crate::error::{EvalError, EvalResult};
use crate::node::{AssignOp, Loc, Node, NodeKind};
use crate::value::{Unit, perform, to_number};

/// Half-open index span over a list, plus the direction it was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NaturalRange {
    pub start: i64,
    pub end: i64,
    /// The range was written high-to-low.
    pub reversed: bool,
}

impl NaturalRange {
    /// Convert a numeric index or a range of indices against `len`.
    pub fn of(index: &Node, len: usize) -> EvalResult<Self> {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let absolute = |position: i64| if position < 0 { position + len } else { position };
        match &index.kind {
            NodeKind::Range { from, to, exclusive } => {
                let from = absolute(integer(from)?);
                let to = absolute(integer(to)?);
                Ok(if from > to {
                    Self {
                        start: if *exclusive { to + 1 } else { to },
                        end: from + 1,
                        reversed: true,
                    }
                } else {
                    Self {
                        start: from,
                        end: if *exclusive { to } else { to + 1 },
                        reversed: false,
                    }
                })
            }
            _ => {
                let position = absolute(integer(index)?);
                Ok(Self {
                    start: position,
                    end: position + 1,
                    reversed: false,
                })
            }
        }
    }
}

fn integer(node: &Node) -> EvalResult<i64> {
    to_number(node).map(|value| value.trunc() as i64).ok_or_else(|| {
        EvalError::type_error(
            format!("index must be a number, got {}", node.type_name()),
            node,
        )
    })
}

/// Items of a list, skipping separators.
pub fn items(nodes: &[Node]) -> Vec<Node> {
    nodes.iter().step_by(2).cloned().collect()
}

/// First separator of a list, or a space.
pub fn separator(nodes: &[Node], loc: &Loc) -> Node {
    nodes
        .get(1)
        .filter(|node| matches!(node.kind, NodeKind::Separator(_)))
        .cloned()
        .unwrap_or_else(|| Node::new(NodeKind::Separator(" ".to_owned()), loc.clone()))
}

/// Build a list node from items joined by `separator`.
pub fn build(items: Vec<Node>, separator: &Node, loc: Loc) -> Node {
    let mut nodes = Vec::with_capacity(items.len().saturating_mul(2));
    for (position, item) in items.into_iter().enumerate() {
        if position > 0 {
            nodes.push(separator.clone());
        }
        nodes.push(item);
    }
    Node::new(NodeKind::List(nodes), loc)
}

/// Items of any value: a list's items, a range's values, nothing for null, or the value itself.
pub fn items_of(node: &Node) -> EvalResult<Vec<Node>> {
    match &node.kind {
        NodeKind::List(nodes) => Ok(items(nodes)),
        NodeKind::Range { .. } => Ok(Span::of(node)?.values(&node.loc)),
        NodeKind::Null => Ok(Vec::new()),
        _ => Ok(vec![node.clone()]),
    }
}

/// Number of items: list items, range values, or 1 for a scalar.
pub fn length(node: &Node) -> EvalResult<usize> {
    match &node.kind {
        NodeKind::List(nodes) => Ok(nodes.len().div_ceil(2)),
        NodeKind::Range { .. } => Ok(Span::of(node)?.len()),
        _ => Ok(1),
    }
}

/// Numeric bounds of an evaluated range. Values step by one from `from` toward `to`.
#[derive(Clone, Debug)]
pub struct Span {
    pub from: f64,
    pub to: f64,
    pub exclusive: bool,
    unit: Unit,
}

impl Span {
    pub fn of(node: &Node) -> EvalResult<Self> {
        let NodeKind::Range {
            from,
            to,
            exclusive,
        } = &node.kind
        else {
            return Err(EvalError::type_error(
                format!("expected a range, got {}", node.type_name()),
                node,
            ));
        };
        let (Some(start), Some(stop), Some(unit)) = (to_number(from), to_number(to), Unit::of(from))
        else {
            return Err(EvalError::type_error(
                "range bounds must be numbers",
                node,
            ));
        };
        Ok(Self {
            from: start,
            to: stop,
            exclusive: *exclusive,
            unit,
        })
    }

    pub fn descending(&self) -> bool {
        self.from > self.to
    }

    pub fn len(&self) -> usize {
        let distance = (self.to - self.from).abs();
        let whole = distance.floor();
        let count = whole as usize + 1;
        if self.exclusive && (distance - whole).abs() < f64::EPSILON {
            count - 1
        } else {
            count
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `position` in written order.
    pub fn value_at(&self, position: usize, loc: &Loc) -> Node {
        let offset = position as f64;
        let value = if self.descending() {
            self.from - offset
        } else {
            self.from + offset
        };
        self.unit.apply(value, loc.clone())
    }

    pub fn values(&self, loc: &Loc) -> Vec<Node> {
        (0..self.len())
            .map(|position| self.value_at(position, loc))
            .collect()
    }

    /// Materialize as a space-separated list.
    pub fn to_list(&self, loc: &Loc) -> Node {
        let separator = Node::new(NodeKind::Separator(" ".to_owned()), loc.clone());
        build(self.values(loc), &separator, loc.clone())
    }
}

/// Read `object[index]`. Scalar reads out of range yield null; range reads yield a slice.
pub fn read(object: &Node, index: &Node) -> EvalResult<Node> {
    let nodes = match &object.kind {
        NodeKind::List(nodes) => nodes.clone(),
        NodeKind::Range { .. } => match Span::of(object)?.to_list(&object.loc).kind {
            NodeKind::List(nodes) => nodes,
            _ => Vec::new(),
        },
        _ => {
            return Err(EvalError::type_error(
                format!("cannot read an index of {}", object.type_name()),
                object,
            ));
        }
    };
    let len = nodes.len().div_ceil(2);
    let natural = NaturalRange::of(index, len)?;
    let start = clamp(natural.start, len);
    let end = clamp(natural.end, len);

    if !matches!(index.kind, NodeKind::Range { .. }) {
        if natural.start < 0 || start >= len {
            return Ok(Node::null(index.loc.clone()));
        }
        return Ok(nodes
            .get(start.saturating_mul(2))
            .cloned()
            .unwrap_or_else(|| Node::null(index.loc.clone())));
    }
    if start >= end {
        return Ok(Node::new(NodeKind::List(Vec::new()), object.loc.clone()));
    }
    let mut slice = nodes
        .get(start.saturating_mul(2)..end.saturating_mul(2).saturating_sub(1))
        .map(<[Node]>::to_vec)
        .unwrap_or_default();
    if natural.reversed {
        slice.reverse();
    }
    Ok(Node::new(NodeKind::List(slice), object.loc.clone()))
}

fn clamp(position: i64, len: usize) -> usize {
    position.clamp(0, i64::try_from(len).unwrap_or(i64::MAX)) as usize
}

/// Write `value` into `list[index]` with natural-order splice semantics.
///
/// Writes left of the list prepend and writes right of it append, padding any
/// gap with nulls. Compound operators only apply when the index targets exactly
/// one existing item; otherwise the list is returned unchanged.
pub fn splice(list: &Node, index: &Node, op: AssignOp, value: Node) -> EvalResult<Node> {
    let nodes = match &list.kind {
        NodeKind::List(nodes) => nodes.clone(),
        NodeKind::Range { .. } => match Span::of(list)?.to_list(&list.loc).kind {
            NodeKind::List(nodes) => nodes,
            _ => Vec::new(),
        },
        _ => {
            return Err(EvalError::type_error(
                format!("cannot assign to an index of {}", list.type_name()),
                list,
            ));
        }
    };
    let separator = separator(&nodes, &list.loc);
    let mut current = items(&nodes);
    let len = current.len();
    let natural = NaturalRange::of(index, len)?;
    let signed_len = i64::try_from(len).unwrap_or(i64::MAX);

    if let AssignOp::Compound(operator) = op {
        let targets_one = natural.start >= 0
            && natural.end <= signed_len
            && natural.end - natural.start == 1;
        if !targets_one {
            return Ok(list.clone());
        }
        let position = clamp(natural.start, len);
        if let Some(slot) = current.get_mut(position) {
            *slot = perform(operator, slot, &value)?;
        }
        return Ok(build(current, &separator, list.loc.clone()));
    }

    let mut inserted = match value.kind {
        NodeKind::List(nodes) => items(&nodes),
        _ => vec![value],
    };
    if natural.reversed {
        inserted.reverse();
    }
    let padding = |count: i64, loc: &Loc| -> Vec<Node> {
        (0..count.max(0)).map(|_| Node::null(loc.clone())).collect()
    };

    if natural.start < 0 && natural.end <= 0 {
        let mut grown = inserted;
        grown.extend(padding(-natural.end, &index.loc));
        grown.extend(current);
        return Ok(build(grown, &separator, list.loc.clone()));
    }
    if natural.start >= signed_len {
        current.extend(padding(natural.start - signed_len, &index.loc));
        current.extend(inserted);
        return Ok(build(current, &separator, list.loc.clone()));
    }
    let start = clamp(natural.start, len);
    let end = clamp(natural.end, len).max(start);
    let tail = current.split_off(end);
    current.truncate(start);
    current.extend(inserted);
    current.extend(tail);
    Ok(build(current, &separator, list.loc.clone()))
}
