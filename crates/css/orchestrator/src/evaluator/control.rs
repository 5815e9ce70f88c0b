//! `@if` and `@for`.

use super::{Evaluator, Flow};
use crate::context::Context;
use core::{iter, mem};
use css_tree::list::{Span, items_of};
use css_tree::value::{to_boolean, to_number};
use css_tree::{EvalError, EvalResult, ForLoop, Loc, Node, NodeKind, RuleList};
use log::trace;

/// Values visited by a loop. Ranges are read position by position.
enum Sequence {
    Span(Span),
    Items(Vec<Node>),
}

impl Sequence {
    fn len(&self) -> usize {
        match self {
            Self::Span(span) => span.len(),
            Self::Items(items) => items.len(),
        }
    }

    fn get(&self, position: usize, loc: &Loc) -> Node {
        match self {
            Self::Span(span) => span.value_at(position, loc),
            Self::Items(items) => items
                .get(position)
                .cloned()
                .unwrap_or_else(|| Node::null(loc.clone())),
        }
    }
}

impl Evaluator<'_> {
    /// Branches share the enclosing frame.
    pub async fn conditional(
        &mut self,
        condition: Node,
        consequent: RuleList,
        alternate: Option<Box<Node>>,
        cx: &Context,
    ) -> EvalResult<Flow> {
        let condition = self.expression(condition, cx).await?;
        if to_boolean(&condition) {
            return self.rules(consequent.rules, cx).await;
        }
        let Some(alternate) = alternate else {
            return Ok(Flow::Rules(Vec::new()));
        };
        let Node { kind, loc, .. } = *alternate;
        match kind {
            NodeKind::Block(body) => self.rules(body.rules, cx).await,
            other => self.statement(Node::new(other, loc), cx).await,
        }
    }

    /// `@for $value[, $index] in <iterable> [by <step>]`.
    pub async fn for_loop(
        &mut self,
        for_loop: ForLoop,
        loc: &Loc,
        cx: &Context,
    ) -> EvalResult<Flow> {
        let ForLoop {
            value,
            index,
            step,
            iterable,
            body,
        } = for_loop;
        let step = match step {
            Some(step) => Some(self.step(step, cx).await?),
            None => None,
        };
        let iterable = self.unexpanded(iterable, cx).await?;
        let sequence = match &iterable.kind {
            NodeKind::Range { .. } => Sequence::Span(Span::of(&iterable)?),
            _ => Sequence::Items(items_of(&iterable)?),
        };

        let len = sequence.len();
        if len == 0 {
            for name in iter::once(&value).chain(index.as_ref()) {
                if !self.scope.is_bound(name) {
                    self.scope.define(name, Node::null(loc.clone()));
                }
            }
            return Ok(Flow::Rules(Vec::new()));
        }

        let forward = match (&sequence, step) {
            (Sequence::Span(span), Some(step)) => (step > 0) != span.descending(),
            (_, step) => step.unwrap_or(1) > 0,
        };
        let stride = step.map_or(1, i64::unsigned_abs) as usize;
        let positions: Vec<usize> = if forward {
            (0..len).step_by(stride).collect()
        } else {
            (0..len).rev().step_by(stride).collect()
        };
        trace!("{loc}: loop over {} of {len} positions", positions.len());

        let mut remaining = body.rules;
        let count = positions.len();
        let mut out = Vec::new();
        for (visit, position) in positions.into_iter().enumerate() {
            self.scope.define(&value, sequence.get(position, &iterable.loc));
            if let Some(index) = &index {
                self.scope
                    .define(index, Node::number(position as f64, loc.clone()));
            }
            let rules = if visit.saturating_add(1) == count {
                mem::take(&mut remaining)
            } else {
                remaining.clone()
            };
            match self.rules(rules, cx).await? {
                Flow::Rules(produced) => out.extend(produced),
                returned @ Flow::Return(_) => return Ok(returned),
            }
        }
        Ok(Flow::Rules(out))
    }

    /// A non-zero whole step.
    async fn step(&mut self, step: Node, cx: &Context) -> EvalResult<i64> {
        let step = self.expression(step, cx).await?;
        let Some(number) = to_number(&step) else {
            return Err(EvalError::type_error("step must be a numeric value", &step));
        };
        let whole = number.trunc() as i64;
        if whole == 0 {
            return Err(EvalError::structure("step is not allowed to be zero", &step.loc));
        }
        Ok(whole)
    }
}
