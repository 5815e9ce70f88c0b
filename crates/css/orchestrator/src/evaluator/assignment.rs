//! `$name = value` and indexed writes.

use super::{Evaluator, Flow};
use crate::context::Context;
use css_tree::list::{read, splice};
use css_tree::value::perform;
use css_tree::{AssignOp, EvalError, EvalResult, Node, NodeKind};
use futures::FutureExt as _;
use futures::future::LocalBoxFuture;

impl Evaluator<'_> {
    /// The value is evaluated before the target.
    pub async fn assignment(
        &mut self,
        op: AssignOp,
        target: Node,
        value: Node,
        cx: &Context,
    ) -> EvalResult<Flow> {
        let value = self.expression(value, cx).await?;
        self.assign(target, op, value, cx).await?;
        Ok(Flow::Rules(Vec::new()))
    }

    /// Indexed writes rebuild the container and assign it back to its own target.
    fn assign<'visit>(
        &'visit mut self,
        target: Node,
        op: AssignOp,
        value: Node,
        cx: &'visit Context,
    ) -> LocalBoxFuture<'visit, EvalResult<()>> {
        async move {
            let Node { kind, loc, .. } = target;
            match kind {
                NodeKind::Variable(name) => {
                    match op {
                        AssignOp::Assign => self.scope.define(&name, value),
                        AssignOp::AssignIfUnbound => {
                            if !self.scope.is_bound(&name) {
                                self.scope.define(&name, value);
                            }
                        }
                        AssignOp::Compound(operator) => {
                            let Some(current) = self.scope.resolve(&name) else {
                                let unbound = Node::variable(&name, loc);
                                return Err(EvalError::undefined(&name, &unbound));
                            };
                            let result = perform(operator, &current, &value)?;
                            self.scope.define(&name, result);
                        }
                    }
                    Ok(())
                }
                NodeKind::Member { object, index } => {
                    let container = self.expression((*object).clone(), cx).await?;
                    let index = self.unexpanded(*index, cx).await?;
                    let op = match op {
                        AssignOp::AssignIfUnbound => {
                            if read(&container, &index)?.kind != NodeKind::Null {
                                return Ok(());
                            }
                            AssignOp::Assign
                        }
                        other => other,
                    };
                    let updated = splice(&container, &index, op, value)?;
                    self.assign(*object, AssignOp::Assign, updated, cx).await
                }
                other => {
                    let target = Node::new(other, loc);
                    Err(EvalError::structure(
                        format!("cannot assign to {}", target.type_name()),
                        &target.loc,
                    ))
                }
            }
        }
        .boxed_local()
    }
}
