//! Expressions, interpolation and calls.

use super::{Evaluator, Flow};
use crate::context::{CallKind, Context};
use core::mem;
use css_tree::list::{Span, build, read};
use css_tree::value::{Unit, compare, perform, to_boolean, to_number, to_text};
use css_tree::{
    BinaryOp, Builtin, ErrorKind, EvalError, EvalResult, FunctionDef, Loc, Node, NodeKind, Param,
    Quote, UnaryOp,
};
use css_variables::{builtin_variable, call_builtin};
use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// What a call expression dispatches to.
enum Callee {
    User(Rc<FunctionDef>),
    Native(Builtin),
    /// Plain CSS function, kept in the output with its evaluated arguments.
    Css(Node),
}

impl Evaluator<'_> {
    pub fn expression<'visit>(
        &'visit mut self,
        node: Node,
        cx: &'visit Context,
    ) -> LocalBoxFuture<'visit, EvalResult<Node>> {
        async move {
            let Node { kind, loc, .. } = node;
            match kind {
                NodeKind::Variable(name) => self.variable(&name, loc),
                NodeKind::Str {
                    quote: Quote::Double,
                    parts,
                } => {
                    let text = self.interpolate(parts, true, cx).await?;
                    let part = Node::raw(&text, loc.clone());
                    Ok(Node::new(
                        NodeKind::Str {
                            quote: Quote::Double,
                            parts: vec![part],
                        },
                        loc,
                    ))
                }
                NodeKind::Identifier(parts) => {
                    let text = self.interpolate(parts, false, cx).await?;
                    Ok(Node::ident(&text, loc))
                }
                NodeKind::Url(inner) => {
                    let inner = self.expression(*inner, cx).await?;
                    Ok(Node::new(NodeKind::Url(Box::new(inner)), loc))
                }
                NodeKind::List(nodes) => {
                    let mut evaluated = Vec::with_capacity(nodes.len());
                    for item in nodes {
                        evaluated.push(self.expression(item, cx).await?);
                    }
                    Ok(Node::new(NodeKind::List(evaluated), loc))
                }
                NodeKind::Range { from, to, exclusive } => {
                    let range = self.range(*from, *to, exclusive, loc, cx).await?;
                    Ok(Span::of(&range)?.to_list(&range.loc))
                }
                NodeKind::Function(def) => self.function(def, loc, cx).await,
                NodeKind::Member { object, index } => {
                    let object = self.expression(*object, cx).await?;
                    let index = self.unexpanded(*index, cx).await?;
                    let mut value = read(&object, &index)?;
                    value.loc = loc;
                    Ok(value)
                }
                NodeKind::Binary { op, left, right } => {
                    self.binary(op, *left, *right, loc, cx).await
                }
                NodeKind::Unary { op, operand } => {
                    let operand = self.expression(*operand, cx).await?;
                    unary(op, operand, loc)
                }
                NodeKind::Call { callee, args, .. } => self.call(*callee, args, loc, cx).await,
                other => Ok(Node::new(other, loc)),
            }
        }
        .boxed_local()
    }

    /// Evaluate `node`, keeping a range literal as a range for loops and slices.
    pub async fn unexpanded(&mut self, node: Node, cx: &Context) -> EvalResult<Node> {
        match node.kind {
            NodeKind::Range { from, to, exclusive } => {
                self.range(*from, *to, exclusive, node.loc, cx).await
            }
            kind => self.expression(Node { kind, ..node }, cx).await,
        }
    }

    async fn range(
        &mut self,
        from: Node,
        to: Node,
        exclusive: bool,
        loc: Loc,
        cx: &Context,
    ) -> EvalResult<Node> {
        let from = self.expression(from, cx).await?;
        let to = self.expression(to, cx).await?;
        for bound in [&from, &to] {
            if to_number(bound).is_none() {
                return Err(EvalError::type_error(
                    format!("{} cannot be used in range", bound.type_name()),
                    bound,
                ));
            }
        }
        Ok(Node::new(
            NodeKind::Range {
                from: Box::new(from),
                to: Box::new(to),
                exclusive,
            },
            loc,
        ))
    }

    fn variable(&self, name: &str, loc: Loc) -> EvalResult<Node> {
        let Some(mut value) = self.scope.resolve(name) else {
            return Err(EvalError::undefined(name, &Node::variable(name, loc)));
        };
        if let NodeKind::BuiltinVariable(variable) = value.kind {
            return Ok(builtin_variable(variable, &loc, self.options));
        }
        value.loc = loc;
        Ok(value)
    }

    /// Concatenated text of literal and interpolated parts.
    async fn interpolate(
        &mut self,
        parts: Vec<Node>,
        in_string: bool,
        cx: &Context,
    ) -> EvalResult<String> {
        let mut out = String::new();
        for part in parts {
            if let NodeKind::Raw(text) = &part.kind {
                out.push_str(text);
                continue;
            }
            let value = self.expression(part, cx).await?;
            let Some(text) = to_text(&value) else {
                let owner = if in_string { "string" } else { "identifier" };
                return Err(EvalError::type_error(
                    format!("{} is not allowed to be interpolated in {owner}", value.type_name()),
                    &value,
                ));
            };
            if in_string && matches!(value.kind, NodeKind::Str { .. }) {
                out.push_str(&escape_quotes(&text));
            } else {
                out.push_str(&text);
            }
        }
        Ok(out)
    }

    /// Capture the current chain and evaluate default values once.
    async fn function(&mut self, def: Rc<FunctionDef>, loc: Loc, cx: &Context) -> EvalResult<Node> {
        if def.closure.is_some() {
            return Ok(Node::new(NodeKind::Function(def), loc));
        }
        let mut params = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let default = match &param.default {
                Some(default) => Some(self.expression(default.clone(), cx).await?),
                None => None,
            };
            params.push(Param {
                name: param.name.clone(),
                default,
                rest: param.rest,
            });
        }
        let captured = FunctionDef {
            params,
            body: def.body.clone(),
            closure: Some(self.scope.clone()),
        };
        Ok(Node::new(NodeKind::Function(Rc::new(captured)), loc))
    }

    async fn binary(
        &mut self,
        op: BinaryOp,
        left: Node,
        right: Node,
        loc: Loc,
        cx: &Context,
    ) -> EvalResult<Node> {
        let left = self.expression(left, cx).await?;
        match op {
            BinaryOp::And if !to_boolean(&left) => return Ok(left),
            BinaryOp::Or if to_boolean(&left) => return Ok(left),
            BinaryOp::And | BinaryOp::Or => return self.expression(right, cx).await,
            _ => {}
        }
        let right = self.expression(right, cx).await?;
        if op.is_arithmetic() {
            if cx.retain_arithmetic {
                return Ok(Node::new(
                    NodeKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    loc,
                ));
            }
            let mut value = perform(op, &left, &right)?;
            value.loc = loc;
            return Ok(value);
        }
        if op.is_comparison() {
            return compare(op, &left, &right);
        }
        let equal = left == right;
        Ok(Node::boolean(if op == BinaryOp::Isnt { !equal } else { equal }, loc))
    }

    async fn callee(&mut self, callee: Node, cx: &Context) -> EvalResult<Callee> {
        if let Some(name) = callee.identifier_text() {
            return Ok(match self.scope.resolve(&name).map(|bound| bound.kind) {
                Some(NodeKind::Function(def)) => Callee::User(def),
                Some(NodeKind::Builtin(builtin)) => Callee::Native(builtin),
                _ => Callee::Css(callee),
            });
        }
        let interpolated = matches!(callee.kind, NodeKind::Identifier(_));
        let value = self.expression(callee, cx).await?;
        match &value.kind {
            NodeKind::Function(def) => Ok(Callee::User(Rc::clone(def))),
            NodeKind::Builtin(builtin) => Ok(Callee::Native(*builtin)),
            NodeKind::Identifier(_) if interpolated => Ok(Callee::Css(value)),
            _ => Err(EvalError::type_error(
                format!("{} is not a function", value.type_name()),
                &value,
            )),
        }
    }

    async fn arguments(&mut self, args: Vec<Node>, cx: &Context) -> EvalResult<Vec<Node>> {
        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(self.expression(arg, cx).await?);
        }
        Ok(evaluated)
    }

    async fn call(
        &mut self,
        callee: Node,
        args: Vec<Node>,
        loc: Loc,
        cx: &Context,
    ) -> EvalResult<Node> {
        match self.callee(callee, cx).await? {
            Callee::User(def) => {
                let args = self.arguments(args, &cx.folding()).await?;
                match self.invoke(&def, args, &loc, cx, CallKind::Function).await? {
                    Flow::Return(mut value) => {
                        value.loc = loc;
                        Ok(value)
                    }
                    Flow::Rules(_) => Ok(Node::null(loc)),
                }
            }
            Callee::Native(builtin) => {
                let args = self.arguments(args, &cx.folding()).await?;
                call_builtin(builtin, &args, &loc)
            }
            Callee::Css(name) => {
                let name = self.expression(name, cx).await?;
                let is_calc = name
                    .identifier_text()
                    .is_some_and(|text| text.eq_ignore_ascii_case("calc"));
                let args = if is_calc {
                    self.arguments(args, &cx.retaining()).await?
                } else {
                    self.arguments(args, cx).await?
                };
                Ok(Node::new(
                    NodeKind::Call {
                        callee: Box::new(name),
                        args,
                        mixin: false,
                    },
                    loc,
                ))
            }
        }
    }

    /// `@mixin $name(...)`: the body's rules land at the call site.
    pub async fn mixin_call(
        &mut self,
        callee: Node,
        args: Vec<Node>,
        loc: Loc,
        cx: &Context,
    ) -> EvalResult<Flow> {
        match self.callee(callee, cx).await? {
            Callee::User(def) => {
                let args = self.arguments(args, &cx.folding()).await?;
                self.invoke(&def, args, &loc, cx, CallKind::Mixin).await
            }
            Callee::Native(builtin) => Err(EvalError::new(
                ErrorKind::Type,
                format!("{}() cannot be used as a mixin", builtin.name()),
                &loc,
            )),
            Callee::Css(name) => {
                let text = to_text(&name).unwrap_or_else(|| name.type_name().to_owned());
                Err(EvalError::type_error(format!("{text} is not a mixin"), &name))
            }
        }
    }

    /// Run a function or mixin body in a frame pushed on its captured chain.
    async fn invoke(
        &mut self,
        def: &FunctionDef,
        args: Vec<Node>,
        loc: &Loc,
        cx: &Context,
        kind: CallKind,
    ) -> EvalResult<Flow> {
        let closure = def.closure.clone().unwrap_or_else(|| self.scope.clone());
        let caller = mem::replace(&mut self.scope, closure);
        self.scope.push();

        let comma = Node::new(NodeKind::Separator(",".to_owned()), loc.clone());
        self.scope
            .define("arguments", build(args.clone(), &comma, loc.clone()));
        let mut remaining = args.into_iter();
        for param in &def.params {
            let value = if param.rest {
                build(remaining.by_ref().collect(), &comma, loc.clone())
            } else if let Some(arg) = remaining.next() {
                arg
            } else {
                param
                    .default
                    .clone()
                    .unwrap_or_else(|| Node::null(loc.clone()))
            };
            self.scope.define(&param.name, value);
        }

        let flow = self.rules(def.body.clone(), &cx.calling(kind)).await;
        self.scope = caller;
        flow
    }
}

fn unary(op: UnaryOp, operand: Node, loc: Loc) -> EvalResult<Node> {
    if let (Some(value), Some(unit)) = (to_number(&operand), Unit::of(&operand)) {
        return Ok(match op {
            UnaryOp::Plus => unit.apply(value, loc),
            UnaryOp::Minus => unit.apply(-value, loc),
        });
    }
    if let (UnaryOp::Minus, NodeKind::Identifier(_), Some(text)) =
        (op, &operand.kind, to_text(&operand))
    {
        return Ok(Node::ident(&format!("-{text}"), loc));
    }
    let symbol = match op {
        UnaryOp::Plus => '+',
        UnaryOp::Minus => '-',
    };
    Err(EvalError::type_error(
        format!("unsupported unary operation: {symbol}{}", operand.type_name()),
        &operand,
    ))
}

/// Escape every `"` not already preceded by a backslash.
fn escape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for character in text.chars() {
        if character == '"' && !escaped {
            out.push('\\');
        }
        escaped = character == '\\' && !escaped;
        out.push(character);
    }
    out
}
