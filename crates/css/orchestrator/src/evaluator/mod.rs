//! First pass: reduces the tree to CSS-shaped rules.
//!
//! Every statement evaluates to a [`Flow`]: the rules it expands into, or the
//! value of an `@return` unwinding toward the function call that owns it.
//! Siblings are awaited one after another, so source order is kept even though
//! imports suspend. `@extend` and mixins-by-selector are only recorded here;
//! they may reference rules that do not exist yet.

mod assignment;
mod control;
mod expression;
mod imports;
mod selectors;

use crate::context::{CallKind, Context};
use crate::loader::Loader;
use css_selectors::{join_media, join_selectors};
use css_syntax::SourceParser;
use css_tree::paths::normalize;
use css_tree::{
    EvalError, EvalResult, Loc, Media, Node, NodeKind, Options, RuleList, Ruleset, Scope,
};
use css_variables::default_scope;
use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use log::trace;
use std::collections::HashSet;
use std::path::PathBuf;

/// Result of evaluating a statement or a rule list.
#[derive(Debug)]
pub enum Flow {
    Rules(Vec<Node>),
    Return(Node),
}

impl Flow {
    fn single(node: Node) -> Self {
        Self::Rules(vec![node])
    }
}

pub struct Evaluator<'eval> {
    options: &'eval mut Options,
    parser: &'eval dyn SourceParser,
    loader: &'eval dyn Loader,
    scope: Scope,
    /// Absolute paths already spliced into the output.
    imported: HashSet<PathBuf>,
    next_ruleset_id: u32,
}

impl<'eval> Evaluator<'eval> {
    pub fn new(
        options: &'eval mut Options,
        parser: &'eval dyn SourceParser,
        loader: &'eval dyn Loader,
    ) -> Self {
        let scope = options.scope.clone().unwrap_or_else(default_scope);
        Self {
            options,
            parser,
            loader,
            scope,
            imported: HashSet::new(),
            next_ruleset_id: 0,
        }
    }

    /// Evaluate the rules of the root stylesheet.
    ///
    /// # Errors
    /// Any evaluation failure aborts the whole stylesheet.
    pub async fn evaluate(mut self, rules: Vec<Node>) -> EvalResult<Vec<Node>> {
        self.imported.insert(normalize(&self.options.filename));
        match self.rules(rules, &Context::default()).await? {
            Flow::Rules(rules) => Ok(rules),
            Flow::Return(value) => Err(misplaced_return(&value.loc)),
        }
    }

    /// Evaluate `rules` in order in the current frame, splicing what each expands to.
    fn rules<'visit>(
        &'visit mut self,
        rules: Vec<Node>,
        cx: &'visit Context,
    ) -> LocalBoxFuture<'visit, EvalResult<Flow>> {
        async move {
            let mut out = Vec::with_capacity(rules.len());
            for rule in rules {
                match self.statement(rule, cx).await? {
                    Flow::Rules(produced) => out.extend(produced),
                    returned @ Flow::Return(_) => return Ok(returned),
                }
            }
            Ok(Flow::Rules(out))
        }
        .boxed_local()
    }

    /// Same as [`Self::rules`] inside a fresh frame.
    async fn scoped(&mut self, rules: Vec<Node>, cx: &Context) -> EvalResult<Flow> {
        self.scope.push();
        let flow = self.rules(rules, cx).await;
        self.scope.pop();
        flow
    }

    /// Evaluate a block body in a fresh frame. `Err` carries a pending `@return`.
    async fn body(&mut self, body: RuleList, cx: &Context) -> EvalResult<Result<RuleList, Flow>> {
        let empty = body.rules.is_empty();
        Ok(match self.scoped(body.rules, cx).await? {
            Flow::Rules(rules) => Ok(RuleList { rules, empty }),
            returned @ Flow::Return(_) => Err(returned),
        })
    }

    fn statement<'visit>(
        &'visit mut self,
        node: Node,
        cx: &'visit Context,
    ) -> LocalBoxFuture<'visit, EvalResult<Flow>> {
        async move {
            let Node { kind, loc, .. } = node;
            match kind {
                NodeKind::Ruleset(ruleset) => self.ruleset(ruleset, loc, cx).await,
                NodeKind::Property {
                    name,
                    value,
                    important,
                } => {
                    let name = self.expression(*name, cx).await?;
                    let value = self.expression(*value, cx).await?;
                    Ok(Flow::single(Node::new(
                        NodeKind::Property {
                            name: Box::new(name),
                            value: Box::new(value),
                            important,
                        },
                        loc,
                    )))
                }
                NodeKind::Media(media) => self.media(media, loc, cx).await,
                NodeKind::Void(body) => {
                    let inner = cx.voided();
                    Ok(match self.body(body, &inner).await? {
                        Ok(body) => Flow::single(Node::new(NodeKind::Void(body), loc)),
                        Err(returned) => returned,
                    })
                }
                NodeKind::Block(body) => self.scoped(body.rules, cx).await,
                NodeKind::Extend { selectors, .. } => {
                    if cx.selectors.is_none() {
                        return Err(EvalError::structure(
                            "@extend is only allowed inside rulesets",
                            &loc,
                        ));
                    }
                    let selectors = self.selector_list(selectors, cx).await?;
                    Ok(Flow::single(Node::new(
                        NodeKind::Extend {
                            selectors,
                            recorded: !cx.in_void,
                        },
                        loc,
                    )))
                }
                NodeKind::Mixin(selectors) => {
                    let selectors = self.selector_list(selectors, cx).await?;
                    Ok(Flow::single(Node::new(NodeKind::Mixin(selectors), loc)))
                }
                NodeKind::Import { url, media } => self.import(*url, media, loc, cx).await,
                NodeKind::If {
                    condition,
                    consequent,
                    alternate,
                } => self.conditional(*condition, consequent, alternate, cx).await,
                NodeKind::For(for_loop) => self.for_loop(*for_loop, &loc, cx).await,
                NodeKind::Assignment { op, target, value } => {
                    self.assignment(op, *target, *value, cx).await
                }
                NodeKind::Return(value) => {
                    if cx.call != CallKind::Function {
                        return Err(misplaced_return(&loc));
                    }
                    Ok(Flow::Return(self.expression(*value, cx).await?))
                }
                NodeKind::Module { name, separator, body } => {
                    self.module(*name, separator.map(|separator| *separator), body, cx).await
                }
                NodeKind::Call {
                    callee,
                    args,
                    mixin: true,
                } => self.mixin_call(*callee, args, loc, cx).await,
                NodeKind::Keyframes { prefix, name, body } => {
                    let name = self.expression(*name, cx).await?;
                    Ok(match self.body(body, cx).await? {
                        Ok(body) => Flow::single(Node::new(
                            NodeKind::Keyframes {
                                prefix,
                                name: Box::new(name),
                                body,
                            },
                            loc,
                        )),
                        Err(returned) => returned,
                    })
                }
                NodeKind::Keyframe { selectors, body } => {
                    let mut evaluated = Vec::with_capacity(selectors.len());
                    for selector in selectors {
                        evaluated.push(self.expression(selector, cx).await?);
                    }
                    Ok(match self.body(body, cx).await? {
                        Ok(body) => Flow::single(Node::new(
                            NodeKind::Keyframe {
                                selectors: evaluated,
                                body,
                            },
                            loc,
                        )),
                        Err(returned) => returned,
                    })
                }
                NodeKind::Page { selector, body } => {
                    let selector = match selector {
                        Some(selector) => Some(Box::new(self.expression(*selector, cx).await?)),
                        None => None,
                    };
                    Ok(match self.body(body, cx).await? {
                        Ok(body) => Flow::single(Node::new(NodeKind::Page { selector, body }, loc)),
                        Err(returned) => returned,
                    })
                }
                NodeKind::FontFace(body) => Ok(match self.body(body, cx).await? {
                    Ok(body) => Flow::single(Node::new(NodeKind::FontFace(body), loc)),
                    Err(returned) => returned,
                }),
                NodeKind::Charset(value) => {
                    let value = self.expression(*value, cx).await?;
                    Ok(Flow::single(Node::new(NodeKind::Charset(Box::new(value)), loc)))
                }
                other => {
                    let value = self.expression(Node::new(other, loc), cx).await?;
                    Ok(Flow::single(value))
                }
            }
        }
        .boxed_local()
    }

    /// Join the selectors against the ancestor, then evaluate the body under them.
    async fn ruleset(&mut self, ruleset: Ruleset, loc: Loc, cx: &Context) -> EvalResult<Flow> {
        let selectors = self.selector_list(ruleset.selectors, cx).await?;
        let mut selectors = join_selectors(cx.selectors.as_deref(), selectors)?;
        selectors.module = cx.module_root;
        let id = self.next_ruleset_id;
        self.next_ruleset_id = self.next_ruleset_id.saturating_add(1);
        trace!("{loc}: ruleset #{id}");

        let inner = cx.with_selectors(selectors.clone());
        Ok(match self.body(ruleset.body, &inner).await? {
            Ok(body) => Flow::single(Node::new(
                NodeKind::Ruleset(Ruleset {
                    selectors,
                    body,
                    id,
                }),
                loc,
            )),
            Err(returned) => returned,
        })
    }

    async fn media(&mut self, media: Media, loc: Loc, cx: &Context) -> EvalResult<Flow> {
        let queries = self.media_query_list(media.queries, cx).await?;
        let queries = join_media(cx.media.as_deref(), queries);
        let inner = cx.with_media(queries.clone());
        Ok(match self.body(media.body, &inner).await? {
            Ok(body) => Flow::single(Node::new(
                NodeKind::Media(Media {
                    queries,
                    body,
                    nested: false,
                }),
                loc,
            )),
            Err(returned) => returned,
        })
    }
}

fn misplaced_return(loc: &Loc) -> EvalError {
    EvalError::structure("@return is only allowed inside @function", loc)
}
