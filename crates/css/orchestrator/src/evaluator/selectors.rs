//! Selector and media query evaluation, including interpolation and `@module`.

use super::{Evaluator, Flow};
use crate::context::Context;
use css_syntax::{ParseOptions, Parsed, StartRule};
use css_tree::value::to_text;
use css_tree::{
    ErrorKind, EvalError, EvalResult, Loc, MediaQuery, MediaQueryList, Node, NodeKind, RuleList,
    Selector, SelectorList,
};
use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use log::debug;

impl Evaluator<'_> {
    pub async fn selector_list(
        &mut self,
        list: SelectorList,
        cx: &Context,
    ) -> EvalResult<SelectorList> {
        let mut selectors = Vec::with_capacity(list.selectors.len());
        for selector in list.selectors {
            selectors.push(self.selector(selector, cx).await?);
        }
        Ok(SelectorList::new(selectors, list.loc))
    }

    /// Consecutive combinators left by interpolation collapse into the later one.
    fn selector<'visit>(
        &'visit mut self,
        selector: Selector,
        cx: &'visit Context,
    ) -> LocalBoxFuture<'visit, EvalResult<Selector>> {
        async move {
            let mut parts: Vec<Node> = Vec::with_capacity(selector.parts.len());
            for part in selector.parts {
                for evaluated in self.selector_part(part, cx).await? {
                    if evaluated.is_combinator() && parts.last().is_some_and(Node::is_combinator) {
                        parts.pop();
                    }
                    parts.push(evaluated);
                }
            }
            Ok(Selector::new(parts, selector.loc))
        }
        .boxed_local()
    }

    async fn selector_part(&mut self, part: Node, cx: &Context) -> EvalResult<Vec<Node>> {
        let Node { kind, loc, .. } = part;
        let kind = match kind {
            NodeKind::TypeSelector(name) => {
                NodeKind::TypeSelector(Box::new(self.expression(*name, cx).await?))
            }
            NodeKind::ClassSelector(name) => {
                let name = self.expression(*name, cx).await?;
                let Some(text) = name.identifier_text() else {
                    return Err(EvalError::type_error(
                        format!("{} is not allowed in class selector", name.type_name()),
                        &name,
                    ));
                };
                let prefixed = Node::ident(&format!("{}{text}", cx.module_prefix), name.loc);
                NodeKind::ClassSelector(Box::new(prefixed))
            }
            NodeKind::HashSelector(name) => {
                NodeKind::HashSelector(Box::new(self.expression(*name, cx).await?))
            }
            NodeKind::AttributeSelector { name, operator, value } => {
                let name = self.expression(*name, cx).await?;
                let value = match value {
                    Some(value) => Some(Box::new(self.expression(*value, cx).await?)),
                    None => None,
                };
                NodeKind::AttributeSelector {
                    name: Box::new(name),
                    operator,
                    value,
                }
            }
            NodeKind::PseudoSelector {
                double_colon,
                name,
                argument,
            } => {
                let name = self.expression(*name, cx).await?;
                let argument = match argument {
                    Some(argument) => Some(Box::new(self.expression(*argument, cx).await?)),
                    None => None,
                };
                NodeKind::PseudoSelector {
                    double_colon,
                    name: Box::new(name),
                    argument,
                }
            }
            NodeKind::NegationSelector(inner) => {
                NodeKind::NegationSelector(Box::new(self.selector(*inner, cx).await?))
            }
            NodeKind::AmpersandSelector(Some(suffix)) => {
                NodeKind::AmpersandSelector(Some(Box::new(self.expression(*suffix, cx).await?)))
            }
            NodeKind::SelectorInterpolation(value) => {
                let value = self.expression(*value, cx).await?;
                let Some(text) = to_text(&value) else {
                    debug!("{loc}: {} interpolated as a type selector", value.type_name());
                    return Ok(vec![Node::new(NodeKind::TypeSelector(Box::new(value)), loc)]);
                };
                let parsed = self.parse_fragment(&text, StartRule::Selector, &value.loc)?;
                let Parsed::Selector(selector) = parsed else {
                    return Err(fragment_mismatch("selector", &value.loc));
                };
                return Ok(self.selector(selector, cx).await?.parts);
            }
            other => other,
        };
        Ok(vec![Node::new(kind, loc)])
    }

    pub async fn media_query_list(
        &mut self,
        list: MediaQueryList,
        cx: &Context,
    ) -> EvalResult<MediaQueryList> {
        let mut queries = Vec::with_capacity(list.queries.len());
        for query in list.queries {
            queries.push(self.media_query(query, cx).await?);
        }
        Ok(MediaQueryList::new(queries, list.loc))
    }

    fn media_query<'visit>(
        &'visit mut self,
        query: MediaQuery,
        cx: &'visit Context,
    ) -> LocalBoxFuture<'visit, EvalResult<MediaQuery>> {
        async move {
            let mut parts = Vec::with_capacity(query.parts.len());
            for part in query.parts {
                let Node { kind, loc, .. } = part;
                let kind = match kind {
                    NodeKind::MediaType(name) => {
                        NodeKind::MediaType(Box::new(self.expression(*name, cx).await?))
                    }
                    NodeKind::MediaFeature { name, value } => {
                        let name = self.expression(*name, cx).await?;
                        let value = match value {
                            Some(value) => Some(Box::new(self.expression(*value, cx).await?)),
                            None => None,
                        };
                        NodeKind::MediaFeature {
                            name: Box::new(name),
                            value,
                        }
                    }
                    NodeKind::MediaInterpolation(value) => {
                        let value = self.expression(*value, cx).await?;
                        let Some(text) = to_text(&value) else {
                            debug!("{loc}: {} interpolated as a media type", value.type_name());
                            parts.push(Node::new(NodeKind::MediaType(Box::new(value)), loc));
                            continue;
                        };
                        let parsed = self.parse_fragment(&text, StartRule::MediaQuery, &value.loc)?;
                        let Parsed::MediaQuery(fragment) = parsed else {
                            return Err(fragment_mismatch("media query", &value.loc));
                        };
                        parts.extend(self.media_query(fragment, cx).await?.parts);
                        continue;
                    }
                    other => other,
                };
                parts.push(Node::new(kind, loc));
            }
            Ok(MediaQuery::new(parts, query.loc))
        }
        .boxed_local()
    }

    /// Re-parse interpolated text where the interpolated value sits.
    fn parse_fragment(&self, text: &str, start_rule: StartRule, loc: &Loc) -> EvalResult<Parsed> {
        let options = ParseOptions::new(&loc.filename, start_rule).at(loc.clone());
        self.parser.parse(text.trim(), &options)
    }

    /// `@module name [with separator]`: class selectors in the body gain the prefix.
    pub async fn module(
        &mut self,
        name: Node,
        separator: Option<Node>,
        body: RuleList,
        cx: &Context,
    ) -> EvalResult<Flow> {
        let name = self.module_text(name, "name", cx).await?;
        let separator = match separator {
            Some(separator) => self.module_text(separator, "separator", cx).await?,
            None => "-".to_owned(),
        };
        let prefix = format!("{}{name}{separator}", cx.module_prefix);
        self.scoped(body.rules, &cx.with_module_prefix(prefix)).await
    }

    async fn module_text(&mut self, node: Node, role: &str, cx: &Context) -> EvalResult<String> {
        let value = self.expression(node, cx).await?;
        to_text(&value).ok_or_else(|| {
            EvalError::type_error(
                format!("{} can not be used as a module {role}", value.type_name()),
                &value,
            )
        })
    }
}

fn fragment_mismatch(expected: &str, loc: &Loc) -> EvalError {
    EvalError::new(ErrorKind::Parse, format!("interpolation did not produce a {expected}"), loc)
}
