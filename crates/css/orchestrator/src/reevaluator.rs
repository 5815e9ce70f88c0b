//! Second pass: resolves the references recorded by the evaluator.
//!
//! `@extend` and mixin-by-selector may name rulesets that appear later in the
//! stylesheet, so they are applied once the whole tree exists. Matches are
//! located as [`RulePath`]s first and mutated afterwards.

use css_selectors::{
    RulePath, extend_ruleset, filter_media, filter_rulesets, flatten, node_at, node_at_mut,
};
use css_tree::{ErrorKind, EvalError, EvalResult, Loc, MediaQueryList, Node, NodeKind, SelectorList};
use log::{debug, trace};

/// Apply every `@extend`, drop the extend nodes, then expand mixins.
///
/// # Errors
/// `Structure` for an `@extend` outside any ruleset, `CircularMixin` when a
/// mixin reaches a ruleset that is being expanded.
pub fn reevaluate(rules: &mut Vec<Node>) -> EvalResult<()> {
    apply_extends(rules)?;
    remove_extends(rules);
    Reevaluator::default().expand(rules, &[], None)
}

fn apply_extends(rules: &mut [Node]) -> EvalResult<()> {
    let mut extends = Vec::new();
    collect_extends(rules, &mut Vec::new(), &mut extends);
    for path in extends {
        let Some(Node {
            kind: NodeKind::Extend { selectors, recorded },
            loc,
            ..
        }) = node_at(rules, &path)
        else {
            continue;
        };
        let (targets, recorded, loc) = (selectors.clone(), *recorded, loc.clone());
        let (extending, boundary, media) = surroundings(rules, &path, &loc)?;
        for matched in extended_rulesets(rules, &path, &targets, &boundary, media.as_ref()) {
            if let Some(node) = node_at_mut(rules, &matched) {
                trace!("{loc}: extending ruleset at {matched:?}");
                extend_ruleset(node, &extending, recorded)?;
            }
        }
    }
    Ok(())
}

/// Pre-order paths of every extend node.
fn collect_extends(rules: &[Node], prefix: &mut RulePath, found: &mut Vec<RulePath>) {
    for (index, node) in rules.iter().enumerate() {
        prefix.push(index);
        if matches!(node.kind, NodeKind::Extend { .. }) {
            found.push(prefix.clone());
        } else if let Some(body) = node.rule_body() {
            collect_extends(&body.rules, prefix, found);
        }
        prefix.pop();
    }
}

/// Selectors of the nearest enclosing ruleset, the nearest enclosing void and
/// the media queries in effect inside that void.
fn surroundings(
    rules: &[Node],
    path: &[usize],
    loc: &Loc,
) -> EvalResult<(SelectorList, RulePath, Option<MediaQueryList>)> {
    let mut extending = None;
    let mut boundary = RulePath::new();
    let mut media = None;
    for depth in 1..path.len() {
        let prefix = path.get(..depth).unwrap_or_default();
        match node_at(rules, prefix).map(|node| &node.kind) {
            Some(NodeKind::Void(_)) => {
                boundary = prefix.to_vec();
                media = None;
            }
            Some(NodeKind::Media(block)) => media = Some(block.queries.clone()),
            Some(NodeKind::Ruleset(ruleset)) => extending = Some(ruleset.selectors.clone()),
            _ => {}
        }
    }
    let extending = extending
        .ok_or_else(|| EvalError::structure("@extend is only allowed inside rulesets", loc))?;
    Ok((extending, boundary, media))
}

/// Rulesets matched by `targets` inside the boundary, excluding ancestors of the extend.
fn extended_rulesets(
    rules: &[Node],
    extend: &[usize],
    targets: &SelectorList,
    boundary: &[usize],
    media: Option<&MediaQueryList>,
) -> Vec<RulePath> {
    let region = rules_at(rules, boundary);
    let scopes = media.map_or_else(
        || vec![RulePath::new()],
        |queries| filter_media(region, queries),
    );
    let mut matched: Vec<RulePath> = Vec::new();
    for scope in scopes {
        let searched = rules_at(region, &scope);
        for target in &targets.selectors {
            for found in filter_rulesets(searched, target) {
                let absolute = [boundary, scope.as_slice(), found.as_slice()].concat();
                if extend.starts_with(&absolute) || matched.contains(&absolute) {
                    continue;
                }
                matched.push(absolute);
            }
        }
    }
    matched
}

fn remove_extends(rules: &mut Vec<Node>) {
    rules.retain(|node| !matches!(node.kind, NodeKind::Extend { .. }));
    for node in rules {
        if let Some(body) = node.rule_body_mut() {
            remove_extends(&mut body.rules);
        }
    }
}

/// Rules of the list at `path`; the root list for an empty path.
fn rules_at<'tree>(rules: &'tree [Node], path: &[usize]) -> &'tree [Node] {
    if path.is_empty() {
        return rules;
    }
    node_at(rules, path)
        .and_then(Node::rule_body)
        .map(|body| body.rules.as_slice())
        .unwrap_or_default()
}

fn rules_at_mut<'tree>(
    rules: &'tree mut Vec<Node>,
    path: &[usize],
) -> Option<&'tree mut Vec<Node>> {
    if path.is_empty() {
        return Some(rules);
    }
    node_at_mut(rules, path)
        .and_then(Node::rule_body_mut)
        .map(|body| &mut body.rules)
}

/// Mixin expansion state: ids of the rulesets on the current expansion path.
#[derive(Default)]
struct Reevaluator {
    visiting: Vec<u32>,
}

impl Reevaluator {
    /// Expand the mixins of the list at `container`, whose rulesets join against `ancestor`.
    fn expand(
        &mut self,
        root: &mut Vec<Node>,
        container: &[usize],
        ancestor: Option<&SelectorList>,
    ) -> EvalResult<()> {
        let mut index = 0_usize;
        loop {
            let Some(node) = rules_at(root, container).get(index) else {
                return Ok(());
            };
            let child = [container, [index].as_slice()].concat();
            match &node.kind {
                NodeKind::Mixin(selectors) => {
                    let (selectors, loc) = (selectors.clone(), node.loc.clone());
                    let expanded = self.mixin(root, &selectors, ancestor, &loc)?;
                    let inserted = expanded.len();
                    if let Some(list) = rules_at_mut(root, container) {
                        let tail = list.split_off(index.saturating_add(1));
                        list.truncate(index);
                        list.extend(expanded);
                        list.extend(tail);
                    }
                    index = index.saturating_add(inserted);
                }
                NodeKind::Ruleset(ruleset) => {
                    let (id, selectors) = (ruleset.id, ruleset.selectors.clone());
                    self.visiting.push(id);
                    self.expand(root, &child, Some(&selectors))?;
                    self.visiting.pop();
                    index = index.saturating_add(1);
                }
                NodeKind::Media(_) | NodeKind::Void(_) => {
                    self.expand(root, &child, ancestor)?;
                    index = index.saturating_add(1);
                }
                _ => index = index.saturating_add(1),
            }
        }
    }

    /// Copies of the bodies of every ruleset matching `selectors`, rejoined against `ancestor`.
    fn mixin(
        &mut self,
        root: &mut Vec<Node>,
        selectors: &SelectorList,
        ancestor: Option<&SelectorList>,
        loc: &Loc,
    ) -> EvalResult<Vec<Node>> {
        let mut targets: Vec<RulePath> = selectors
            .selectors
            .iter()
            .flat_map(|selector| filter_rulesets(root, selector))
            .collect();
        targets.sort();
        targets.dedup();
        debug!("{loc}: mixin matched {} rulesets", targets.len());

        let mut rules = Vec::new();
        for target in targets {
            let Some(NodeKind::Ruleset(ruleset)) = node_at(root, &target).map(|node| &node.kind)
            else {
                continue;
            };
            if self.visiting.contains(&ruleset.id) {
                return Err(EvalError::new(
                    ErrorKind::CircularMixin,
                    "circular mixins are not allowed",
                    loc,
                ));
            }
            let (id, target_selectors) = (ruleset.id, ruleset.selectors.clone());
            self.visiting.push(id);
            self.expand(root, &target, Some(&target_selectors))?;
            self.visiting.pop();
            rules.extend_from_slice(rules_at(root, &target));
        }
        flatten(&mut rules, ancestor)?;
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use css_tree::{RuleList, Ruleset, Selector};

    fn class(name: &str) -> Selector {
        let part = Node::new(
            NodeKind::ClassSelector(Box::new(Node::ident(name, Loc::default()))),
            Loc::default(),
        );
        Selector::new(vec![part], Loc::default())
    }

    fn list(name: &str) -> SelectorList {
        SelectorList::new(vec![class(name)], Loc::default())
    }

    fn ruleset(name: &str, id: u32, rules: Vec<Node>) -> Node {
        Node::new(
            NodeKind::Ruleset(Ruleset {
                selectors: list(name),
                body: RuleList::new(rules),
                id,
            }),
            Loc::default(),
        )
    }

    fn extend(name: &str) -> Node {
        Node::new(
            NodeKind::Extend {
                selectors: list(name),
                recorded: true,
            },
            Loc::default(),
        )
    }

    #[test]
    fn forward_extend_reaches_later_rulesets() -> Result<(), EvalError> {
        let mut rules = vec![ruleset("a", 0, vec![extend("b")]), ruleset("b", 1, Vec::new())];
        reevaluate(&mut rules)?;

        let Some(NodeKind::Ruleset(extended)) = rules.get(1).map(|node| &node.kind) else {
            return Err(EvalError::structure("missing ruleset", &Loc::default()));
        };
        assert!(extended.selectors.contains(&class("a")));
        let Some(NodeKind::Ruleset(extending)) = rules.first().map(|node| &node.kind) else {
            return Err(EvalError::structure("missing ruleset", &Loc::default()));
        };
        assert!(extending.body.rules.is_empty());
        Ok(())
    }

    #[test]
    fn extend_skips_its_own_ancestors() -> Result<(), EvalError> {
        let mut rules = vec![ruleset("a", 0, vec![extend("a")])];
        reevaluate(&mut rules)?;
        let Some(NodeKind::Ruleset(only)) = rules.first().map(|node| &node.kind) else {
            return Err(EvalError::structure("missing ruleset", &Loc::default()));
        };
        assert_eq!(only.selectors.selectors.len(), 1);
        Ok(())
    }

    #[test]
    fn mixins_referencing_each_other_are_circular() {
        let mixin = |name: &str| Node::new(NodeKind::Mixin(list(name)), Loc::default());
        let mut rules = vec![ruleset("a", 0, vec![mixin("b")]), ruleset("b", 1, vec![mixin("a")])];
        let result = reevaluate(&mut rules);
        assert!(result.is_err_and(|error| error.kind == ErrorKind::CircularMixin));
    }
}
