//! Final pass: reshapes the tree into flat CSS.
//!
//! Nested rules are promoted next to their parent with an increased `level`,
//! properties directly inside `@media` get a ruleset for the enclosing
//! selectors, voids disappear together with the rulesets nobody extended, and
//! blocks left without content are dropped.

use core::mem;
use css_tree::list::Span;
use css_tree::{EvalError, EvalResult, Loc, Media, Node, NodeKind, RuleList, Ruleset, SelectorList};
use log::debug;

/// What the rules being normalized are nested in.
#[derive(Clone, Copy, Default)]
struct Ancestry<'tree> {
    in_void: bool,
    selectors: Option<&'tree SelectorList>,
}

/// Normalize the rules of an evaluated and reevaluated stylesheet.
///
/// # Errors
/// `Structure` when a top-level `@media` holds properties directly.
pub fn normalize(rules: Vec<Node>) -> EvalResult<Vec<Node>> {
    rules_in(rules, Ancestry::default())
}

fn rules_in(rules: Vec<Node>, ancestry: Ancestry<'_>) -> EvalResult<Vec<Node>> {
    let mut out = Vec::with_capacity(rules.len());
    for rule in rules {
        out.extend(node(rule, ancestry)?);
    }
    Ok(out)
}

fn node(node: Node, ancestry: Ancestry<'_>) -> EvalResult<Vec<Node>> {
    let Node { kind, loc, level } = node;
    let kind = match kind {
        NodeKind::Ruleset(ruleset) => return ruleset_rules(ruleset, loc, level, ancestry),
        NodeKind::Media(media) => return media_rules(media, loc, level, ancestry),
        NodeKind::Void(body) => {
            return rules_in(
                body.rules,
                Ancestry {
                    in_void: true,
                    ..ancestry
                },
            );
        }
        NodeKind::Property {
            name,
            value,
            important,
        } => NodeKind::Property {
            name,
            value: Box::new(property_value(*value)),
            important,
        },
        NodeKind::Keyframes { prefix, name, body } => {
            let Some(body) = block_body(body, ancestry, &loc)? else {
                return Ok(Vec::new());
            };
            NodeKind::Keyframes { prefix, name, body }
        }
        NodeKind::Keyframe { selectors, body } => {
            let Some(body) = block_body(body, ancestry, &loc)? else {
                return Ok(Vec::new());
            };
            NodeKind::Keyframe { selectors, body }
        }
        NodeKind::Page { selector, body } => {
            let Some(body) = block_body(body, ancestry, &loc)? else {
                return Ok(Vec::new());
            };
            NodeKind::Page { selector, body }
        }
        NodeKind::FontFace(body) => {
            let Some(body) = block_body(body, ancestry, &loc)? else {
                return Ok(Vec::new());
            };
            NodeKind::FontFace(body)
        }
        other => other,
    };
    Ok(vec![Node { kind, loc, level }])
}

/// Normalized body, or `None` when it ended up empty without starting that way.
fn block_body(body: RuleList, ancestry: Ancestry<'_>, loc: &Loc) -> EvalResult<Option<RuleList>> {
    let rules = rules_in(body.rules, ancestry)?;
    if rules.is_empty() && !body.empty {
        debug!("{loc}: dropping empty block");
        return Ok(None);
    }
    Ok(Some(RuleList {
        rules,
        empty: body.empty,
    }))
}

fn ruleset_rules(
    mut ruleset: Ruleset,
    loc: Loc,
    level: u32,
    ancestry: Ancestry<'_>,
) -> EvalResult<Vec<Node>> {
    if ancestry.in_void {
        let Some(extended) = ruleset.selectors.extended.take() else {
            debug!("{loc}: dropping ruleset inside @void");
            return Ok(Vec::new());
        };
        ruleset.selectors = SelectorList::new(extended, ruleset.selectors.loc.clone());
    }

    let empty = ruleset.body.empty;
    let children = rules_in(
        mem::take(&mut ruleset.body.rules),
        Ancestry {
            selectors: Some(&ruleset.selectors),
            ..ancestry
        },
    )?;
    let (properties, nested): (Vec<Node>, Vec<Node>) =
        children.into_iter().partition(Node::is_property);

    if properties.is_empty() {
        if empty {
            return Ok(vec![Node {
                kind: NodeKind::Ruleset(ruleset),
                loc,
                level,
            }]);
        }
        return Ok(nested);
    }

    ruleset.body = RuleList::new(properties);
    let mut out = Vec::with_capacity(nested.len().saturating_add(1));
    out.push(Node {
        kind: NodeKind::Ruleset(ruleset),
        loc,
        level,
    });
    out.extend(nested.into_iter().map(|mut rule| {
        rule.level = rule.level.saturating_add(1);
        rule
    }));
    Ok(out)
}

fn media_rules(
    mut media: Media,
    loc: Loc,
    level: u32,
    ancestry: Ancestry<'_>,
) -> EvalResult<Vec<Node>> {
    let empty = media.body.empty;
    let children = rules_in(mem::take(&mut media.body.rules), ancestry)?;

    let mut properties = Vec::new();
    let mut rulesets = Vec::new();
    let mut others = Vec::new();
    for child in children {
        match child.kind {
            NodeKind::Property { .. } => properties.push(child),
            NodeKind::Ruleset(_) => rulesets.push(child),
            _ => others.push(child),
        }
    }

    if !properties.is_empty() || empty {
        match ancestry.selectors {
            Some(selectors) => {
                let body = RuleList {
                    empty: properties.is_empty(),
                    rules: properties,
                };
                let wrapper = Ruleset {
                    selectors: selectors.clone(),
                    body,
                    id: 0,
                };
                rulesets.insert(0, Node::new(NodeKind::Ruleset(wrapper), loc.clone()));
            }
            None if !properties.is_empty() => {
                return Err(EvalError::structure(
                    "top-level @media can not directly contain properties",
                    &loc,
                ));
            }
            None => {}
        }
    }

    if rulesets.is_empty() {
        if empty {
            return Ok(vec![Node {
                kind: NodeKind::Media(media),
                loc,
                level,
            }]);
        }
        return Ok(others);
    }

    media.body = RuleList::new(rulesets);
    let mut out = Vec::with_capacity(others.len().saturating_add(1));
    out.push(Node {
        kind: NodeKind::Media(media),
        loc,
        level,
    });
    out.extend(others.into_iter().map(|mut rule| {
        match &mut rule.kind {
            NodeKind::Media(nested) if !nested.nested => {
                nested.nested = true;
                rule.level = 1;
            }
            _ => rule.level = rule.level.saturating_add(1),
        }
        rule
    }));
    Ok(out)
}

/// Ranges become lists, nested lists are spliced inline, single items stand
/// alone and empty lists become null.
fn property_value(value: Node) -> Node {
    match value.kind {
        NodeKind::Range { .. } => match Span::of(&value) {
            Ok(span) => property_value(span.to_list(&value.loc)),
            Err(_) => value,
        },
        NodeKind::List(nodes) => {
            let mut flat = Vec::with_capacity(nodes.len());
            for item in nodes {
                let item = property_value(item);
                match item.kind {
                    NodeKind::List(inner) => flat.extend(inner),
                    _ => flat.push(item),
                }
            }
            match flat.len() {
                0 => Node::null(value.loc),
                1 => flat.pop().unwrap_or_else(|| Node::null(value.loc)),
                _ => Node::new(NodeKind::List(flat), value.loc),
            }
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use css_tree::{ErrorKind, MediaQueryList, Selector};

    fn loc() -> Loc {
        Loc::default()
    }

    fn property(name: &str) -> Node {
        Node::new(
            NodeKind::Property {
                name: Box::new(Node::ident(name, loc())),
                value: Box::new(Node::number(1.0, loc())),
                important: false,
            },
            loc(),
        )
    }

    fn ruleset(name: &str, rules: Vec<Node>) -> Node {
        let part = Node::new(NodeKind::TypeSelector(Box::new(Node::ident(name, loc()))), loc());
        let selectors = SelectorList::new(vec![Selector::new(vec![part], loc())], loc());
        let empty = rules.is_empty();
        Node::new(
            NodeKind::Ruleset(Ruleset {
                selectors,
                body: RuleList { rules, empty },
                id: 0,
            }),
            loc(),
        )
    }

    fn media(rules: Vec<Node>) -> Node {
        Node::new(
            NodeKind::Media(Media {
                queries: MediaQueryList::new(Vec::new(), loc()),
                body: RuleList::new(rules),
                nested: false,
            }),
            loc(),
        )
    }

    #[test]
    fn nested_rulesets_are_promoted_one_level() -> Result<(), EvalError> {
        let inner = ruleset("b", vec![property("height")]);
        let rules = vec![ruleset("a", vec![property("width"), inner])];
        let normalized = normalize(rules)?;
        let levels: Vec<u32> = normalized.iter().map(|node| node.level).collect();
        assert_eq!(levels, [0, 1]);
        Ok(())
    }

    #[test]
    fn emptied_ruleset_is_replaced_by_its_children() -> Result<(), EvalError> {
        let emptied = Node::new(
            NodeKind::Ruleset(Ruleset {
                selectors: SelectorList::new(Vec::new(), loc()),
                body: RuleList::new(Vec::new()),
                id: 0,
            }),
            loc(),
        );
        assert!(normalize(vec![emptied])?.is_empty());
        assert_eq!(normalize(vec![ruleset("kept", Vec::new())])?.len(), 1);
        Ok(())
    }

    #[test]
    fn rulesets_in_voids_need_extended_selectors() -> Result<(), EvalError> {
        let void = Node::new(
            NodeKind::Void(RuleList::new(vec![ruleset("a", vec![property("width")])])),
            loc(),
        );
        assert!(normalize(vec![void])?.is_empty());
        Ok(())
    }

    #[test]
    fn top_level_media_cannot_hold_properties() {
        let result = normalize(vec![media(vec![property("width")])]);
        assert!(result.is_err_and(|error| error.kind == ErrorKind::Structure));
    }

    #[test]
    fn media_properties_are_wrapped_in_the_ancestor_ruleset() -> Result<(), EvalError> {
        let rules = vec![ruleset("a", vec![media(vec![property("width")])])];
        let normalized = normalize(rules)?;
        let [promoted] = normalized.as_slice() else {
            return Err(EvalError::structure("expected one rule", &loc()));
        };
        let NodeKind::Media(block) = &promoted.kind else {
            return Err(EvalError::structure("expected media", &loc()));
        };
        assert!(block.nested);
        assert_eq!(promoted.level, 1);
        assert!(matches!(
            block.body.rules.first().map(|node| &node.kind),
            Some(NodeKind::Ruleset(_))
        ));
        Ok(())
    }

    #[test]
    fn list_values_are_flattened() {
        let separator = Node::new(NodeKind::Separator(" ".to_owned()), loc());
        let inner = Node::new(NodeKind::List(vec![Node::number(1.0, loc())]), loc());
        let single = Node::new(NodeKind::List(vec![inner]), loc());
        assert_eq!(property_value(single), Node::number(1.0, loc()));

        let nested = Node::new(
            NodeKind::List(vec![
                Node::number(1.0, loc()),
                separator.clone(),
                Node::new(
                    NodeKind::List(vec![
                        Node::number(2.0, loc()),
                        separator.clone(),
                        Node::number(3.0, loc()),
                    ]),
                    loc(),
                ),
            ]),
            loc(),
        );
        let flattened = property_value(nested);
        assert!(matches!(&flattened.kind, NodeKind::List(flat) if flat.len() == 5));
        assert_eq!(property_value(Node::new(NodeKind::List(Vec::new()), loc())), Node::null(loc()));
    }
}
