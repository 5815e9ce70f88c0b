//! Searches over rule lists.

use css_tree::{MediaQueryList, Node, NodeKind, Selector};

/// Child indices leading from a rule list down to one node.
pub type RulePath = Vec<usize>;

/// Rulesets whose selector list contains `target`.
///
/// Descends through voids, media blocks and non-matching rulesets, but not
/// into a match.
pub fn filter_rulesets(rules: &[Node], target: &Selector) -> Vec<RulePath> {
    let mut found = Vec::new();
    let mut prefix = Vec::new();
    collect_rulesets(rules, target, &mut prefix, &mut found);
    found
}

fn collect_rulesets(
    rules: &[Node],
    target: &Selector,
    prefix: &mut RulePath,
    found: &mut Vec<RulePath>,
) {
    for (index, node) in rules.iter().enumerate() {
        prefix.push(index);
        match &node.kind {
            NodeKind::Ruleset(ruleset) if ruleset.selectors.contains(target) => {
                found.push(prefix.clone());
            }
            NodeKind::Ruleset(_) | NodeKind::Media(_) | NodeKind::Void(_) => {
                if let Some(body) = node.rule_body() {
                    collect_rulesets(&body.rules, target, prefix, found);
                }
            }
            _ => {}
        }
        prefix.pop();
    }
}

/// Media blocks whose query list equals `queries`, not descending into a match.
pub fn filter_media(rules: &[Node], queries: &MediaQueryList) -> Vec<RulePath> {
    let mut found = Vec::new();
    let mut prefix = Vec::new();
    collect_media(rules, queries, &mut prefix, &mut found);
    found
}

fn collect_media(
    rules: &[Node],
    queries: &MediaQueryList,
    prefix: &mut RulePath,
    found: &mut Vec<RulePath>,
) {
    for (index, node) in rules.iter().enumerate() {
        prefix.push(index);
        match &node.kind {
            NodeKind::Media(media) if media.queries == *queries => found.push(prefix.clone()),
            _ => {
                if let Some(body) = node.rule_body() {
                    collect_media(&body.rules, queries, prefix, found);
                }
            }
        }
        prefix.pop();
    }
}

pub fn node_at<'tree>(rules: &'tree [Node], path: &[usize]) -> Option<&'tree Node> {
    let (first, rest) = path.split_first()?;
    let mut node = rules.get(*first)?;
    for index in rest {
        node = node.rule_body()?.rules.get(*index)?;
    }
    Some(node)
}

pub fn node_at_mut<'tree>(rules: &'tree mut [Node], path: &[usize]) -> Option<&'tree mut Node> {
    let (first, rest) = path.split_first()?;
    let mut node = rules.get_mut(*first)?;
    for index in rest {
        node = node.rule_body_mut()?.rules.get_mut(*index)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use css_tree::{Loc, Media, MediaQuery, RuleList, Ruleset, SelectorList};

    fn selector(name: &str) -> Selector {
        let class = Node::new(
            NodeKind::ClassSelector(Box::new(Node::ident(name, Loc::default()))),
            Loc::default(),
        );
        Selector::new(vec![class], Loc::default())
    }

    fn ruleset(name: &str, rules: Vec<Node>) -> Node {
        Node::new(
            NodeKind::Ruleset(Ruleset {
                selectors: SelectorList::new(vec![selector(name)], Loc::default()),
                body: RuleList::new(rules),
                id: 0,
            }),
            Loc::default(),
        )
    }

    fn queries(name: &str) -> MediaQueryList {
        let query = MediaQuery::new(vec![Node::ident(name, Loc::default())], Loc::default());
        MediaQueryList::new(vec![query], Loc::default())
    }

    fn media(name: &str, rules: Vec<Node>) -> Node {
        Node::new(
            NodeKind::Media(Media {
                queries: queries(name),
                body: RuleList::new(rules),
                nested: false,
            }),
            Loc::default(),
        )
    }

    #[test]
    fn rulesets_are_found_through_media_and_non_matches() {
        let rules = vec![
            ruleset("a", vec![ruleset("b", Vec::new())]),
            media("print", vec![ruleset("b", vec![ruleset("b", Vec::new())])]),
        ];
        let found = filter_rulesets(&rules, &selector("b"));
        assert_eq!(found, vec![vec![0, 0], vec![1, 0]]);
        assert!(node_at(&rules, &[1, 0]).is_some());
        assert!(node_at(&rules, &[3]).is_none());
    }

    #[test]
    fn media_filter_stops_at_matches() {
        let rules = vec![
            media("screen", vec![media("screen", Vec::new())]),
            ruleset("a", vec![media("screen", Vec::new())]),
        ];
        let found = filter_media(&rules, &queries("screen"));
        assert_eq!(found, vec![vec![0], vec![1, 0]]);
        assert!(filter_media(&rules, &queries("print")).is_empty());
    }
}
