//! Nested selector and media-query joining.

use css_tree::value::literal_text;
use css_tree::{
    EvalError, EvalResult, MediaQuery, MediaQueryList, Node, NodeKind, Selector, SelectorList,
};

/// Join `list` against the ancestor selectors.
///
/// Every ancestor is combined with every selector, ancestors outermost. `&`
/// stands for the ancestor; without it the two are joined by a descendant
/// combinator, or by the selector's own leading combinator. The unjoined
/// selectors are kept as `original`.
///
/// # Errors
/// Returns a structure error for `&` or a leading combinator at the top level,
/// and for `&suffix` when the ancestor does not end in a class, id or type.
pub fn join_selectors(
    ancestor: Option<&SelectorList>,
    mut list: SelectorList,
) -> EvalResult<SelectorList> {
    let Some(ancestor) = ancestor else {
        for selector in &list.selectors {
            check_top_level(selector)?;
        }
        return Ok(list);
    };

    let original = list.selectors.clone();
    let mut joined = Vec::with_capacity(ancestor.selectors.len().saturating_mul(original.len()));
    for ancestor_selector in &ancestor.selectors {
        for selector in &original {
            joined.push(join_one(ancestor_selector, selector)?);
        }
    }
    list.selectors = joined;
    list.original = Some(original);
    Ok(list)
}

fn check_top_level(selector: &Selector) -> EvalResult<()> {
    if let Some(first) = selector.parts.first()
        && first.is_combinator()
    {
        return Err(EvalError::structure(
            "selector starting with a combinator is not allowed at the top level",
            &first.loc,
        ));
    }
    if let Some(ampersand) = selector
        .parts
        .iter()
        .find(|part| matches!(part.kind, NodeKind::AmpersandSelector(_)))
    {
        return Err(EvalError::structure(
            "& selector is not allowed at the top level",
            &ampersand.loc,
        ));
    }
    Ok(())
}

fn join_one(ancestor: &Selector, selector: &Selector) -> EvalResult<Selector> {
    let has_ampersand = selector
        .parts
        .iter()
        .any(|part| matches!(part.kind, NodeKind::AmpersandSelector(_)));

    let mut parts = Vec::new();
    if has_ampersand {
        for part in &selector.parts {
            match &part.kind {
                NodeKind::AmpersandSelector(None) => parts.extend(ancestor.parts.iter().cloned()),
                NodeKind::AmpersandSelector(Some(suffix)) => {
                    parts.extend(append_suffix(ancestor, suffix, part)?);
                }
                _ => parts.push(part.clone()),
            }
        }
    } else {
        parts.extend(ancestor.parts.iter().cloned());
        if !selector.starts_with_combinator() {
            parts.push(Node::new(
                NodeKind::Combinator(" ".to_owned()),
                selector.loc.clone(),
            ));
        }
        parts.extend(selector.parts.iter().cloned());
    }
    Ok(Selector::new(parts, selector.loc.clone()))
}

/// `&-suffix`: the ancestor with the suffix glued onto its last simple selector.
fn append_suffix(ancestor: &Selector, suffix: &Node, ampersand: &Node) -> EvalResult<Vec<Node>> {
    let mut parts = ancestor.parts.clone();
    let Some(last) = parts.last_mut() else {
        return Ok(parts);
    };
    let appended = literal_text(suffix).unwrap_or_default();
    let kind_name = last.type_name();
    match &mut last.kind {
        NodeKind::ClassSelector(name)
        | NodeKind::HashSelector(name)
        | NodeKind::TypeSelector(name) => {
            let text = literal_text(name).unwrap_or_default();
            let loc = name.loc.clone();
            **name = Node::ident(&format!("{text}{appended}"), loc);
            Ok(parts)
        }
        _ => Err(EvalError::structure(
            format!("appending to {kind_name} is not allowed"),
            &ampersand.loc,
        )),
    }
}

/// Join `list` against the ancestor media queries with `and`.
pub fn join_media(ancestor: Option<&MediaQueryList>, list: MediaQueryList) -> MediaQueryList {
    let Some(ancestor) = ancestor else {
        return list;
    };
    let mut queries = Vec::with_capacity(ancestor.queries.len().saturating_mul(list.queries.len()));
    for outer in &ancestor.queries {
        for inner in &list.queries {
            let mut parts = outer.parts.clone();
            parts.push(Node::new(
                NodeKind::MediaKeyword("and".to_owned()),
                inner.loc.clone(),
            ));
            parts.extend(inner.parts.iter().cloned());
            queries.push(MediaQuery::new(parts, inner.loc.clone()));
        }
    }
    MediaQueryList::new(queries, list.loc)
}
