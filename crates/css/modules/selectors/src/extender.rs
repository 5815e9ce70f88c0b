//! `@extend` application.

use crate::joiner::join_selectors;
use css_tree::{EvalResult, Node, NodeKind, RuleList, Selector, SelectorList};

/// Append `extending` to a matched ruleset's selectors.
///
/// Nested rulesets get their unjoined selectors re-joined against the appended
/// selectors, so `.a .b` gains `.x .b` when `.x` extends `.a`. With `record`
/// set the appended selectors are also kept in `extended`, which is what
/// survives when the ruleset sits inside a void. A module's own ruleset only
/// gains the selectors; its nested rulesets are left as they are.
///
/// # Errors
/// Propagates joining failures from nested rulesets.
pub fn extend_ruleset(
    ruleset: &mut Node,
    extending: &SelectorList,
    record: bool,
) -> EvalResult<()> {
    let NodeKind::Ruleset(matched) = &mut ruleset.kind else {
        return Ok(());
    };
    append(&mut matched.selectors, &extending.selectors, record);
    if matched.selectors.module {
        return Ok(());
    }
    let appended = SelectorList::new(extending.selectors.clone(), extending.loc.clone());
    extend_nested(&mut matched.body, &appended, record)
}

fn append(selectors: &mut SelectorList, appended: &[Selector], record: bool) {
    selectors.selectors.extend_from_slice(appended);
    if record {
        selectors.record_extended(appended);
    }
}

fn extend_nested(body: &mut RuleList, ancestor: &SelectorList, record: bool) -> EvalResult<()> {
    for node in &mut body.rules {
        match &mut node.kind {
            NodeKind::Ruleset(nested) => {
                let joined = join_selectors(Some(ancestor), nested.selectors.unjoined())?;
                append(&mut nested.selectors, &joined.selectors, record);
                extend_nested(&mut nested.body, &joined, record)?;
            }
            NodeKind::Media(media) => extend_nested(&mut media.body, ancestor, record)?,
            NodeKind::Void(rules) => extend_nested(rules, ancestor, record)?,
            _ => {}
        }
    }
    Ok(())
}
