//! Re-deriving selectors of rules moved under a new ancestor.

use crate::joiner::join_selectors;
use css_tree::{EvalResult, Node, NodeKind, SelectorList};

/// Rebuild every ruleset's selectors from its unjoined form against `ancestor`,
/// recursing through nested rulesets, media blocks and voids.
///
/// # Errors
/// Propagates joining failures, e.g. `&` with no ancestor.
pub fn flatten(rules: &mut [Node], ancestor: Option<&SelectorList>) -> EvalResult<()> {
    for node in rules {
        match &mut node.kind {
            NodeKind::Ruleset(ruleset) => {
                let mut joined = join_selectors(ancestor, ruleset.selectors.unjoined())?;
                joined.extended = ruleset.selectors.extended.take();
                ruleset.selectors = joined;
                flatten(&mut ruleset.body.rules, Some(&ruleset.selectors))?;
            }
            NodeKind::Media(media) => flatten(&mut media.body.rules, ancestor)?,
            NodeKind::Void(body) => flatten(&mut body.rules, ancestor)?,
            _ => {}
        }
    }
    Ok(())
}
