//! Selector and media-query algebra over evaluated rule trees.
//!
//! - Joining nested selectors and media queries against their ancestors
//! - Finding rulesets and media blocks by selector or query list
//! - Extending matched rulesets with extra selectors
//! - Re-deriving pulled-in rulesets against a new ancestor
//!
//! Every operation is stateless. Tree searches report [`RulePath`]s so callers
//! can mutate the matches afterwards without holding borrows across the walk.

mod extender;
mod filter;
mod flattener;
mod joiner;

pub use extender::extend_ruleset;
pub use filter::{RulePath, filter_media, filter_rulesets, node_at, node_at_mut};
pub use flattener::flatten;
pub use joiner::{join_media, join_selectors};
