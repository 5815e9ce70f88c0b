//! `@import`: inlining resolved stylesheets and rebasing the ones left to the browser.

use super::{Evaluator, Flow};
use crate::context::Context;
use crate::resolver::Resolver;
use css_syntax::{ParseOptions, Parsed, StartRule};
use css_tree::paths::{dirname, relative, resolve, to_css};
use css_tree::value::{literal_text, quoted};
use css_tree::{ErrorKind, EvalError, EvalResult, Loc, MediaQueryList, Node, NodeKind};
use log::debug;
use std::path::{Path, PathBuf};
use url::Url;

impl Evaluator<'_> {
    pub async fn import(
        &mut self,
        url: Node,
        media: Option<MediaQueryList>,
        loc: Loc,
        cx: &Context,
    ) -> EvalResult<Flow> {
        let url = self.expression(url, cx).await?;
        let media = match media {
            Some(media) => Some(self.media_query_list(media, cx).await?),
            None => None,
        };
        let target = match (&media, &url.kind) {
            (None, NodeKind::Str { .. }) => {
                literal_text(&url)
                    .filter(|target| !is_external(target) && !target.ends_with(".css"))
            }
            _ => None,
        };
        let Some(target) = target else {
            debug!("{loc}: @import kept in the output");
            let url = match url.kind {
                NodeKind::Url(inner) => {
                    Node::new(NodeKind::Url(Box::new(self.rebase(*inner, &loc))), url.loc)
                }
                _ => self.rebase(url, &loc),
            };
            return Ok(Flow::single(Node::new(
                NodeKind::Import {
                    url: Box::new(url),
                    media,
                },
                loc,
            )));
        };

        let base = base_dir(&loc.filename);
        let resolved = Resolver::new(self.loader, self.options, &self.imported)
            .resolve(&target, &base, &loc)
            .await?;
        let Some(file) = resolved else {
            debug!("{loc}: '{target}' was already imported");
            return Ok(Flow::Rules(Vec::new()));
        };
        debug!("{loc}: importing {}", file.path.display());

        self.options
            .imports
            .insert(file.path.clone(), file.content.clone());
        self.imported.insert(file.path.clone());
        let filename = file.path.to_string_lossy();
        let options = ParseOptions::new(&filename, StartRule::Stylesheet);
        let Parsed::Stylesheet(rules) = self.parser.parse(&file.content, &options)? else {
            return Err(EvalError::new(
                ErrorKind::Parse,
                format!("{filename} did not parse as a stylesheet"),
                &loc,
            ));
        };
        self.rules(rules, cx).await
    }

    /// A relative path rewritten from the importing file's directory to `out`.
    fn rebase(&self, node: Node, importer: &Loc) -> Node {
        let Some(text) = literal_text(&node) else {
            return node;
        };
        if is_external(&text) || text.starts_with('/') {
            return node;
        }
        let absolute = resolve(&base_dir(&importer.filename), Path::new(&text));
        let rebased = to_css(&relative(&self.options.out, &absolute));
        match node.kind {
            NodeKind::Str { quote, .. } => quoted(&rebased, quote, node.loc),
            NodeKind::Identifier(_) => Node::ident(&rebased, node.loc),
            _ => Node::raw(&rebased, node.loc),
        }
    }
}

/// Protocol URLs and protocol-relative `//host/...` targets.
fn is_external(target: &str) -> bool {
    target.starts_with("//") || Url::parse(target).is_ok()
}

/// Directory imports are resolved from. A filename ending in `/` is a directory.
fn base_dir(filename: &str) -> PathBuf {
    if filename.ends_with('/') {
        PathBuf::from(filename)
    } else {
        dirname(Path::new(filename))
    }
}
