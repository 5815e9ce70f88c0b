//! Fixtures shared by the pipeline tests: a parser serving prebuilt trees, an
//! in-memory loader, node builders and a compact rendering of the output.
#![allow(dead_code, reason = "each test binary uses a subset of the fixtures")]

use css_orchestrator::{Loader, Pipeline};
use css_syntax::{FragmentParser, ParseOptions, Parsed, SourceParser, StartRule};
use css_tree::value::to_text;
use css_tree::{
    AssignOp, BinaryOp, ErrorKind, EvalError, EvalResult, ForLoop, FunctionDef, Loc, Media,
    MediaQuery, MediaQueryList, Node, NodeKind, Options, Param, Quote, RuleList, Ruleset, Selector,
    SelectorList,
};
use env_logger::builder;
use futures::FutureExt as _;
use futures::future::{LocalBoxFuture, ready};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const ROOT: &str = "/project/main.roo";

/// Serves stylesheet trees registered by source text. Fragments are parsed for real.
#[derive(Default)]
pub struct FixtureParser {
    sheets: HashMap<String, Vec<Node>>,
}

impl FixtureParser {
    #[must_use]
    pub fn with(mut self, source: &str, rules: Vec<Node>) -> Self {
        self.sheets.insert(source.to_owned(), rules);
        self
    }
}

impl SourceParser for FixtureParser {
    fn parse(&self, source: &str, options: &ParseOptions) -> EvalResult<Parsed> {
        match options.start_rule {
            StartRule::Stylesheet => self
                .sheets
                .get(source)
                .cloned()
                .map(Parsed::Stylesheet)
                .ok_or_else(|| {
                    EvalError::new(
                        ErrorKind::Parse,
                        format!("no fixture for {source:?}"),
                        &options.base_loc(),
                    )
                }),
            StartRule::Selector | StartRule::MediaQuery => FragmentParser.parse(source, options),
        }
    }
}

/// Files held in memory; every other path is not found.
#[derive(Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    #[must_use]
    pub fn with(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_owned());
        self
    }
}

impl Loader for MemoryLoader {
    fn load<'load>(&'load self, path: &'load Path) -> LocalBoxFuture<'load, io::Result<String>> {
        let found = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound));
        ready(found).boxed_local()
    }
}

/// Route evaluator logs through the test harness.
pub fn init_logging() {
    builder().is_test(true).try_init().unwrap_or_default();
}

/// Evaluate `rules` as the root stylesheet with default options.
pub async fn run(rules: Vec<Node>) -> EvalResult<Vec<Node>> {
    let parser = FixtureParser::default();
    let loader = MemoryLoader::default();
    run_with(Options::new(ROOT), &parser, &loader, rules).await
}

pub async fn run_with(
    options: Options,
    parser: &dyn SourceParser,
    loader: &dyn Loader,
    rules: Vec<Node>,
) -> EvalResult<Vec<Node>> {
    init_logging();
    let mut pipeline = Pipeline::new(options, parser, loader);
    let output = pipeline.evaluate(stylesheet(rules)).await?;
    match output.kind {
        NodeKind::Stylesheet(rules) => Ok(rules),
        _ => Err(EvalError::structure("expected a stylesheet", &output.loc)),
    }
}

pub fn loc() -> Loc {
    Loc::new(ROOT, 1, 1)
}

pub fn stylesheet(rules: Vec<Node>) -> Node {
    Node::new(NodeKind::Stylesheet(rules), loc())
}

pub fn ident(text: &str) -> Node {
    Node::ident(text, loc())
}

pub fn number(value: f64) -> Node {
    Node::number(value, loc())
}

pub fn px(value: f64) -> Node {
    Node::dimension(value, "px", loc())
}

pub fn var(name: &str) -> Node {
    Node::variable(name, loc())
}

pub fn string(text: &str) -> Node {
    Node::string(text, loc())
}

pub fn raw(text: &str) -> Node {
    Node::raw(text, loc())
}

/// `"..."` with literal and interpolated parts.
pub fn interpolated_string(parts: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Str {
            quote: Quote::Double,
            parts,
        },
        loc(),
    )
}

pub fn interpolated_ident(parts: Vec<Node>) -> Node {
    Node::new(NodeKind::Identifier(parts), loc())
}

pub fn space_list(items: Vec<Node>) -> Node {
    let mut nodes = Vec::new();
    for (position, item) in items.into_iter().enumerate() {
        if position > 0 {
            nodes.push(Node::new(NodeKind::Separator(" ".to_owned()), loc()));
        }
        nodes.push(item);
    }
    Node::new(NodeKind::List(nodes), loc())
}

pub fn range(from: Node, to: Node, exclusive: bool) -> Node {
    Node::new(
        NodeKind::Range {
            from: Box::new(from),
            to: Box::new(to),
            exclusive,
        },
        loc(),
    )
}

pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
    Node::new(
        NodeKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        loc(),
    )
}

pub fn member(object: Node, index: Node) -> Node {
    Node::new(
        NodeKind::Member {
            object: Box::new(object),
            index: Box::new(index),
        },
        loc(),
    )
}

pub fn call(name: &str, args: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Call {
            callee: Box::new(ident(name)),
            args,
            mixin: false,
        },
        loc(),
    )
}

/// A call through any callee expression, such as `$fn(...)`.
pub fn call_value(callee: Node, args: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Call {
            callee: Box::new(callee),
            args,
            mixin: false,
        },
        loc(),
    )
}

pub fn mixin_call(callee: Node, args: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Call {
            callee: Box::new(callee),
            args,
            mixin: true,
        },
        loc(),
    )
}

pub fn function(params: &[&str], body: Vec<Node>) -> Node {
    variadic(params, None, body)
}

/// A function whose trailing `rest` parameter collects the remaining arguments.
pub fn variadic(params: &[&str], rest: Option<&str>, body: Vec<Node>) -> Node {
    let named = params.iter().map(|name| Param {
        name: (*name).to_owned(),
        default: None,
        rest: false,
    });
    let trailing = rest.map(|name| Param {
        name: name.to_owned(),
        default: None,
        rest: true,
    });
    let params = named.chain(trailing).collect();
    Node::new(
        NodeKind::Function(Rc::new(FunctionDef {
            params,
            body,
            closure: None,
        })),
        loc(),
    )
}

pub fn ret(value: Node) -> Node {
    Node::new(NodeKind::Return(Box::new(value)), loc())
}

pub fn assign(name: &str, value: Node) -> Node {
    assign_to(var(name), AssignOp::Assign, value)
}

pub fn assign_to(target: Node, op: AssignOp, value: Node) -> Node {
    Node::new(
        NodeKind::Assignment {
            op,
            target: Box::new(target),
            value: Box::new(value),
        },
        loc(),
    )
}

pub fn property(name: &str, value: Node) -> Node {
    Node::new(
        NodeKind::Property {
            name: Box::new(ident(name)),
            value: Box::new(value),
            important: false,
        },
        loc(),
    )
}

fn simple(kind: NodeKind) -> Node {
    Node::new(kind, loc())
}

pub fn class(name: &str) -> Node {
    simple(NodeKind::ClassSelector(Box::new(ident(name))))
}

pub fn tag(name: &str) -> Node {
    simple(NodeKind::TypeSelector(Box::new(ident(name))))
}

pub fn descendant() -> Node {
    simple(NodeKind::Combinator(" ".to_owned()))
}

pub fn selectors(parts: Vec<Vec<Node>>) -> SelectorList {
    let selectors = parts
        .into_iter()
        .map(|parts| Selector::new(parts, loc()))
        .collect();
    SelectorList::new(selectors, loc())
}

pub fn one(part: Node) -> SelectorList {
    selectors(vec![vec![part]])
}

pub fn ruleset(list: SelectorList, rules: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Ruleset(Ruleset {
            selectors: list,
            body: RuleList::new(rules),
            id: 0,
        }),
        loc(),
    )
}

pub fn media(feature: &str, value: Node, rules: Vec<Node>) -> Node {
    let part = simple(NodeKind::MediaFeature {
        name: Box::new(ident(feature)),
        value: Some(Box::new(value)),
    });
    let queries = MediaQueryList::new(vec![MediaQuery::new(vec![part], loc())], loc());
    Node::new(
        NodeKind::Media(Media {
            queries,
            body: RuleList::new(rules),
            nested: false,
        }),
        loc(),
    )
}

pub fn void(rules: Vec<Node>) -> Node {
    Node::new(NodeKind::Void(RuleList::new(rules)), loc())
}

pub fn extend(list: SelectorList) -> Node {
    Node::new(
        NodeKind::Extend {
            selectors: list,
            recorded: true,
        },
        loc(),
    )
}

pub fn mixin(list: SelectorList) -> Node {
    Node::new(NodeKind::Mixin(list), loc())
}

pub fn module(name: &str, rules: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Module {
            name: Box::new(ident(name)),
            separator: None,
            body: RuleList::new(rules),
        },
        loc(),
    )
}

pub fn if_else(condition: Node, consequent: Vec<Node>, alternate: Option<Node>) -> Node {
    Node::new(
        NodeKind::If {
            condition: Box::new(condition),
            consequent: RuleList::new(consequent),
            alternate: alternate.map(Box::new),
        },
        loc(),
    )
}

/// The `else { ... }` branch of an `@if`.
pub fn block(rules: Vec<Node>) -> Node {
    Node::new(NodeKind::Block(RuleList::new(rules)), loc())
}

pub fn for_loop(
    value: &str,
    index: Option<&str>,
    step: Option<Node>,
    iterable: Node,
    rules: Vec<Node>,
) -> Node {
    Node::new(
        NodeKind::For(Box::new(ForLoop {
            value: value.to_owned(),
            index: index.map(str::to_owned),
            step,
            iterable,
            body: RuleList::new(rules),
        })),
        loc(),
    )
}

pub fn import(target: &str) -> Node {
    Node::new(
        NodeKind::Import {
            url: Box::new(string(target)),
            media: None,
        },
        loc(),
    )
}

/// `selector { name: value; ... }` for every ruleset in the output, in order.
pub fn render(rules: &[Node]) -> Vec<String> {
    let mut out = Vec::new();
    for rule in rules {
        match &rule.kind {
            NodeKind::Ruleset(ruleset) => {
                let selectors: Vec<String> =
                    ruleset.selectors.selectors.iter().map(selector_text).collect();
                let body: Vec<String> = ruleset.body.rules.iter().map(declaration_text).collect();
                out.push(format!("{} {{ {} }}", selectors.join(", "), body.join(" ")));
            }
            NodeKind::Media(block) => {
                out.push(format!("@media {{ {} }}", render(&block.body.rules).join(" ")));
            }
            _ => out.push(format!("<{}>", rule.type_name())),
        }
    }
    out
}

pub fn selector_text(selector: &Selector) -> String {
    selector
        .parts
        .iter()
        .map(|part| match &part.kind {
            NodeKind::TypeSelector(name) => to_text(name).unwrap_or_default(),
            NodeKind::ClassSelector(name) => format!(".{}", to_text(name).unwrap_or_default()),
            NodeKind::HashSelector(name) => format!("#{}", to_text(name).unwrap_or_default()),
            NodeKind::UniversalSelector => "*".to_owned(),
            NodeKind::Combinator(symbol) if symbol == " " => " ".to_owned(),
            NodeKind::Combinator(symbol) => format!(" {symbol} "),
            NodeKind::PseudoSelector { name, .. } => {
                format!(":{}", to_text(name).unwrap_or_default())
            }
            _ => "?".to_owned(),
        })
        .collect()
}

pub fn declaration_text(node: &Node) -> String {
    match &node.kind {
        NodeKind::Property { name, value, .. } => format!(
            "{}: {};",
            to_text(name).unwrap_or_default(),
            value_text(value)
        ),
        _ => format!("<{}>", node.type_name()),
    }
}

pub fn value_text(value: &Node) -> String {
    match &value.kind {
        NodeKind::Null => "null".to_owned(),
        NodeKind::Call { callee, args, .. } => {
            let args: Vec<String> = args.iter().map(value_text).collect();
            format!("{}({})", to_text(callee).unwrap_or_default(), args.join(", "))
        }
        NodeKind::Binary { op, left, right } => {
            format!("{} {} {}", value_text(left), op.symbol(), value_text(right))
        }
        _ => to_text(value).unwrap_or_else(|| format!("<{}>", value.type_name())),
    }
}
