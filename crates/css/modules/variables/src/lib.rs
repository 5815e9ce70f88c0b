//! Builtin functions and variables of the stylesheet language.
//!
//! The builtins live in the outermost scope frame. Functions receive their
//! arguments already evaluated and run synchronously:
//! - `len`, `opp`, `unit` inspect and convert values
//! - `list`, `push`, `pop`, `shift`, `unshift` build and take apart lists
//! - `$__dirname` yields the directory of the referencing file relative to `out`

#![forbid(unsafe_code)]

use css_tree::list::{Span, build, items, items_of, length, separator};
use css_tree::paths::{dirname, relative, to_css};
use css_tree::value::{Unit, literal_text, opposite, quoted, to_number};
use css_tree::{
    Builtin, BuiltinVariable, EvalError, EvalResult, Frame, Loc, Node, NodeKind, Options, Quote,
    Scope,
};
use log::trace;
use std::path::Path;
use url::Url;

/// The frame holding every builtin, keyed by name.
pub fn builtin_frame() -> Frame {
    let mut frame = Frame::new();
    for builtin in Builtin::ALL {
        frame.insert(
            builtin.name().to_owned(),
            Node::new(NodeKind::Builtin(builtin), Loc::default()),
        );
    }
    let dirname = BuiltinVariable::Dirname;
    frame.insert(
        dirname.name().to_owned(),
        Node::new(NodeKind::BuiltinVariable(dirname), Loc::default()),
    );
    frame
}

/// Initial chain: builtins, then one empty frame for the stylesheet.
pub fn default_scope() -> Scope {
    Scope::new(vec![builtin_frame(), Frame::new()])
}

/// Invoke `builtin` with evaluated `args`.
///
/// # Errors
/// The list builtins return a type error when their first argument is not a
/// list or range.
pub fn call_builtin(builtin: Builtin, args: &[Node], loc: &Loc) -> EvalResult<Node> {
    trace!("calling builtin {}", builtin.name());
    let Some(first) = args.first() else {
        return Ok(Node::null(loc.clone()));
    };
    match builtin {
        Builtin::Len => {
            let count = length(first)?;
            Ok(Node::number(count as f64, loc.clone()))
        }
        Builtin::Opp => Ok(opposite(first)),
        Builtin::Unit => Ok(unit(first, args.get(1), loc)),
        Builtin::List => list(first, args.get(1), loc),
        Builtin::Push | Builtin::Unshift => {
            let (mut current, separator) = list_parts(builtin, first)?;
            let added = args.iter().skip(1).cloned();
            if builtin == Builtin::Push {
                current.extend(added);
            } else {
                let mut prefixed: Vec<Node> = added.collect();
                prefixed.append(&mut current);
                current = prefixed;
            }
            Ok(build(current, &separator, loc.clone()))
        }
        Builtin::Pop | Builtin::Shift => {
            let (current, _) = list_parts(builtin, first)?;
            let taken = if builtin == Builtin::Pop {
                current.last()
            } else {
                current.first()
            };
            Ok(taken.cloned().unwrap_or_else(|| Node::null(loc.clone())))
        }
    }
}

fn list_parts(builtin: Builtin, value: &Node) -> EvalResult<(Vec<Node>, Node)> {
    match &value.kind {
        NodeKind::List(nodes) => Ok((items(nodes), separator(nodes, &value.loc))),
        NodeKind::Range { .. } => {
            let values = Span::of(value)?.values(&value.loc);
            Ok((values, separator(&[], &value.loc)))
        }
        _ => Err(EvalError::type_error(
            format!(
                "{}() expects a list as its first argument, got {}",
                builtin.name(),
                value.type_name()
            ),
            value,
        )),
    }
}

fn unit(number: &Node, target: Option<&Node>, loc: &Loc) -> Node {
    let Some(value) = to_number(number) else {
        return Node::null(loc.clone());
    };
    let Some(target) = target else {
        let text = Unit::of(number).map(|unit| unit.as_str().to_owned()).unwrap_or_default();
        return quoted(&text, Quote::Double, loc.clone());
    };
    let unit = match &target.kind {
        NodeKind::Number(_) | NodeKind::Null => Unit::None,
        NodeKind::Percentage(_) => Unit::Percent,
        NodeKind::Dimension(_, name) => Unit::Named(name.clone()),
        NodeKind::Identifier(_) | NodeKind::Str { .. } => {
            Unit::parse(&literal_text(target).unwrap_or_default())
        }
        _ => return Node::null(loc.clone()),
    };
    unit.apply(value, loc.clone())
}

fn list(value: &Node, separator_arg: Option<&Node>, loc: &Loc) -> EvalResult<Node> {
    let (current, existing) = match &value.kind {
        NodeKind::List(nodes) => (items(nodes), separator(nodes, loc)),
        _ => (items_of(value)?, separator(&[], loc)),
    };
    let separator = separator_arg
        .and_then(literal_text)
        .map_or(existing, |text| separator_node(&text, loc));
    Ok(build(current, &separator, loc.clone()))
}

/// A blank separator argument means whitespace.
fn separator_node(text: &str, loc: &Loc) -> Node {
    let trimmed = text.trim();
    let symbol = if trimmed.is_empty() { " " } else { trimmed };
    Node::new(NodeKind::Separator(symbol.to_owned()), loc.clone())
}

/// Value of a builtin variable referenced at `loc`.
pub fn builtin_variable(variable: BuiltinVariable, loc: &Loc, options: &Options) -> Node {
    match variable {
        BuiltinVariable::Dirname => {
            let text = relative_dirname(&loc.filename, &options.out.to_string_lossy());
            quoted(&text, Quote::Double, loc.clone())
        }
    }
}

/// Directory of `filename` relative to `out`. Either may be a URL; paths on
/// the same origin compare by path, otherwise the output is absolute.
fn relative_dirname(filename: &str, out: &str) -> String {
    let (file_origin, file_path) = split_origin(filename);
    let directory = if file_path.ends_with('/') {
        file_path.clone()
    } else {
        to_css(&dirname(Path::new(&file_path)))
    };
    match split_origin(out) {
        (Some(out_origin), out_path) if file_origin.as_deref() == Some(out_origin.as_str()) => {
            to_css(&relative(Path::new(&out_path), Path::new(&directory)))
        }
        (Some(out_origin), out_path) => format!("{out_origin}{out_path}"),
        (None, out_path) => to_css(&relative(Path::new(&out_path), Path::new(&directory))),
    }
}

fn split_origin(text: &str) -> (Option<String>, String) {
    match Url::parse(text) {
        Ok(url) if url.has_host() => {
            let origin = url.origin().ascii_serialization();
            (Some(origin), url.path().to_owned())
        }
        _ => (None, text.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::slice;
    use css_tree::ErrorKind;

    fn loc() -> Loc {
        Loc::new("/site/css/app.roo", 1, 1)
    }

    fn space_list(values: &[f64]) -> Node {
        let separator = Node::new(NodeKind::Separator(" ".to_owned()), loc());
        build(
            values.iter().map(|value| Node::number(*value, loc())).collect(),
            &separator,
            loc(),
        )
    }

    #[test]
    fn frame_binds_every_builtin() {
        let frame = builtin_frame();
        for builtin in Builtin::ALL {
            assert!(frame.contains_key(builtin.name()));
        }
        assert!(frame.contains_key("__dirname"));
        assert_eq!(default_scope().depth(), 2);
    }

    #[test]
    fn len_counts_items_and_ranges() -> Result<(), EvalError> {
        let counted = call_builtin(Builtin::Len, &[space_list(&[1.0, 2.0, 3.0])], &loc())?;
        assert_eq!(counted, Node::number(3.0, loc()));
        let scalar = call_builtin(Builtin::Len, &[Node::ident("a", loc())], &loc())?;
        assert_eq!(scalar, Node::number(1.0, loc()));
        assert_eq!(call_builtin(Builtin::Len, &[], &loc())?, Node::null(loc()));
        Ok(())
    }

    #[test]
    fn unit_reads_and_replaces_units() -> Result<(), EvalError> {
        let size = Node::dimension(12.0, "px", loc());
        assert_eq!(
            call_builtin(Builtin::Unit, slice::from_ref(&size), &loc())?,
            quoted("px", Quote::Double, loc())
        );
        let percent = quoted("%", Quote::Double, loc());
        let converted = call_builtin(Builtin::Unit, &[size.clone(), percent], &loc())?;
        assert_eq!(converted, Node::new(NodeKind::Percentage(12.0), loc()));
        let stripped = call_builtin(Builtin::Unit, &[size, Node::null(loc())], &loc())?;
        assert_eq!(stripped, Node::number(12.0, loc()));
        Ok(())
    }

    #[test]
    fn push_pop_shift_unshift() -> Result<(), EvalError> {
        let base = space_list(&[1.0, 2.0]);
        let three = Node::number(3.0, loc());
        let pushed = call_builtin(Builtin::Push, &[base.clone(), three], &loc())?;
        assert_eq!(pushed, space_list(&[1.0, 2.0, 3.0]));
        let zero = Node::number(0.0, loc());
        let unshifted = call_builtin(Builtin::Unshift, &[base.clone(), zero], &loc())?;
        assert_eq!(unshifted, space_list(&[0.0, 1.0, 2.0]));
        assert_eq!(
            call_builtin(Builtin::Pop, slice::from_ref(&base), &loc())?,
            Node::number(2.0, loc())
        );
        assert_eq!(call_builtin(Builtin::Shift, &[base], &loc())?, Node::number(1.0, loc()));
        Ok(())
    }

    #[test]
    fn list_builtins_reject_scalars() {
        let result = call_builtin(Builtin::Push, &[Node::number(1.0, loc())], &loc());
        assert!(result.is_err_and(|error| error.kind == ErrorKind::Type));
    }

    #[test]
    fn list_materializes_ranges_and_reseparates() -> Result<(), EvalError> {
        let range = Node::new(
            NodeKind::Range {
                from: Box::new(Node::number(1.0, loc())),
                to: Box::new(Node::number(3.0, loc())),
                exclusive: false,
            },
            loc(),
        );
        assert_eq!(call_builtin(Builtin::List, &[range], &loc())?, space_list(&[1.0, 2.0, 3.0]));
        let comma = call_builtin(
            Builtin::List,
            &[space_list(&[1.0, 2.0]), quoted(",", Quote::Double, loc())],
            &loc(),
        )?;
        let NodeKind::List(nodes) = &comma.kind else {
            return Err(EvalError::type_error("expected a list", &comma));
        };
        assert_eq!(
            nodes.get(1).map(|node| node.kind.clone()),
            Some(NodeKind::Separator(",".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn dirname_is_relative_to_out() {
        let local = Options::new("/site/app.roo").with_out("/site");
        let local_dir = builtin_variable(BuiltinVariable::Dirname, &loc(), &local);
        assert_eq!(local_dir, quoted("css", Quote::Double, loc()));

        let remote = Loc::new("http://example.com/assets/css/app.roo", 1, 1);
        let hosted = Options::new("/site/app.roo").with_out("http://example.com/assets");
        let remote_dir = builtin_variable(BuiltinVariable::Dirname, &remote, &hosted);
        assert_eq!(remote_dir, quoted("css", Quote::Double, remote));
    }
}
