//! RFC 6690 link format: how a server advertises its resource tree
//! (`GET /.well-known/core`), and how a client reads another server's
//! advertisement.

use core::fmt::Write;

use tinyvec::ArrayVec;

use super::{NodeId, Tree};
use crate::config::Config;

/// The path under which every CoAP server advertises its resources
pub const WELL_KNOWN_CORE: [&str; 2] = [".well-known", "core"];

/// Whether discovery advertises a node: it must handle at least one
/// method, and must not be the discovery document itself.
pub fn default_filter<Cfg: Config>(tree: &Tree<'_, Cfg>, id: NodeId, path: &[&str]) -> bool {
  tree.node(id).has_any_handler() && path != &WELL_KNOWN_CORE[..]
}

/// Render the link-format document for a tree into a
/// [`core::fmt::Write`], advertising the nodes [`default_filter`]
/// selects.
///
/// Entries appear in tree (depth-first) order; each node's description
/// is emitted verbatim after its path.
pub fn write_link_format<W, Cfg>(tree: &Tree<'_, Cfg>, out: &mut W) -> core::fmt::Result
  where W: Write,
        Cfg: Config
{
  let mut path: ArrayVec<[&str; 8]> = Default::default();
  let mut first = true;
  walk(tree, NodeId::ROOT, &mut path, out, &mut first)
}

fn walk<'a, W, Cfg>(tree: &Tree<'a, Cfg>,
                    id: NodeId,
                    path: &mut ArrayVec<[&'a str; 8]>,
                    out: &mut W,
                    first: &mut bool)
                    -> core::fmt::Result
  where W: Write,
        Cfg: Config
{
  if default_filter(tree, id, path) {
    if !*first {
      out.write_char(',')?;
    }
    *first = false;

    out.write_char('<')?;
    for segment in path.iter() {
      write!(out, "/{}", segment)?;
    }
    out.write_char('>')?;

    if let Some(description) = tree.node(id).description() {
      write!(out, ";{}", description)?;
    }
  }

  for child in tree.children(id) {
    path.push(tree.node(child).segment());
    walk(tree, child, path, out, first)?;
    path.pop();
  }

  Ok(())
}

/// Iterate over the entries of a link-format document.
///
/// ```
/// use newt::resource::discovery::links;
///
/// let doc = r#"</time>;title="clock",</sensors/temp>;rt=temperature"#;
/// let targets = links(doc).map(|l| l.target).collect::<Vec<_>>();
/// assert_eq!(targets, vec!["/time", "/sensors/temp"]);
/// ```
pub fn links(doc: &str) -> Links<'_> {
  Links { rest: Some(doc) }
}

/// Iterator over [`Link`]s; see [`links`]
#[derive(Clone, Copy, Debug)]
pub struct Links<'a> {
  rest: Option<&'a str>,
}

/// One `<target>;attr;attr` entry of a link-format document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link<'a> {
  /// The URI-reference between the angle brackets
  pub target: &'a str,
  attrs: &'a str,
}

impl<'a> Iterator for Links<'a> {
  type Item = Link<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let rest = self.rest?;

      let (entry, after) = match rest.split_once(',') {
        | Some((e, after)) => (e, Some(after)),
        | None => (rest, None),
      };
      self.rest = after;

      let entry = entry.trim();

      if let Some(link) = parse_entry(entry) {
        return Some(link);
      }

      // tolerate (skip) empty or malformed entries rather than
      // abandoning the rest of the document
      if self.rest.is_none() {
        return None;
      }
    }
  }
}

fn parse_entry(entry: &str) -> Option<Link<'_>> {
  let rest = entry.strip_prefix('<')?;
  let (target, after) = rest.split_once('>')?;
  let attrs = after.strip_prefix(';').unwrap_or("");

  Some(Link { target, attrs })
}

impl<'a> Link<'a> {
  /// Iterate over this entry's attributes
  pub fn attrs(&self) -> Attrs<'a> {
    Attrs { rest: match self.attrs {
              | "" => None,
              | s => Some(s),
            } }
  }
}

/// Iterator over [`Attr`]s; see [`Link::attrs`]
#[derive(Clone, Copy, Debug)]
pub struct Attrs<'a> {
  rest: Option<&'a str>,
}

/// One `name` or `name=value` attribute of a link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attr<'a> {
  /// Attribute name (`rt`, `if`, `title`, `ct`, `sz`, ...)
  pub name: &'a str,
  /// Everything after the `=`, quotes included, or `None` for a bare
  /// flag attribute
  pub value: Option<&'a str>,
}

impl<'a> Iterator for Attrs<'a> {
  type Item = Attr<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let rest = self.rest?;

    let (attr, after) = match rest.split_once(';') {
      | Some((a, after)) => (a, Some(after)),
      | None => (rest, None),
    };
    self.rest = after;

    match attr.split_once('=') {
      | Some((name, value)) => Some(Attr { name,
                                           value: Some(value) }),
      | None => Some(Attr { name: attr,
                            value: None }),
    }
  }
}

impl<'a> Attr<'a> {
  /// Iterate over the space-separated values of this attribute.
  ///
  /// Double-quoted strings may contain spaces; the quotes are
  /// stripped from what the iterator yields.
  pub fn values(&self) -> Values<'a> {
    Values { rest: self.value }
  }
}

/// Iterator over an attribute's values; see [`Attr::values`]
#[derive(Clone, Copy, Debug)]
pub struct Values<'a> {
  rest: Option<&'a str>,
}

impl<'a> Iterator for Values<'a> {
  type Item = &'a str;

  fn next(&mut self) -> Option<Self::Item> {
    let rest = self.rest?.trim_start_matches(' ');

    if rest.is_empty() {
      self.rest = None;
      return None;
    }

    if let Some(quoted) = rest.strip_prefix('"') {
      match quoted.split_once('"') {
        | Some((value, after)) => {
          self.rest = Some(after);
          return Some(value);
        },
        | None => {
          // unterminated quote; yield the rest as-is
          self.rest = None;
          return Some(quoted);
        },
      }
    }

    match rest.split_once(' ') {
      | Some((value, after)) => {
        self.rest = Some(after);
        Some(value)
      },
      | None => {
        self.rest = None;
        Some(rest)
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use newt_common::Writable;

  use super::*;
  use crate::req::Method;
  use crate::resource::Node;
  use crate::test;

  type Tree<'a> = crate::resource::Tree<'a, test::Config>;

  fn noop(_: &crate::config::Message<test::Config>,
          _: &mut crate::resp::Reply<test::Config>) {
  }

  fn demo_tree() -> Tree<'static> {
    let mut tree = Tree::new();
    tree.add_child(NodeId::ROOT,
                   Node::new("time").on(Method::Get, noop)
                                    .describe(r#"title="clock""#));
    tree.add_branch(NodeId::ROOT,
                    [Node::new("sensors"),
                     Node::new("temp").on(Method::Get, noop).describe("rt=temperature")]);
    tree
  }

  #[test]
  fn render() {
    let tree = demo_tree();
    let mut out = Writable::<tinyvec::ArrayVec<[u8; 128]>>::default();
    write_link_format(&tree, &mut out).unwrap();

    assert_eq!(out.as_str(),
               r#"</time>;title="clock",</sensors/temp>;rt=temperature"#);
  }

  #[test]
  fn interior_nodes_are_not_advertised() {
    let tree = demo_tree();
    let mut out = Writable::<tinyvec::ArrayVec<[u8; 128]>>::default();
    write_link_format(&tree, &mut out).unwrap();

    assert!(!out.as_str().contains("<sensors>"));
  }

  #[test]
  fn parse_entries_attrs_values() {
    let doc = r#"</time>;title="clock",</sensors/temp>;rt=temperature;obs"#;

    let parsed = links(doc).collect::<Vec<_>>();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].target, "/time");

    let attrs = parsed[0].attrs().collect::<Vec<_>>();
    assert_eq!(attrs,
               vec![Attr { name: "title",
                           value: Some(r#""clock""#) }]);
    assert_eq!(attrs[0].values().collect::<Vec<_>>(), vec!["clock"]);

    let attrs = parsed[1].attrs().collect::<Vec<_>>();
    assert_eq!(attrs,
               vec![Attr { name: "rt",
                           value: Some("temperature") },
                    Attr { name: "obs",
                           value: None }]);
  }

  #[test]
  fn quoted_values_keep_spaces() {
    let doc = r#"</a>;sz="one two" three"#;
    let link = links(doc).next().unwrap();
    let attr = link.attrs().next().unwrap();

    assert_eq!(attr.values().collect::<Vec<_>>(), vec!["one two", "three"]);
  }

  #[test]
  fn round_trip_through_parser() {
    let tree = demo_tree();
    let mut out = Writable::<tinyvec::ArrayVec<[u8; 128]>>::default();
    write_link_format(&tree, &mut out).unwrap();

    let targets = links(out.as_str()).map(|l| l.target).collect::<Vec<_>>();
    assert_eq!(targets, vec!["/time", "/sensors/temp"]);
  }
}
