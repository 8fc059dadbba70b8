//! The tree of resources a server-profile runtime serves.
//!
//! Nodes form a first-child / next-sibling tree keyed by URI path
//! segment; the root's segment is empty. A node carries one optional
//! handler per method, as a plain table of function pointers.
//!
//! Path strings and descriptions are borrowed from the caller and must
//! outlive the tree; the tree owns only its link structure.

use tinyvec::ArrayVec;

use crate::config::{self, Config};
use crate::req::method::{Method, METHODS};
use crate::resp::Reply;

/// Link-format rendering & parsing (RFC 6690)
pub mod discovery;

/// What runs when a request reaches a resource
pub type Handler<Cfg> = fn(&config::Message<Cfg>, &mut Reply<Cfg>);

/// Index of a node within its [`Tree`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(u16);

impl NodeId {
  /// The tree's root node; its path segment is empty.
  pub const ROOT: NodeId = NodeId(0);
}

/// One resource: a path segment, per-method handlers, and an optional
/// link-format description (`title="clock"`, `rt=temperature`, ...)
/// emitted verbatim by discovery.
pub struct Node<'a, Cfg: Config> {
  segment: &'a str,
  description: Option<&'a str>,
  handlers: [Option<Handler<Cfg>>; 7],
  first_child: Option<NodeId>,
  next_sibling: Option<NodeId>,
}

impl<'a, Cfg: Config> Default for Node<'a, Cfg> {
  fn default() -> Self {
    Self { segment: "",
           description: None,
           handlers: [None; 7],
           first_child: None,
           next_sibling: None }
  }
}

impl<'a, Cfg: Config> core::fmt::Debug for Node<'a, Cfg> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Node")
     .field("segment", &self.segment)
     .field("description", &self.description)
     .finish_non_exhaustive()
  }
}

impl<'a, Cfg: Config> Node<'a, Cfg> {
  /// Create a new resource with no handlers
  pub fn new(segment: &'a str) -> Self {
    Self { segment,
           ..Default::default() }
  }

  /// Attach the link-format attributes discovery advertises for this
  /// resource
  pub fn describe(mut self, description: &'a str) -> Self {
    self.description = Some(description);
    self
  }

  /// Attach a handler for a method
  pub fn on(mut self, method: Method, handler: Handler<Cfg>) -> Self {
    self.handlers[method.ix()] = Some(handler);
    self
  }

  /// The path segment this node matches
  pub fn segment(&self) -> &'a str {
    self.segment
  }

  /// The description discovery advertises
  pub fn description(&self) -> Option<&'a str> {
    self.description
  }

  /// The handler for a method, if any
  pub fn handler(&self, method: Method) -> Option<Handler<Cfg>> {
    self.handlers[method.ix()]
  }

  /// Whether any method has a handler.
  ///
  /// A node where nothing does is just an interior path segment; it is
  /// not advertised by discovery and requests addressed to it get 4.04.
  pub fn has_any_handler(&self) -> bool {
    METHODS.iter().any(|m| self.handlers[m.ix()].is_some())
  }
}

/// The resource tree.
///
/// Stores nodes in a fixed arena; links are indices, so no cycles and
/// no ownership puzzles. Currently the capacity is hard-coded at 32
/// nodes, but this will eventually be configurable at compile-time.
#[derive(Debug)]
pub struct Tree<'a, Cfg: Config> {
  nodes: ArrayVec<[Node<'a, Cfg>; 32]>,
}

impl<'a, Cfg: Config> Default for Tree<'a, Cfg> {
  fn default() -> Self {
    Self::new()
  }
}

impl<'a, Cfg: Config> Tree<'a, Cfg> {
  /// Create a tree holding only the root
  pub fn new() -> Self {
    let mut nodes = ArrayVec::default();
    nodes.push(Node::new(""));
    Self { nodes }
  }

  /// Borrow a node
  pub fn node(&self, id: NodeId) -> &Node<'a, Cfg> {
    &self.nodes[id.0 as usize]
  }

  /// Mutably borrow a node
  pub fn node_mut(&mut self, id: NodeId) -> &mut Node<'a, Cfg> {
    &mut self.nodes[id.0 as usize]
  }

  /// Iterate over the children of a node
  pub fn children(&self, id: NodeId) -> Children<'_, 'a, Cfg> {
    Children { tree: self,
               next: self.node(id).first_child }
  }

  /// Find the child of `parent` matching a path segment
  pub fn child(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
    self.children(parent)
        .find(|id| self.node(*id).segment == segment)
  }

  /// Append `node` to `parent`'s children.
  ///
  /// A no-op yielding `None` when a child with the same path segment
  /// already exists, or when the arena is full.
  pub fn add_child(&mut self, parent: NodeId, node: Node<'a, Cfg>) -> Option<NodeId> {
    if self.child(parent, node.segment).is_some() || self.nodes.is_full() {
      return None;
    }

    let id = NodeId(self.nodes.len() as u16);
    self.nodes.push(node);

    match self.node(parent).first_child {
      | None => self.node_mut(parent).first_child = Some(id),
      | Some(first) => {
        let mut last = first;
        while let Some(next) = self.node(last).next_sibling {
          last = next;
        }
        self.node_mut(last).next_sibling = Some(id);
      },
    }

    Some(id)
  }

  /// Grow a nested path under `parent`: the first node goes under
  /// `parent`, the second under the first, and so on.
  ///
  /// Segments already present are descended into rather than
  /// duplicated, so branches can share prefixes.
  pub fn add_branch(&mut self,
                    parent: NodeId,
                    nodes: impl IntoIterator<Item = Node<'a, Cfg>>)
                    -> Option<NodeId> {
    let mut at = parent;

    for node in nodes {
      at = match self.child(at, node.segment) {
        | Some(existing) => existing,
        | None => self.add_child(at, node)?,
      };
    }

    Some(at)
  }

  /// Walk from the root along a sequence of path segments.
  pub fn lookup<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Option<NodeId> {
    segments.into_iter()
            .try_fold(NodeId::ROOT, |at, segment| self.child(at, segment))
  }
}

/// Iterator over the children of a node; see [`Tree::children`]
#[derive(Debug)]
pub struct Children<'t, 'a, Cfg: Config> {
  tree: &'t Tree<'a, Cfg>,
  next: Option<NodeId>,
}

impl<'t, 'a, Cfg: Config> Iterator for Children<'t, 'a, Cfg> {
  type Item = NodeId;

  fn next(&mut self) -> Option<Self::Item> {
    let id = self.next?;
    self.next = self.tree.node(id).next_sibling;
    Some(id)
  }
}
