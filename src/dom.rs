//! A small retained node tree: the substrate the bindings mount into.
//!
//! The tree deliberately mirrors the handful of operations reconciliation needs
//! (`insert_before`, `remove_child`, shallow/deep cloning, attribute and text
//! writes) and nothing else. Layout, styling and events are out of scope.
//!
//! [`Node`] is a cheap handle: cloning it clones the handle, not the tree.
//! Equality and hashing are **pointer identity**, which is what the differ and
//! the keyed binding key on — two structurally equal subtrees are still two
//! different render targets.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::warn;

/// Structural misuse of the tree. These indicate caller bugs, not data-driven
/// conditions, and the bindings treat them accordingly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	/// The reference node passed to [`Node::insert_before`] is not a child of
	/// the target parent.
	#[error("reference node is not a child of the target parent")]
	ReferenceNotFound,
	/// The node passed to [`Node::remove_child`] is not a child of this parent.
	#[error("node is not a child of this parent")]
	NotAChild,
	/// Inserting a node into its own subtree.
	#[error("a node cannot be inserted into its own subtree")]
	HierarchyViolation,
}

/// Handle to one node of the tree.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

struct NodeData {
	kind: NodeKind,
	parent: RefCell<Weak<NodeData>>,
	children: RefCell<Vec<Node>>,
}

enum NodeKind {
	Element {
		tag: String,
		attributes: RefCell<Vec<(String, String)>>,
	},
	Text(RefCell<String>),
	/// Invisible structural marker, used by the structural bindings as a
	/// stable insertion anchor. Serializes like an empty comment.
	Placeholder,
	/// Container whose children are stamped into a mount root; the fragment
	/// node itself is never inserted anywhere.
	Fragment,
}

impl Node {
	fn new(kind: NodeKind) -> Self {
		Self(Rc::new(NodeData {
			kind,
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
		}))
	}

	#[must_use]
	pub fn element(tag: &str) -> Self {
		Self::new(NodeKind::Element {
			tag: tag.to_owned(),
			attributes: RefCell::new(Vec::new()),
		})
	}

	#[must_use]
	pub fn text(data: &str) -> Self {
		Self::new(NodeKind::Text(RefCell::new(data.to_owned())))
	}

	#[must_use]
	pub fn placeholder() -> Self {
		Self::new(NodeKind::Placeholder)
	}

	#[must_use]
	pub fn fragment() -> Self {
		Self::new(NodeKind::Fragment)
	}

	/// `true` iff both handles point at the same node.
	#[must_use]
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}

	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match &self.0.kind {
			NodeKind::Element { tag, .. } => Some(tag),
			_ => None,
		}
	}

	#[must_use]
	pub fn is_placeholder(&self) -> bool {
		matches!(&self.0.kind, NodeKind::Placeholder)
	}

	#[must_use]
	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	/// Snapshot of the current child list.
	#[must_use]
	pub fn children(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	#[must_use]
	pub fn child_count(&self) -> usize {
		self.0.children.borrow().len()
	}

	#[must_use]
	pub fn child(&self, index: usize) -> Option<Node> {
		self.0.children.borrow().get(index).cloned()
	}

	#[must_use]
	pub fn index_of(&self, child: &Node) -> Option<usize> {
		self.0.children.borrow().iter().position(|c| Node::ptr_eq(c, child))
	}

	#[must_use]
	pub fn next_sibling(&self) -> Option<Node> {
		let parent = self.parent()?;
		let children = parent.0.children.borrow();
		let at = children.iter().position(|c| Node::ptr_eq(c, self))?;
		children.get(at + 1).cloned()
	}

	/// Appends `child` as the last child, detaching it from any previous
	/// parent first.
	pub fn append(&self, child: &Node) -> Result<(), DomError> {
		self.insert_before(child, None)
	}

	/// Inserts `child` immediately before `reference` (or as the last child
	/// when `reference` is `None`), detaching it from any previous parent
	/// first. Inserting a node before itself is a no-op.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		if let Some(reference) = reference {
			if Node::ptr_eq(child, reference) {
				return Ok(());
			}
		}
		let mut cursor = Some(self.clone());
		while let Some(ancestor) = cursor {
			if Node::ptr_eq(&ancestor, child) {
				return Err(DomError::HierarchyViolation);
			}
			cursor = ancestor.parent();
		}
		child.detach();
		let mut children = self.0.children.borrow_mut();
		let at = match reference {
			Some(reference) => children
				.iter()
				.position(|c| Node::ptr_eq(c, reference))
				.ok_or(DomError::ReferenceNotFound)?,
			None => children.len(),
		};
		children.insert(at, child.clone());
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		Ok(())
	}

	pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
		let mut children = self.0.children.borrow_mut();
		let at = children
			.iter()
			.position(|c| Node::ptr_eq(c, child))
			.ok_or(DomError::NotAChild)?;
		children.remove(at);
		*child.0.parent.borrow_mut() = Weak::new();
		Ok(())
	}

	/// Removes this node from its parent, if it has one.
	pub fn detach(&self) {
		if let Some(parent) = self.parent() {
			// The child list is consistent with the parent pointer, so this
			// cannot actually fail.
			let _ = parent.remove_child(self);
		}
	}

	/// Drops every child. Counterpart of clearing a container before reuse.
	pub fn clear_children(&self) {
		let mut children = self.0.children.borrow_mut();
		for child in children.drain(..) {
			*child.0.parent.borrow_mut() = Weak::new();
		}
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		match &self.0.kind {
			NodeKind::Element { attributes, .. } => {
				let mut attributes = attributes.borrow_mut();
				match attributes.iter_mut().find(|(n, _)| n == name) {
					Some((_, v)) => value.clone_into(v),
					None => attributes.push((name.to_owned(), value.to_owned())),
				}
			}
			_ => warn!("Ignoring attribute write {:?}={:?} on a non-element node.", name, value),
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		match &self.0.kind {
			NodeKind::Element { attributes, .. } => attributes
				.borrow()
				.iter()
				.find(|(n, _)| n == name)
				.map(|(_, v)| v.clone()),
			_ => None,
		}
	}

	#[must_use]
	pub fn has_attribute(&self, name: &str) -> bool {
		self.attribute(name).is_some()
	}

	pub fn remove_attribute(&self, name: &str) {
		if let NodeKind::Element { attributes, .. } = &self.0.kind {
			attributes.borrow_mut().retain(|(n, _)| n != name);
		}
	}

	pub fn set_text(&self, data: &str) {
		match &self.0.kind {
			NodeKind::Text(text) => data.clone_into(&mut text.borrow_mut()),
			_ => warn!("Ignoring text write {:?} on a non-text node.", data),
		}
	}

	/// Concatenated text of this node and its descendants, in document order.
	#[must_use]
	pub fn text_content(&self) -> String {
		match &self.0.kind {
			NodeKind::Text(text) => text.borrow().clone(),
			_ => {
				let mut out = String::new();
				for child in self.0.children.borrow().iter() {
					out.push_str(&child.text_content());
				}
				out
			}
		}
	}

	/// Clones this node without its children (and without its parent link).
	/// Element attributes are copied by value.
	#[must_use]
	pub fn clone_shallow(&self) -> Node {
		Self::new(match &self.0.kind {
			NodeKind::Element { tag, attributes } => NodeKind::Element {
				tag: tag.clone(),
				attributes: RefCell::new(attributes.borrow().clone()),
			},
			NodeKind::Text(text) => NodeKind::Text(RefCell::new(text.borrow().clone())),
			NodeKind::Placeholder => NodeKind::Placeholder,
			NodeKind::Fragment => NodeKind::Fragment,
		})
	}

	/// Clones this node and its entire subtree.
	#[must_use]
	pub fn clone_deep(&self) -> Node {
		let clone = self.clone_shallow();
		for child in self.0.children.borrow().iter() {
			clone.adopt(child.clone_deep());
		}
		clone
	}

	/// Infallible internal insertion for freshly created children.
	fn adopt(&self, child: Node) {
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().push(child);
	}

	/// First descendant element (depth-first, excluding this node) carrying
	/// the `marker` attribute. This is how binding descriptors locate their
	/// target inside freshly stamped content.
	#[must_use]
	pub fn find_marked(&self, marker: &str) -> Option<Node> {
		for child in self.0.children.borrow().iter() {
			if child.has_attribute(marker) {
				return Some(child.clone());
			}
			if let Some(found) = child.find_marked(marker) {
				return Some(found);
			}
		}
		None
	}

	/// First descendant element (depth-first, excluding this node) with the
	/// given tag name.
	#[must_use]
	pub fn find_element(&self, tag: &str) -> Option<Node> {
		for child in self.0.children.borrow().iter() {
			if child.tag() == Some(tag) {
				return Some(child.clone());
			}
			if let Some(found) = child.find_element(tag) {
				return Some(found);
			}
		}
		None
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Node::ptr_eq(self, other)
	}
}
impl Eq for Node {}
impl Hash for Node {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(Rc::as_ptr(&self.0) as usize).hash(state);
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			NodeKind::Element { tag, .. } => write!(f, "Node(<{}> @{:p})", tag, Rc::as_ptr(&self.0)),
			NodeKind::Text(text) => write!(f, "Node({:?} @{:p})", &*text.borrow(), Rc::as_ptr(&self.0)),
			NodeKind::Placeholder => write!(f, "Node(placeholder @{:p})", Rc::as_ptr(&self.0)),
			NodeKind::Fragment => write!(f, "Node(fragment @{:p})", Rc::as_ptr(&self.0)),
		}
	}
}

/// Markup-flavored rendering, mainly for assertions and log output.
impl fmt::Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			NodeKind::Element { tag, attributes } => {
				write!(f, "<{}", tag)?;
				for (name, value) in attributes.borrow().iter() {
					if value.is_empty() {
						write!(f, " {}", name)?;
					} else {
						write!(f, " {}={:?}", name, value)?;
					}
				}
				write!(f, ">")?;
				for child in self.0.children.borrow().iter() {
					write!(f, "{}", child)?;
				}
				write!(f, "</{}>", tag)
			}
			NodeKind::Text(text) => write!(f, "{}", text.borrow()),
			NodeKind::Placeholder => write!(f, "<!---->"),
			NodeKind::Fragment => {
				for child in self.0.children.borrow().iter() {
					write!(f, "{}", child)?;
				}
				Ok(())
			}
		}
	}
}
