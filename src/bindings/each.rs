//! The keyed list binding: projects a collection into a sequence of template
//! instances, correlating items across render cycles by key.
//!
//! Every cycle recomputes the full render plan from the current scope, then
//! applies it in two phases: structural placement first (driven by
//! [`crate::diff::splice_node_list`] against a persistent placeholder
//! anchor), then the deferred per-item mount/update batch — so an instance's
//! `mount` always sees its render node already in its final document
//! position.
//!
//! Identity rules: an item whose key appears in consecutive cycles keeps its
//! template instance and render node and only has its scope refreshed. A key
//! that disappears gets exactly one unmount. Without a key extractor the
//! (post-filter) position is the key, so reordering an unkeyed list reads as
//! per-position content updates, not moves.

use crate::bindings::{BindError, EachSpec};
use crate::diff::{splice_node_list, SpliceOptions};
use crate::dom::Node;
use crate::scope::{extend, truthy, Evaluator, Key, Scope, Value};
use crate::template::{TemplateDef, TemplateInstance};
use hashbrown::{hash_map::Entry, HashMap};
use std::rc::Rc;
use tracing::{error, trace, trace_span, warn};

pub struct EachBinding {
	evaluate: Evaluator,
	condition: Option<Evaluator>,
	get_key: Option<Evaluator>,
	item_name: String,
	index_name: Option<String>,
	template: Rc<dyn TemplateDef>,
	/// Persistent marker standing where the anchor node used to be; every
	/// cycle's output is spliced immediately before it.
	placeholder: Node,
	/// Shallow clone of the anchor, stamped per new item.
	proto: Node,
	/// The anchor's original sibling offset, for ancestors composing
	/// sibling bindings.
	offset: usize,
	/// Identity map of the previous committed cycle. Every entry's chunk is
	/// mounted and not yet unmounted.
	children: HashMap<Key, Child>,
	/// Render node list of the previous committed cycle, in kept order.
	nodes: Vec<Node>,
}

struct Child {
	chunk: Box<dyn TemplateInstance>,
	scope: Scope,
	index: usize,
	node: Node,
}

/// Deferred lifecycle action, recorded during planning and executed only
/// after structural placement. Carrying the render node alongside the key
/// lets execution drop actions whose map entry was overwritten by a
/// duplicate key in the same cycle.
enum Pending {
	Mount { key: Key, node: Node },
	Update { key: Key, node: Node },
}

impl EachBinding {
	/// Swaps the anchor for a placeholder and keeps a clonable prototype of
	/// it; see the factory contract. The anchor must be attached.
	pub(crate) fn create(node: Node, spec: &EachSpec) -> Result<Self, BindError> {
		let parent = node.parent().ok_or(BindError::DetachedTarget { context: "each" })?;
		let placeholder = Node::placeholder();
		let offset = parent.index_of(&node).unwrap_or_default();
		parent.insert_before(&placeholder, Some(&node))?;
		parent.remove_child(&node)?;
		Ok(Self {
			evaluate: Rc::clone(&spec.evaluate),
			condition: spec.condition.clone(),
			get_key: spec.get_key.clone(),
			item_name: spec.item_name.clone(),
			index_name: spec.index_name.clone(),
			template: Rc::clone(&spec.template),
			placeholder,
			proto: node.clone_shallow(),
			offset,
			children: HashMap::new(),
			nodes: Vec::new(),
		})
	}

	/// Sibling offset the loop's output starts at inside its parent.
	#[must_use]
	pub fn offset(&self) -> usize {
		self.offset
	}

	pub fn mount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		self.update(scope, parent_scope)
	}

	pub fn update(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		let span = trace_span!("each_update");
		let _enter = span.enter();

		let collection = (self.evaluate)(scope)?;
		let items = collection_items(collection);
		let Some(parent) = self.placeholder.parent() else {
			error!("The each placeholder is detached; skipping the render cycle.");
			return Ok(());
		};

		let mut new_children: HashMap<Key, Child> = HashMap::with_capacity(items.len());
		let mut batch: Vec<Pending> = Vec::with_capacity(items.len());
		let mut future_nodes: Vec<Node> = Vec::with_capacity(items.len());
		let mut filtered = 0;

		for (i, item) in items.into_iter().enumerate() {
			// Indices are dense over kept items, not source positions.
			let index = i - filtered;
			let context = extend(scope, &self.item_name, self.index_name.as_deref(), index, item);
			let key = match self.get_key.as_deref() {
				Some(get_key) => Key::from_value(&get_key(&context)?),
				None => Key::Index(index),
			};

			if let Some(condition) = self.condition.as_deref() {
				if !truthy(&condition(&context)?) {
					filtered += 1;
					continue;
				}
			}

			// Reuse drains the old map, so whatever remains after this loop
			// is exactly the removed set.
			let child = match self.children.remove(&key) {
				Some(old) => {
					batch.push(Pending::Update {
						key: key.clone(),
						node: old.node.clone(),
					});
					Child {
						chunk: old.chunk,
						scope: context,
						index,
						node: old.node,
					}
				}
				None => {
					let node = self.proto.clone_shallow();
					batch.push(Pending::Mount {
						key: key.clone(),
						node: node.clone(),
					});
					Child {
						chunk: self.template.instantiate(),
						scope: context,
						index,
						node,
					}
				}
			};
			future_nodes.push(child.node.clone());

			match new_children.entry(key) {
				Entry::Occupied(mut occupied) => {
					// Undefined per contract; the earlier instance is dropped
					// without an unmount and its shell stays in the sequence.
					warn!("Duplicate key {:?} within one render cycle; the last occurrence wins.", occupied.key());
					occupied.insert(child);
				}
				Entry::Vacant(vacant) => {
					vacant.insert(child);
				}
			}
		}

		if future_nodes.is_empty() {
			// Degenerate target: no point invoking the differ.
			self.unmount_remaining(parent_scope)?;
		} else {
			let mut stale: HashMap<Node, Child> = self
				.children
				.drain()
				.map(|(_, child)| (child.node.clone(), child))
				.collect();
			let mut failure: Option<BindError> = None;
			{
				let mut on_remove = |node: &Node, _old_index: usize| {
					if failure.is_some() {
						// A failed unmount aborts the cycle; later stale
						// entries are left to their fate (contract: state is
						// undefined after an error).
						return;
					}
					match stale.remove(node) {
						Some(mut child) => {
							if let Err(error) = child.chunk.unmount(&child.scope, parent_scope, true) {
								failure = Some(error);
							}
						}
						None => error!("No stale entry for removed node {:?}; sequence bookkeeping is off.", node),
					}
				};
				splice_node_list(
					&parent,
					&self.nodes,
					&future_nodes,
					SpliceOptions {
						anchor: Some(&self.placeholder),
						on_remove: Some(&mut on_remove),
					},
				);
			}
			if let Some(error) = failure {
				return Err(error);
			}
			debug_assert!(stale.is_empty(), "differ failed to report every removal");
		}

		// Placement has settled; run the deferred lifecycle batch in plan
		// order.
		for pending in batch {
			run_pending(&mut new_children, pending, parent_scope)?;
		}

		self.children = new_children;
		self.nodes = future_nodes;
		Ok(())
	}

	/// Unmounts every live entry and resets to the mount-ready, empty state.
	/// `scope` is unused but kept for lifecycle-signature symmetry.
	pub fn unmount(&mut self, _scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		let span = trace_span!("each_unmount", children = self.children.len());
		let _enter = span.enter();
		self.unmount_remaining(parent_scope)?;
		self.nodes.clear();
		Ok(())
	}

	fn unmount_remaining(&mut self, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		for (_, mut child) in self.children.drain() {
			child.chunk.unmount(&child.scope, parent_scope, true)?;
		}
		Ok(())
	}
}

fn run_pending(children: &mut HashMap<Key, Child>, pending: Pending, parent_scope: Option<&Scope>) -> Result<(), BindError> {
	let (key, node, mounting) = match pending {
		Pending::Mount { key, node } => (key, node, true),
		Pending::Update { key, node } => (key, node, false),
	};
	let Some(child) = children.get_mut(&key) else {
		trace!("Dropping stale action for vanished key {:?}.", key);
		return Ok(());
	};
	if child.node != node {
		trace!("Dropping action for overwritten key {:?}.", key);
		return Ok(());
	}
	let Child { chunk, scope, index, .. } = child;
	if mounting {
		trace!("Mounting item {} under key {:?}.", index, key);
		chunk.mount(&node, scope, parent_scope)
	} else {
		trace!("Updating item {} under key {:?}.", index, key);
		chunk.update(scope, parent_scope)
	}
}

/// Collection coercion: arrays iterate their elements, strings their
/// characters; any falsy value is the empty collection; truthy non-iterables
/// are undefined per contract and resolved to empty here.
fn collection_items(collection: Value) -> Vec<Value> {
	match collection {
		Value::Array(items) => items,
		Value::String(text) => text.chars().map(|c| Value::String(c.into())).collect(),
		other => {
			if truthy(&other) {
				trace!("Treating non-iterable collection {:?} as empty.", other);
			}
			Vec::new()
		}
	}
}
