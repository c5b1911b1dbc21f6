//! Template definitions and mounted instances.
//!
//! A [`TemplateDef`] is the cloneable side: it stamps out independent
//! [`TemplateInstance`]s that share only static structure. The concrete
//! [`Template`]/[`TemplateChunk`] pair implements both halves for
//! declarative binding descriptors; the traits are the seam the structural
//! bindings drive, so tests (and component systems) can substitute their own
//! instances.

use crate::bindings::{create_binding, BindError, Binding, BindingSpec};
use crate::dom::Node;
use crate::scope::Scope;
use std::rc::Rc;
use tracing::{trace_span, warn};

/// A mountable/updatable/unmountable unit owning one subtree.
///
/// Contract notes:
/// - `mount` must leave the instance attached under `root` and is called at
///   most once before the matching `unmount`.
/// - `unmount` with `remove_root = true` must also detach the root node it
///   was mounted on; with `false` the root stays where it is (used when a
///   surrounding structure keeps the node alive, e.g. a component swap).
pub trait TemplateInstance {
	fn mount(&mut self, root: &Node, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError>;
	fn update(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError>;
	fn unmount(&mut self, scope: &Scope, parent_scope: Option<&Scope>, remove_root: bool) -> Result<(), BindError>;
}

/// The cloneable template definition: every call stamps a fresh, independent
/// instance.
pub trait TemplateDef {
	fn instantiate(&self) -> Box<dyn TemplateInstance>;
}

/// Declarative template: optional content prototype plus binding descriptors.
///
/// The content node itself is never inserted anywhere — its **children** are
/// deep-cloned into the mount root (use [`Node::fragment`] as the container).
/// `None` means the bindings apply to whatever the instance is mounted on,
/// which is how inner templates of `each` and `tag` descriptors usually work.
pub struct Template {
	content: Option<Node>,
	specs: Rc<[BindingSpec]>,
}

impl Template {
	#[must_use]
	pub fn new(content: Option<Node>, specs: Vec<BindingSpec>) -> Rc<Self> {
		Rc::new(Self {
			content,
			specs: specs.into(),
		})
	}

	pub(crate) fn content(&self) -> Option<Node> {
		self.content.clone()
	}

	pub(crate) fn specs(&self) -> &[BindingSpec] {
		&self.specs
	}
}

impl TemplateDef for Template {
	fn instantiate(&self) -> Box<dyn TemplateInstance> {
		Box::new(TemplateChunk {
			content: self.content.clone(),
			specs: Rc::clone(&self.specs),
			root: None,
			bindings: Vec::new(),
		})
	}
}

/// A live instance stamped from a [`Template`].
pub struct TemplateChunk {
	content: Option<Node>,
	specs: Rc<[BindingSpec]>,
	root: Option<Node>,
	bindings: Vec<Binding>,
}

impl TemplateInstance for TemplateChunk {
	fn mount(&mut self, root: &Node, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		let span = trace_span!("template_mount", specs = self.specs.len());
		let _enter = span.enter();
		if self.root.is_some() {
			warn!("Mounting an already-mounted template chunk; the previous mount leaks.");
		}

		if let Some(content) = &self.content {
			let stamped = content.clone_deep();
			for child in stamped.children() {
				root.append(&child)?;
			}
		}

		// All bindings are constructed before any mounts: structural
		// factories swap their anchors for placeholders, and that must not
		// race the sibling selectors.
		let mut bindings = Vec::with_capacity(self.specs.len());
		for spec in self.specs.iter() {
			bindings.push(create_binding(root, spec)?);
		}
		for binding in &mut bindings {
			binding.mount(scope, parent_scope)?;
		}

		self.root = Some(root.clone());
		self.bindings = bindings;
		Ok(())
	}

	fn update(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		for binding in &mut self.bindings {
			binding.update(scope, parent_scope)?;
		}
		Ok(())
	}

	fn unmount(&mut self, scope: &Scope, parent_scope: Option<&Scope>, remove_root: bool) -> Result<(), BindError> {
		let span = trace_span!("template_unmount", remove_root);
		let _enter = span.enter();
		for binding in &mut self.bindings {
			binding.unmount(scope, parent_scope)?;
		}
		self.bindings.clear();
		if let Some(root) = self.root.take() {
			if self.content.is_some() {
				// Drop what mount stamped so the shell can be remounted.
				root.clear_children();
			}
			if remove_root {
				root.detach();
			}
		}
		Ok(())
	}
}
