//! The conditional binding: a mount/unmount toggle around one inner
//! template, driven by a truthiness-coerced expression.

use crate::bindings::{BindError, IfSpec};
use crate::dom::Node;
use crate::scope::{truthy, Evaluator, Scope};
use crate::template::{TemplateDef, TemplateInstance};
use std::rc::Rc;
use tracing::{error, trace_span};

pub struct IfBinding {
	evaluate: Evaluator,
	template: Rc<dyn TemplateDef>,
	/// The shell the template mounts into; kept across toggles so the node
	/// identity is stable for the lifetime of the binding.
	node: Node,
	placeholder: Node,
	chunk: Option<Box<dyn TemplateInstance>>,
	/// `None` until the first evaluation; a first falsy result is a no-op,
	/// not an unmount.
	active: Option<bool>,
}

impl IfBinding {
	pub(crate) fn create(node: Node, spec: &IfSpec) -> Result<Self, BindError> {
		let parent = node.parent().ok_or(BindError::DetachedTarget { context: "if" })?;
		let placeholder = Node::placeholder();
		parent.insert_before(&placeholder, Some(&node))?;
		parent.remove_child(&node)?;
		Ok(Self {
			evaluate: Rc::clone(&spec.evaluate),
			template: Rc::clone(&spec.template),
			node,
			placeholder,
			chunk: None,
			active: None,
		})
	}

	pub fn mount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		self.update(scope, parent_scope)
	}

	pub fn update(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		let span = trace_span!("if_update");
		let _enter = span.enter();

		let value = truthy(&(self.evaluate)(scope)?);
		let was = self.active.unwrap_or(false);

		if value && !was {
			let Some(parent) = self.placeholder.parent() else {
				error!("The if placeholder is detached; skipping the toggle.");
				return Ok(());
			};
			parent.insert_before(&self.node, Some(&self.placeholder))?;
			let mut chunk = self.template.instantiate();
			chunk.mount(&self.node, scope, parent_scope)?;
			self.chunk = Some(chunk);
		} else if !value && was {
			self.teardown(scope, parent_scope)?;
		} else if value {
			if let Some(chunk) = &mut self.chunk {
				chunk.update(scope, parent_scope)?;
			}
		}

		self.active = Some(value);
		Ok(())
	}

	pub fn unmount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		self.teardown(scope, parent_scope)?;
		self.active = Some(false);
		Ok(())
	}

	fn teardown(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		if let Some(mut chunk) = self.chunk.take() {
			chunk.unmount(scope, parent_scope, true)?;
		}
		Ok(())
	}
}
