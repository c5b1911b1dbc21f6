//! The dynamic-component binding: resolves a component name expression
//! against a lookup every cycle, forwarding slots and attribute expressions
//! to the constructed instance.
//!
//! An unregistered name falls back to stamping the `"default"` slot template
//! onto the anchor, with the forwarded attribute expressions applied as a
//! plain expression binding — so uncompiled markup still renders.

use crate::bindings::{BindError, BindingSpec, ComponentLookup, SimpleSpec, SlotSpec, TagProps, TagSpec};
use crate::dom::Node;
use crate::expr::ExprSpec;
use crate::scope::{Evaluator, Scope, Value};
use crate::template::{Template, TemplateDef, TemplateInstance};
use tracing::{trace, trace_span};

pub struct TagBinding {
	evaluate: Evaluator,
	get_component: ComponentLookup,
	attributes: Vec<ExprSpec>,
	slots: Vec<SlotSpec>,
	node: Node,
	current: Option<Mounted>,
}

struct Mounted {
	name: String,
	instance: Box<dyn TemplateInstance>,
}

impl TagBinding {
	pub(crate) fn create(target: Node, spec: &TagSpec) -> Self {
		Self {
			evaluate: spec.evaluate.clone(),
			get_component: spec.get_component.clone(),
			attributes: spec.attributes.clone(),
			slots: spec.slots.clone(),
			node: target,
			current: None,
		}
	}

	pub fn mount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		self.update(scope, parent_scope)
	}

	pub fn update(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		let span = trace_span!("tag_update");
		let _enter = span.enter();

		let name = match (self.evaluate)(scope)? {
			Value::String(name) => name,
			other => other.to_string(),
		};

		if let Some(current) = &mut self.current {
			if current.name == name {
				return current.instance.update(scope, parent_scope);
			}
			trace!("Switching component {:?} -> {:?}.", current.name, name);
			// The anchor node survives the swap.
			current.instance.unmount(scope, parent_scope, false)?;
			self.current = None;
		}

		let mut instance = self.resolve(&name);
		instance.mount(&self.node, scope, parent_scope)?;
		self.current = Some(Mounted { name, instance });
		Ok(())
	}

	pub fn unmount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		if let Some(mut mounted) = self.current.take() {
			mounted.instance.unmount(scope, parent_scope, false)?;
		}
		Ok(())
	}

	fn resolve(&self, name: &str) -> Box<dyn TemplateInstance> {
		match (self.get_component)(name) {
			Some(ctor) => ctor(&TagProps {
				slots: self.slots.clone(),
				attributes: self.attributes.clone(),
			}),
			None => {
				trace!("No component registered for {:?}; using the default slot.", name);
				let default_slot = self.slots.iter().find(|slot| slot.id == "default");
				let content = default_slot.and_then(|slot| slot.template.content());
				let mut specs: Vec<BindingSpec> = default_slot.map(|slot| slot.template.specs().to_vec()).unwrap_or_default();
				if !self.attributes.is_empty() {
					specs.push(BindingSpec::Simple(SimpleSpec {
						selector: None,
						expressions: self.attributes.clone(),
					}));
				}
				Template::new(content, specs).instantiate()
			}
		}
	}
}
