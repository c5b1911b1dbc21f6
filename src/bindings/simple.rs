//! The expression-only binding: evaluates its expressions against the scope
//! and writes the results into the selected node, never touching structure.

use crate::bindings::{BindError, SimpleSpec};
use crate::dom::Node;
use crate::expr::ExpressionSlot;
use crate::scope::Scope;

pub struct SimpleBinding {
	slots: Vec<ExpressionSlot>,
}

impl SimpleBinding {
	pub(crate) fn create(target: Node, spec: &SimpleSpec) -> Self {
		Self {
			slots: spec
				.expressions
				.iter()
				.map(|expression| ExpressionSlot::new(target.clone(), expression.clone()))
				.collect(),
		}
	}

	pub fn mount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		self.update(scope, parent_scope)
	}

	pub fn update(&mut self, scope: &Scope, _parent_scope: Option<&Scope>) -> Result<(), BindError> {
		for slot in &mut self.slots {
			slot.apply(scope)?;
		}
		Ok(())
	}

	pub fn unmount(&mut self, _scope: &Scope, _parent_scope: Option<&Scope>) -> Result<(), BindError> {
		Ok(())
	}
}
