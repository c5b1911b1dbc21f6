//! The expression layer shared by the simple and tag bindings: declarative
//! writes of evaluated values into text nodes and attributes.
//!
//! Every slot caches the last value it wrote and skips the write when a
//! re-evaluation produces the same value, so repeated updates with unchanged
//! data do not touch the tree.

use crate::bindings::BindError;
use crate::dom::Node;
use crate::scope::{Evaluator, Scope, Value};
use tracing::warn;

/// Where an expression writes.
#[derive(Debug, Clone)]
pub enum ExprKind {
	/// Replaces the text of the target's child node at `child_index`.
	Text { child_index: usize },
	/// Sets (or removes) the named attribute on the target.
	Attribute { name: String },
}

/// One declarative expression of a binding descriptor.
#[derive(Clone)]
pub struct ExprSpec {
	pub kind: ExprKind,
	pub evaluate: Evaluator,
}

/// A spec bound to its live target node, plus the last written value.
pub(crate) struct ExpressionSlot {
	spec: ExprSpec,
	node: Node,
	last: Option<Value>,
}

impl ExpressionSlot {
	pub(crate) fn new(node: Node, spec: ExprSpec) -> Self {
		Self { spec, node, last: None }
	}

	pub(crate) fn apply(&mut self, scope: &Scope) -> Result<(), BindError> {
		let value = (self.spec.evaluate)(scope)?;
		if self.last.as_ref() == Some(&value) {
			return Ok(());
		}
		match &self.spec.kind {
			ExprKind::Text { child_index } => match self.node.child(*child_index) {
				Some(child) => child.set_text(&text_of(&value)),
				None => warn!("No child at index {} for a text expression on {:?}.", child_index, self.node),
			},
			ExprKind::Attribute { name } => match attribute_of(&value, name) {
				Some(rendered) => self.node.set_attribute(name, &rendered),
				None => self.node.remove_attribute(name),
			},
		}
		self.last = Some(value);
		Ok(())
	}
}

/// Text rendering: `null` disappears, strings pass through unquoted,
/// everything else renders as its JSON text.
fn text_of(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Attribute rendering: `null` and `false` remove the attribute, `true`
/// writes the attribute's own name, everything else its text form.
fn attribute_of(value: &Value, name: &str) -> Option<String> {
	match value {
		Value::Null | Value::Bool(false) => None,
		Value::Bool(true) => Some(name.to_owned()),
		other => Some(text_of(other)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::rc::Rc;

	fn slot_on(node: &Node, kind: ExprKind, var: &'static str) -> ExpressionSlot {
		ExpressionSlot::new(
			node.clone(),
			ExprSpec {
				kind,
				evaluate: Rc::new(move |scope: &Scope| Ok(scope.get(var).cloned().unwrap_or(Value::Null))),
			},
		)
	}

	#[test]
	fn text_writes_and_caches() {
		let p = Node::element("p");
		p.append(&Node::text("")).unwrap();
		let mut slot = slot_on(&p, ExprKind::Text { child_index: 0 }, "text");

		slot.apply(&Scope::with_vars([("text", json!("hello"))])).unwrap();
		assert_eq!(p.text_content(), "hello");

		// Same value again: nothing is rewritten (the cache short-circuits).
		slot.apply(&Scope::with_vars([("text", json!("hello"))])).unwrap();
		assert_eq!(p.text_content(), "hello");

		slot.apply(&Scope::with_vars([("text", json!(42))])).unwrap();
		assert_eq!(p.text_content(), "42");
	}

	#[test]
	fn attribute_truth_table() {
		let b = Node::element("b");
		let mut slot = slot_on(&b, ExprKind::Attribute { name: "hidden".to_owned() }, "v");

		slot.apply(&Scope::with_vars([("v", json!("x"))])).unwrap();
		assert_eq!(b.attribute("hidden").as_deref(), Some("x"));

		slot.apply(&Scope::with_vars([("v", json!(true))])).unwrap();
		assert_eq!(b.attribute("hidden").as_deref(), Some("hidden"));

		slot.apply(&Scope::with_vars([("v", json!(false))])).unwrap();
		assert_eq!(b.attribute("hidden"), None);

		slot.apply(&Scope::with_vars([("v", json!(null))])).unwrap();
		assert_eq!(b.attribute("hidden"), None);
	}
}
