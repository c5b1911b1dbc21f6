//! Layered data scopes and the value/identity model expressions run against.
//!
//! A [`Scope`] is a chain of maps: each layer holds only its own variables and
//! delegates every other lookup to its parent layer. Loop bodies get a child
//! layer per item per cycle (see [`extend`]), so ancestor scopes are never
//! mutated by a binding.

use hashbrown::HashMap;
use std::rc::Rc;
use thiserror::Error;

pub use serde_json::Value;

/// Failure raised by caller-supplied evaluators (collection expressions,
/// filter predicates, key extractors, text/attribute expressions). Never
/// produced by the engine itself; always propagated to the caller of the
/// in-progress lifecycle method, aborting that cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expression evaluation failed: {message}")]
pub struct EvaluationError {
	message: String,
}

impl EvaluationError {
	#[must_use]
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	#[must_use]
	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Shape shared by every caller-supplied expression.
pub type Evaluator = Rc<dyn Fn(&Scope) -> Result<Value, EvaluationError>>;

#[derive(Debug, Clone)]
pub struct Scope(Rc<Layer>);

#[derive(Debug)]
struct Layer {
	vars: HashMap<String, Value>,
	parent: Option<Scope>,
}

impl Scope {
	/// Empty root scope.
	#[must_use]
	pub fn new() -> Self {
		Self(Rc::new(Layer {
			vars: HashMap::new(),
			parent: None,
		}))
	}

	/// Root scope holding the given variables.
	#[must_use]
	pub fn with_vars<K: Into<String>, I: IntoIterator<Item = (K, Value)>>(vars: I) -> Self {
		Self(Rc::new(Layer {
			vars: vars.into_iter().map(|(k, v)| (k.into(), v)).collect(),
			parent: None,
		}))
	}

	/// Child scope layering the given variables over `self`.
	#[must_use]
	pub fn child<K: Into<String>, I: IntoIterator<Item = (K, Value)>>(&self, vars: I) -> Self {
		Self(Rc::new(Layer {
			vars: vars.into_iter().map(|(k, v)| (k.into(), v)).collect(),
			parent: Some(self.clone()),
		}))
	}

	/// Resolves `name` against this layer, then each ancestor in turn.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		match self.0.vars.get(name) {
			Some(value) => Some(value),
			None => self.0.parent.as_ref()?.get(name),
		}
	}
}

impl Default for Scope {
	fn default() -> Self {
		Self::new()
	}
}

/// Layers the loop variables over `parent` without touching it: sets
/// `item_name` to `item` and, when `index_name` is given, the (post-filter)
/// item index. Called once per item per render cycle, unconditionally — the
/// underlying item may have changed in place even when its identity did not.
#[must_use]
pub fn extend(parent: &Scope, item_name: &str, index_name: Option<&str>, index: usize, item: Value) -> Scope {
	let mut vars = HashMap::with_capacity(2);
	vars.insert(item_name.to_owned(), item);
	if let Some(index_name) = index_name {
		vars.insert(index_name.to_owned(), Value::from(index));
	}
	Scope(Rc::new(Layer {
		vars,
		parent: Some(parent.clone()),
	}))
}

/// Source-language truthiness: `null`, `false`, `0`, `NaN` and `""` are
/// false; everything else (including empty arrays and objects) is true.
#[must_use]
pub fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

/// Item identity within the keyed binding, unique per render cycle.
///
/// Positional keys ([`Key::Index`]) are assigned when a descriptor has no key
/// extractor; they make reordering an unkeyed list read as a per-position
/// content update rather than a move.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Index(usize),
	Int(i64),
	Str(String),
	Bool(bool),
	Null,
}

impl Key {
	/// Extracted-key canonicalization. Integers and strings map directly;
	/// non-integer numbers and composite values fall back to their JSON text,
	/// since live-reference identity has no stable analog here.
	#[must_use]
	pub fn from_value(value: &Value) -> Self {
		match value {
			Value::Null => Self::Null,
			Value::Bool(b) => Self::Bool(*b),
			Value::Number(n) => match n.as_i64() {
				Some(i) => Self::Int(i),
				None => Self::Str(n.to_string()),
			},
			Value::String(s) => Self::Str(s.clone()),
			other => Self::Str(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn lookup_falls_back_through_the_chain() {
		let root = Scope::with_vars([("a", json!(1)), ("b", json!(2))]);
		let mid = root.child([("b", json!(20))]);
		let leaf = extend(&mid, "item", Some("i"), 0, json!("x"));

		assert_eq!(leaf.get("item"), Some(&json!("x")));
		assert_eq!(leaf.get("i"), Some(&json!(0)));
		assert_eq!(leaf.get("b"), Some(&json!(20)));
		assert_eq!(leaf.get("a"), Some(&json!(1)));
		assert_eq!(leaf.get("missing"), None);
	}

	#[test]
	fn extend_leaves_the_parent_untouched() {
		let parent = Scope::with_vars([("item", json!("outer"))]);
		let child = extend(&parent, "item", None, 3, json!("inner"));
		assert_eq!(child.get("item"), Some(&json!("inner")));
		assert_eq!(parent.get("item"), Some(&json!("outer")));
		assert_eq!(parent.get("i"), None);
	}

	#[test]
	fn truthiness_matches_the_source_semantics() {
		assert!(!truthy(&json!(null)));
		assert!(!truthy(&json!(false)));
		assert!(!truthy(&json!(0)));
		assert!(!truthy(&json!("")));
		assert!(truthy(&json!("0")));
		assert!(truthy(&json!([])));
		assert!(truthy(&json!({})));
		assert!(truthy(&json!(-1)));
	}

	#[test]
	fn keys_canonicalize() {
		assert_eq!(Key::from_value(&json!(7)), Key::Int(7));
		assert_eq!(Key::from_value(&json!("id-7")), Key::Str("id-7".to_owned()));
		assert_eq!(Key::from_value(&json!(true)), Key::Bool(true));
		assert_eq!(Key::from_value(&json!(null)), Key::Null);
		assert_eq!(Key::from_value(&json!(1.5)), Key::Str("1.5".to_owned()));
	}
}
