#![doc(html_root_url = "https://docs.rs/rivet-dom/0.1.0")]
#![warn(clippy::pedantic)]

//! Expression-driven node-tree bindings.
//!
//! A template is a static node skeleton plus declarative binding descriptors;
//! mounting it projects scope data onto a live tree, and each later `update`
//! reconciles the tree against the new scope with as little structural
//! mutation as possible. The centerpiece is the keyed `each` binding, which
//! diffs a collection projection against the previous render while keeping
//! per-item template instances and render nodes stable across reorders.
//!
//! ```
//! use rivet_dom::{
//! 	BindingSpec, EachSpec, Node, Scope, SimpleSpec, Template, TemplateDef,
//! 	TemplateInstance, ExprKind, ExprSpec, Value,
//! };
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! # fn main() -> Result<(), rivet_dom::BindError> {
//! // <ul><li expr0>…</li></ul>, with one text expression per item.
//! let target = Node::element("div");
//! let ul = Node::element("ul");
//! target.append(&ul)?;
//! let li = Node::element("li");
//! li.set_attribute("expr0", "");
//! ul.append(&li)?;
//!
//! let item_template = {
//! 	let content = Node::fragment();
//! 	content.append(&Node::text(""))?;
//! 	Template::new(
//! 		Some(content),
//! 		vec![BindingSpec::Simple(SimpleSpec {
//! 			selector: None,
//! 			expressions: vec![ExprSpec {
//! 				kind: ExprKind::Text { child_index: 0 },
//! 				evaluate: Rc::new(|scope: &Scope| {
//! 					Ok(scope.get("word").cloned().unwrap_or(Value::Null))
//! 				}),
//! 			}],
//! 		})],
//! 	)
//! };
//!
//! let template = Template::new(
//! 	None,
//! 	vec![BindingSpec::Each(EachSpec {
//! 		selector: Some("expr0".to_owned()),
//! 		evaluate: Rc::new(|scope: &Scope| {
//! 			Ok(scope.get("words").cloned().unwrap_or(Value::Null))
//! 		}),
//! 		condition: None,
//! 		get_key: None,
//! 		item_name: "word".to_owned(),
//! 		index_name: None,
//! 		template: item_template,
//! 	})],
//! );
//!
//! let mut chunk = template.instantiate();
//! chunk.mount(&target, &Scope::with_vars([("words", json!(["a", "b"]))]), None)?;
//! assert_eq!(ul.text_content(), "ab");
//!
//! chunk.update(&Scope::with_vars([("words", json!(["a", "b", "c"]))]), None)?;
//! assert_eq!(ul.text_content(), "abc");
//! # Ok(())
//! # }
//! ```

pub mod bindings;
pub mod diff;
pub mod dom;
pub mod expr;
pub mod scope;
pub mod template;

pub use bindings::{
	create_binding, BindError, Binding, BindingSpec, ComponentCtor, ComponentLookup, EachBinding, EachSpec, IfBinding, IfSpec, SimpleBinding, SimpleSpec, SlotSpec, TagBinding, TagProps, TagSpec,
};
pub use dom::{DomError, Node};
pub use expr::{ExprKind, ExprSpec};
pub use scope::{extend, truthy, EvaluationError, Evaluator, Key, Scope, Value};
pub use template::{Template, TemplateChunk, TemplateDef, TemplateInstance};
