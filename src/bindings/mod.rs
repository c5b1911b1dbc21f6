//! The binding registry: descriptor types, the dispatch enum and the
//! descriptor-to-binding factory.
//!
//! A binding is a live projection of one scope-derived value (or collection)
//! onto a subtree, with a mount/update/unmount lifecycle. Four kinds exist:
//! `each` (keyed list reconciliation, the interesting one), `if`
//! (conditional toggle), `simple` (expression writes only) and `tag`
//! (dynamic component dispatch).

pub mod cond;
pub mod each;
pub mod simple;
pub mod tag;

pub use cond::IfBinding;
pub use each::EachBinding;
pub use simple::SimpleBinding;
pub use tag::TagBinding;

use crate::dom::{DomError, Node};
use crate::expr::ExprSpec;
use crate::scope::{EvaluationError, Evaluator, Scope};
use crate::template::{Template, TemplateDef, TemplateInstance};
use std::rc::Rc;
use thiserror::Error;

/// Binding-layer failures. Evaluation errors always originate in
/// caller-supplied expressions and abort the in-progress cycle; the
/// remaining variants indicate descriptor/tree mismatches.
#[derive(Debug, Error)]
pub enum BindError {
	#[error(transparent)]
	Evaluation(#[from] EvaluationError),
	#[error(transparent)]
	Dom(#[from] DomError),
	/// No descendant of the binding root carries the selector marker.
	#[error("no descendant of the binding root carries marker {marker:?}")]
	TargetNotFound { marker: String },
	/// A structural binding's anchor node has no parent to anchor against.
	#[error("{context} binding target has no parent node")]
	DetachedTarget { context: &'static str },
}

/// Declarative descriptor for the keyed list binding. Field names follow the
/// compiler-facing descriptor surface.
#[derive(Clone)]
pub struct EachSpec {
	/// Marker attribute locating the anchor node inside the mount root;
	/// `None` binds the mount root itself.
	pub selector: Option<String>,
	/// Collection expression. Required.
	pub evaluate: Evaluator,
	/// Optional filter predicate; items evaluating falsy are excluded.
	pub condition: Option<Evaluator>,
	/// Optional key extractor; positional (post-filter) indices otherwise.
	pub get_key: Option<Evaluator>,
	pub item_name: String,
	pub index_name: Option<String>,
	/// Inner template stamped per item.
	pub template: Rc<dyn TemplateDef>,
}

/// Descriptor for the conditional binding.
#[derive(Clone)]
pub struct IfSpec {
	pub selector: Option<String>,
	pub evaluate: Evaluator,
	pub template: Rc<dyn TemplateDef>,
}

/// Descriptor for the expression-only binding.
#[derive(Clone)]
pub struct SimpleSpec {
	pub selector: Option<String>,
	pub expressions: Vec<ExprSpec>,
}

/// Descriptor for the dynamic-component binding.
#[derive(Clone)]
pub struct TagSpec {
	pub selector: Option<String>,
	/// Component name expression, re-evaluated every cycle.
	pub evaluate: Evaluator,
	pub get_component: ComponentLookup,
	/// Attribute expressions forwarded to the component (or applied directly
	/// in the unregistered fallback).
	pub attributes: Vec<ExprSpec>,
	pub slots: Vec<SlotSpec>,
}

/// A named content projection handed to components; the `"default"` slot
/// doubles as the unregistered-name fallback template.
#[derive(Clone)]
pub struct SlotSpec {
	pub id: String,
	pub template: Rc<Template>,
}

/// What a component constructor receives.
pub struct TagProps {
	pub slots: Vec<SlotSpec>,
	pub attributes: Vec<ExprSpec>,
}

/// Resolves a component name; `None` selects the fallback path.
pub type ComponentLookup = Rc<dyn Fn(&str) -> Option<ComponentCtor>>;
/// Builds a component instance from the forwarded slots and attributes.
pub type ComponentCtor = Rc<dyn Fn(&TagProps) -> Box<dyn TemplateInstance>>;

#[derive(Clone)]
pub enum BindingSpec {
	Each(EachSpec),
	If(IfSpec),
	Simple(SimpleSpec),
	Tag(TagSpec),
}

impl BindingSpec {
	#[must_use]
	pub fn selector(&self) -> Option<&str> {
		match self {
			Self::Each(spec) => spec.selector.as_deref(),
			Self::If(spec) => spec.selector.as_deref(),
			Self::Simple(spec) => spec.selector.as_deref(),
			Self::Tag(spec) => spec.selector.as_deref(),
		}
	}
}

/// A constructed, mount-ready binding.
pub enum Binding {
	Each(EachBinding),
	If(IfBinding),
	Simple(SimpleBinding),
	Tag(TagBinding),
}

impl Binding {
	pub fn mount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		match self {
			Self::Each(binding) => binding.mount(scope, parent_scope),
			Self::If(binding) => binding.mount(scope, parent_scope),
			Self::Simple(binding) => binding.mount(scope, parent_scope),
			Self::Tag(binding) => binding.mount(scope, parent_scope),
		}
	}

	pub fn update(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		match self {
			Self::Each(binding) => binding.update(scope, parent_scope),
			Self::If(binding) => binding.update(scope, parent_scope),
			Self::Simple(binding) => binding.update(scope, parent_scope),
			Self::Tag(binding) => binding.update(scope, parent_scope),
		}
	}

	pub fn unmount(&mut self, scope: &Scope, parent_scope: Option<&Scope>) -> Result<(), BindError> {
		match self {
			Self::Each(binding) => binding.unmount(scope, parent_scope),
			Self::If(binding) => binding.unmount(scope, parent_scope),
			Self::Simple(binding) => binding.unmount(scope, parent_scope),
			Self::Tag(binding) => binding.unmount(scope, parent_scope),
		}
	}
}

/// Builds a binding from its descriptor: resolves the selector marker to the
/// anchor node within `root`, then hands off to the kind's factory. The
/// returned binding is in the mount-ready, empty state.
pub fn create_binding(root: &Node, spec: &BindingSpec) -> Result<Binding, BindError> {
	let target = resolve_target(root, spec.selector())?;
	Ok(match spec {
		BindingSpec::Each(spec) => Binding::Each(EachBinding::create(target, spec)?),
		BindingSpec::If(spec) => Binding::If(IfBinding::create(target, spec)?),
		BindingSpec::Simple(spec) => Binding::Simple(SimpleBinding::create(target, spec)),
		BindingSpec::Tag(spec) => Binding::Tag(TagBinding::create(target, spec)),
	})
}

fn resolve_target(root: &Node, selector: Option<&str>) -> Result<Node, BindError> {
	match selector {
		None => Ok(root.clone()),
		Some(marker) => root
			.find_marked(marker)
			.ok_or_else(|| BindError::TargetNotFound { marker: marker.to_owned() }),
	}
}
