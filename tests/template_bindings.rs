//! Behavior of the simple, if and tag bindings through the template surface,
//! mirroring the descriptor shapes the compiler emits.

use rivet_dom::{
	BindError, BindingSpec, ComponentCtor, ComponentLookup, EachSpec, EvaluationError, Evaluator, ExprKind,
	ExprSpec, IfSpec, Node, Scope, SimpleSpec, SlotSpec, TagSpec, Template, TemplateDef, TemplateInstance, Value,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn ev<F: Fn(&Scope) -> Result<Value, EvaluationError> + 'static>(f: F) -> Evaluator {
	Rc::new(f)
}

fn var(name: &'static str) -> Evaluator {
	ev(move |scope| Ok(scope.get(name).cloned().unwrap_or(Value::Null)))
}

/// `<p expr0><!----></p>` with a text and an attribute expression.
fn simple_template() -> Rc<Template> {
	let content = Node::fragment();
	let p = Node::element("p");
	p.set_attribute("expr0", "");
	p.append(&Node::text("")).unwrap();
	content.append(&p).unwrap();
	Template::new(
		Some(content),
		vec![BindingSpec::Simple(SimpleSpec {
			selector: Some("expr0".to_owned()),
			expressions: vec![
				ExprSpec {
					kind: ExprKind::Text { child_index: 0 },
					evaluate: var("text"),
				},
				ExprSpec {
					kind: ExprKind::Attribute { name: "class".to_owned() },
					evaluate: var("class"),
				},
			],
		})],
	)
}

#[test]
fn simple_binding_evaluates_without_touching_structure() {
	init_tracing();
	let target = Node::element("div");
	let mut chunk = simple_template().instantiate();
	chunk
		.mount(&target, &Scope::with_vars([("text", json!("hello")), ("class", json!("foo"))]), None)
		.unwrap();

	let p = target.find_element("p").unwrap();
	assert_eq!(p.text_content(), "hello");
	assert_eq!(p.attribute("class").as_deref(), Some("foo"));
	assert_eq!(target.child_count(), 1);
}

#[test]
fn simple_binding_updates_in_place() {
	init_tracing();
	let target = Node::element("div");
	let mut chunk = simple_template().instantiate();
	chunk
		.mount(&target, &Scope::with_vars([("text", json!("hello")), ("class", json!("foo"))]), None)
		.unwrap();
	let p = target.find_element("p").unwrap();

	chunk
		.update(&Scope::with_vars([("text", json!("world")), ("class", json!("bar"))]), None)
		.unwrap();
	assert_eq!(p.text_content(), "world");
	assert_eq!(p.attribute("class").as_deref(), Some("bar"));
	assert_eq!(target.find_element("p").unwrap(), p, "the node was reused, not replaced");
}

#[test]
fn if_binding_toggles_mounting() {
	init_tracing();
	let parent = Node::element("div");
	let shell = Node::element("p");
	parent.append(&shell).unwrap();

	let inner = {
		let content = Node::fragment();
		content.append(&Node::text("")).unwrap();
		Template::new(
			Some(content),
			vec![BindingSpec::Simple(SimpleSpec {
				selector: None,
				expressions: vec![ExprSpec {
					kind: ExprKind::Text { child_index: 0 },
					evaluate: var("text"),
				}],
			})],
		)
	};
	let spec = BindingSpec::If(IfSpec {
		selector: None,
		evaluate: var("show"),
		template: inner,
	});
	let mut binding = rivet_dom::create_binding(&shell, &spec).unwrap();

	// First falsy evaluation: nothing but the placeholder.
	binding
		.mount(&Scope::with_vars([("show", json!(false)), ("text", json!("hi"))]), None)
		.unwrap();
	assert_eq!(parent.child_count(), 1);
	assert!(shell.parent().is_none());

	binding
		.update(&Scope::with_vars([("show", json!(true)), ("text", json!("hi"))]), None)
		.unwrap();
	assert_eq!(shell.parent(), Some(parent.clone()));
	assert_eq!(shell.text_content(), "hi");

	// Truthy -> truthy updates in place.
	binding
		.update(&Scope::with_vars([("show", json!(true)), ("text", json!("bye"))]), None)
		.unwrap();
	assert_eq!(shell.text_content(), "bye");

	binding
		.update(&Scope::with_vars([("show", json!(false)), ("text", json!("bye"))]), None)
		.unwrap();
	assert!(shell.parent().is_none());

	// Remounting stamps fresh content into the reused shell.
	binding
		.update(&Scope::with_vars([("show", json!(true)), ("text", json!("again"))]), None)
		.unwrap();
	assert_eq!(shell.text_content(), "again");
	assert_eq!(shell.child_count(), 1);
}

fn no_component() -> ComponentLookup {
	Rc::new(|_: &str| None)
}

#[test]
fn unregistered_tags_fall_back_to_the_default_slot() {
	init_tracing();
	let target = Node::element("section");
	let host = Node::element("div");
	target.append(&host).unwrap();

	let slot_template = {
		let content = Node::fragment();
		let p = Node::element("p");
		p.set_attribute("expr1", "");
		p.append(&Node::text("")).unwrap();
		content.append(&p).unwrap();
		Template::new(
			Some(content),
			vec![BindingSpec::Simple(SimpleSpec {
				selector: Some("expr1".to_owned()),
				expressions: vec![ExprSpec {
					kind: ExprKind::Text { child_index: 0 },
					evaluate: var("text"),
				}],
			})],
		)
	};
	let spec = BindingSpec::Tag(TagSpec {
		selector: None,
		evaluate: ev(|_| Ok(json!("my-tag"))),
		get_component: no_component(),
		attributes: Vec::new(),
		slots: vec![SlotSpec {
			id: "default".to_owned(),
			template: slot_template,
		}],
	});
	let mut binding = rivet_dom::create_binding(&host, &spec).unwrap();
	binding.mount(&Scope::with_vars([("text", json!("hello"))]), None).unwrap();

	let p = target.find_element("p").unwrap();
	assert_eq!(p.text_content(), "hello");
}

#[test]
fn unregistered_tag_attributes_become_expressions() {
	init_tracing();
	let target = Node::element("section");
	let host = Node::element("b");
	target.append(&host).unwrap();

	let spec = BindingSpec::Tag(TagSpec {
		selector: None,
		evaluate: ev(|_| Ok(json!("my-tag"))),
		get_component: no_component(),
		attributes: vec![ExprSpec {
			kind: ExprKind::Attribute { name: "class".to_owned() },
			evaluate: var("class"),
		}],
		slots: Vec::new(),
	});
	let mut binding = rivet_dom::create_binding(&host, &spec).unwrap();
	binding.mount(&Scope::with_vars([("class", json!("hello"))]), None).unwrap();

	assert_eq!(host.attribute("class").as_deref(), Some("hello"));
}

struct SpyComponent {
	mounts: Rc<RefCell<usize>>,
	unmounts: Rc<RefCell<usize>>,
	expect_tag: &'static str,
}

impl TemplateInstance for SpyComponent {
	fn mount(&mut self, root: &Node, _scope: &Scope, _parent_scope: Option<&Scope>) -> Result<(), BindError> {
		assert_eq!(root.tag(), Some(self.expect_tag));
		*self.mounts.borrow_mut() += 1;
		Ok(())
	}

	fn update(&mut self, _scope: &Scope, _parent_scope: Option<&Scope>) -> Result<(), BindError> {
		Ok(())
	}

	fn unmount(&mut self, _scope: &Scope, _parent_scope: Option<&Scope>, _remove_root: bool) -> Result<(), BindError> {
		*self.unmounts.borrow_mut() += 1;
		Ok(())
	}
}

fn spy_lookup(mounts: &Rc<RefCell<usize>>, unmounts: &Rc<RefCell<usize>>, expect_tag: &'static str) -> ComponentLookup {
	let mounts = Rc::clone(mounts);
	let unmounts = Rc::clone(unmounts);
	Rc::new(move |name: &str| {
		if !name.starts_with("my-tag") {
			return None;
		}
		let mounts = Rc::clone(&mounts);
		let unmounts = Rc::clone(&unmounts);
		Some(Rc::new(move |_props: &rivet_dom::TagProps| {
			Box::new(SpyComponent {
				mounts: Rc::clone(&mounts),
				unmounts: Rc::clone(&unmounts),
				expect_tag,
			}) as Box<dyn TemplateInstance>
		}) as ComponentCtor)
	})
}

#[test]
fn switching_component_names_remounts() {
	init_tracing();
	let target = Node::element("section");
	let host = Node::element("b");
	target.append(&host).unwrap();

	let mounts = Rc::new(RefCell::new(0));
	let unmounts = Rc::new(RefCell::new(0));
	let spec = BindingSpec::Tag(TagSpec {
		selector: None,
		evaluate: var("tagName"),
		get_component: spy_lookup(&mounts, &unmounts, "b"),
		attributes: Vec::new(),
		slots: Vec::new(),
	});
	let mut binding = rivet_dom::create_binding(&host, &spec).unwrap();

	binding.mount(&Scope::with_vars([("tagName", json!("my-tag-1"))]), None).unwrap();
	assert_eq!((*mounts.borrow(), *unmounts.borrow()), (1, 0));

	binding.update(&Scope::with_vars([("tagName", json!("my-tag-2"))]), None).unwrap();
	assert_eq!((*mounts.borrow(), *unmounts.borrow()), (2, 1));

	// Same name again: update, not remount.
	binding.update(&Scope::with_vars([("tagName", json!("my-tag-2"))]), None).unwrap();
	assert_eq!((*mounts.borrow(), *unmounts.borrow()), (2, 1));

	binding.unmount(&Scope::new(), None).unwrap();
	assert_eq!((*mounts.borrow(), *unmounts.borrow()), (2, 2));
	assert_eq!(host.parent(), Some(target), "the anchor node survives component teardown");
}

#[test]
fn components_mount_inside_each_bindings() {
	init_tracing();
	let target = Node::element("div");
	let ul = Node::element("ul");
	target.append(&ul).unwrap();
	let li = Node::element("li");
	li.set_attribute("expr0", "");
	ul.append(&li).unwrap();

	let mounts = Rc::new(RefCell::new(0));
	let unmounts = Rc::new(RefCell::new(0));
	let inner = Template::new(
		None,
		vec![BindingSpec::Tag(TagSpec {
			selector: None,
			evaluate: ev(|_| Ok(json!("my-tag"))),
			get_component: spy_lookup(&mounts, &unmounts, "li"),
			attributes: Vec::new(),
			slots: Vec::new(),
		})],
	);
	let template = Template::new(
		None,
		vec![BindingSpec::Each(EachSpec {
			selector: Some("expr0".to_owned()),
			evaluate: var("items"),
			condition: None,
			get_key: None,
			item_name: "val".to_owned(),
			index_name: None,
			template: inner,
		})],
	);

	let mut chunk = template.instantiate();
	chunk.mount(&target, &Scope::with_vars([("items", json!([1, 2]))]), None).unwrap();
	assert_eq!(*mounts.borrow(), 2, "one component per item, mounted on the stamped shell");

	chunk.update(&Scope::with_vars([("items", json!([1]))]), None).unwrap();
	assert_eq!(*unmounts.borrow(), 1);
}
