//! Immutable descriptions of DOM subtrees.
//!
//! A [`VirtualNode`] with a tag describes an element, one without a tag is a fragment whose children render
//! directly into the parent. Text leaves are plain strings ([`Child::Text`]).
//!
//! Children are held behind [`Rc`], so keeping the last rendered tree around for the next pass is cheap,
//! and re-using the same [`Rc`] for an unchanged subtree lets the reconciler skip it entirely.

use core::{
	fmt::{self, Debug, Formatter},
	iter::FromIterator,
};
use std::{borrow::Cow, rc::Rc};

/// A user-supplied event callback.
///
/// It receives the native event and the element the handler was registered on
/// (which is not necessarily the event's target, since dispatch walks up from there).
///
/// Two handlers are equal only if they are clones of the same [`EventHandler`].
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&web_sys::Event, &web_sys::Element)>);

impl EventHandler {
	pub fn new(handler: impl 'static + Fn(&web_sys::Event, &web_sys::Element)) -> Self {
		Self(Rc::new(handler))
	}

	/// Invokes the callback. Panics and exceptions are not caught.
	pub fn call(&self, event: &web_sys::Event, element: &web_sys::Element) {
		(self.0)(event, element)
	}
}

impl PartialEq for EventHandler {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for EventHandler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
	}
}

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
	Text(String),
	Number(f64),
	Bool(bool),
	Handler(EventHandler),
}

impl PropValue {
	/// Whether a boolean attribute with this value is present.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			PropValue::Text(text) => !text.is_empty(),
			PropValue::Number(number) => *number != 0.0 && !number.is_nan(),
			PropValue::Bool(value) => *value,
			PropValue::Handler(_) => true,
		}
	}

	/// The attribute value this property is written as, or [`None`] for handlers.
	#[must_use]
	pub fn attribute_value(&self) -> Option<Cow<'_, str>> {
		match self {
			PropValue::Text(text) => Some(Cow::Borrowed(text)),
			PropValue::Number(number) => Some(Cow::Owned(format_number(*number))),
			PropValue::Bool(value) => Some(Cow::Borrowed(if *value { "true" } else { "false" })),
			PropValue::Handler(_) => None,
		}
	}
}

/// Formats a number the way JavaScript's `String(number)` does for the common cases.
fn format_number(number: f64) -> String {
	if number.is_nan() {
		"NaN".to_owned()
	} else if number == f64::INFINITY {
		"Infinity".to_owned()
	} else if number == f64::NEG_INFINITY {
		"-Infinity".to_owned()
	} else {
		number.to_string()
	}
}

impl From<&str> for PropValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<String> for PropValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<f64> for PropValue {
	fn from(number: f64) -> Self {
		Self::Number(number)
	}
}

impl From<i32> for PropValue {
	fn from(number: i32) -> Self {
		Self::Number(number.into())
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<EventHandler> for PropValue {
	fn from(handler: EventHandler) -> Self {
		Self::Handler(handler)
	}
}

/// Derives the native event type from an event handler property name: `onClick` → `click`.
///
/// Returns [`None`] for names that aren't event handler names.
#[must_use]
pub fn event_type(name: &str) -> Option<String> {
	match name.strip_prefix("on") {
		Some(rest) if !rest.is_empty() => Some(rest.to_ascii_lowercase()),
		_ => None,
	}
}

/// An ordered property map. Inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, PropValue)>);

impl Properties {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
		let name = name.into();
		let value = value.into();
		match self.0.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, slot)) => *slot = value,
			None => self.0.push((name, value)),
		}
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&PropValue> {
		self.0.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// `(event type, handler)` for each event handler property.
	pub fn event_handlers(&self) -> impl Iterator<Item = (String, &EventHandler)> {
		self.0.iter().filter_map(|(name, value)| match value {
			PropValue::Handler(handler) => event_type(name).map(|event_type| (event_type, handler)),
			_ => None,
		})
	}
}

impl<N: Into<String>, V: Into<PropValue>> FromIterator<(N, V)> for Properties {
	fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
		let mut properties = Self::new();
		for (name, value) in iter {
			properties.insert(name, value);
		}
		properties
	}
}

/// Description of an element (with a tag) or a fragment (without one).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualNode {
	tag: Option<String>,
	properties: Properties,
	children: Vec<Child>,
}

impl VirtualNode {
	#[must_use]
	pub fn element(tag: impl Into<String>) -> Self {
		Self {
			tag: Some(tag.into()),
			..Self::default()
		}
	}

	#[must_use]
	pub fn fragment() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
		self.properties.insert(name, value);
		self
	}

	#[must_use]
	pub fn with_properties(mut self, properties: Properties) -> Self {
		self.properties = properties;
		self
	}

	#[must_use]
	pub fn with_key(self, key: impl Into<String>) -> Self {
		self.with_property("key", key.into())
	}

	/// Adds an event handler property, e.g. `.on("click", …)` for `onclick`.
	#[must_use]
	pub fn on(self, event_type: &str, handler: impl 'static + Fn(&web_sys::Event, &web_sys::Element)) -> Self {
		self.with_property(format!("on{}", event_type), EventHandler::new(handler))
	}

	#[must_use]
	pub fn with_child(mut self, child: impl Into<Child>) -> Self {
		self.children.push(child.into());
		self
	}

	#[must_use]
	pub fn with_children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
		self.children.extend(children.into_iter().map(Into::into));
		self
	}

	/// [`None`] for fragments.
	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		self.tag.as_deref()
	}

	#[must_use]
	pub fn properties(&self) -> &Properties {
		&self.properties
	}

	#[must_use]
	pub fn children(&self) -> &[Child] {
		&self.children
	}

	/// The node's identity among its siblings, taken from the `key` property.
	#[must_use]
	pub fn key(&self) -> Option<Cow<'_, str>> {
		match self.properties.get("key")? {
			PropValue::Handler(_) => None,
			value => value.attribute_value(),
		}
	}

	#[must_use]
	pub fn has_event_handlers(&self) -> bool {
		self.properties.event_handlers().next().is_some()
	}
}

/// One entry of a children list.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
	Node(Rc<VirtualNode>),
	Text(Rc<str>),
}

impl Child {
	#[must_use]
	pub fn text(text: &str) -> Self {
		Self::Text(text.into())
	}

	#[must_use]
	pub fn key(&self) -> Option<Cow<'_, str>> {
		match self {
			Child::Node(node) => node.key(),
			Child::Text(_) => None,
		}
	}
}

impl From<VirtualNode> for Child {
	fn from(node: VirtualNode) -> Self {
		Self::Node(Rc::new(node))
	}
}

impl From<Rc<VirtualNode>> for Child {
	fn from(node: Rc<VirtualNode>) -> Self {
		Self::Node(node)
	}
}

impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Self::Text(text.into())
	}
}

impl From<String> for Child {
	fn from(text: String) -> Self {
		Self::Text(text.into())
	}
}
