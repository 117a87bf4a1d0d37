//! Attribute patching.
//!
//! [`diff_properties`] computes the attribute mutations that take an element from one [`Properties`] map to another,
//! [`apply_properties`] performs them. Rules, in order of precedence:
//!
//! 1. `className` sets the `class` attribute to its literal value.
//! 2. Boolean attributes ([`BOOLEAN_ATTRIBUTES`], or any [`PropValue::Bool`]) are present (as `""`) while truthy and removed otherwise.
//! 3. Event handler names (`on…`) are never attributes. They are handled by [`crate::events`].
//! 4. Everything else is written as its string value.
//! 5. Names that disappeared are removed.
//!
//! `key` is the sibling identity and is not written either.
//! Values that didn't change aren't written again, so re-applying the same map is free.

use crate::{
	loggable,
	vnode::{event_type, PropValue, Properties},
	RenderError,
};
use hashbrown::HashMap;
use std::borrow::Cow;
use tracing::{instrument, trace, warn};

/// Presence-only attributes.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
	"allowfullscreen",
	"async",
	"autofocus",
	"autoplay",
	"checked",
	"controls",
	"default",
	"defer",
	"disabled",
	"formnovalidate",
	"hidden",
	"inert",
	"ismap",
	"itemscope",
	"loop",
	"multiple",
	"muted",
	"nomodule",
	"novalidate",
	"open",
	"playsinline",
	"readonly",
	"required",
	"reversed",
	"selected",
];

/// How a property is reflected on the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
	ClassName,
	Key,
	Boolean,
	/// Carries the native event type.
	EventHandler(String),
	Attribute,
}

/// Reserved-name dispatch for a property with the given value.
#[must_use]
pub fn classify(name: &str, value: &PropValue) -> PropertyKind {
	if name == "className" {
		PropertyKind::ClassName
	} else if name == "key" {
		PropertyKind::Key
	} else if let Some(event_type) = event_type(name) {
		PropertyKind::EventHandler(event_type)
	} else if BOOLEAN_ATTRIBUTES.contains(&name) || matches!(value, PropValue::Bool(_)) {
		PropertyKind::Boolean
	} else {
		PropertyKind::Attribute
	}
}

/// A single attribute mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOp<'a> {
	Set { name: &'a str, value: Cow<'a, str> },
	Remove { name: &'a str },
}

/// Computes the attribute mutations that turn an element rendered from `old` (or a fresh one) into one rendered from `new`.
///
/// Old and new values are compared by the attribute they produce, so a name that switches
/// between a boolean and a string value is rewritten even if the two look alike.
#[must_use]
pub fn diff_properties<'a>(new: &'a Properties, old: Option<&'a Properties>) -> Vec<AttributeOp<'a>> {
	let previous_values: HashMap<&str, &PropValue> = old.map(|old| old.iter().collect()).unwrap_or_default();
	let mut ops = Vec::new();

	for (name, value) in new.iter() {
		match (classify(name, value), value) {
			(PropertyKind::EventHandler(_), PropValue::Handler(_)) => (),
			(PropertyKind::EventHandler(_), _) => warn!("Ignoring non-callable value of event handler property {:?}.", name),
			(PropertyKind::ClassName, PropValue::Handler(_)) | (PropertyKind::Attribute, PropValue::Handler(_)) => {
				warn!("Ignoring event handler stored under non-event property name {:?}.", name)
			}
			_ => (),
		}

		let current = previous_values.get(name).copied().and_then(|previous| rendered(name, previous));
		match (rendered(name, value), current) {
			(Some((attribute, value)), current) => {
				if current.map_or(true, |(_, current)| current != value) {
					ops.push(AttributeOp::Set { name: attribute, value })
				}
			}
			(None, Some((attribute, _))) => ops.push(AttributeOp::Remove { name: attribute }),
			(None, None) => (),
		}
	}

	for (name, value) in old.into_iter().flat_map(Properties::iter) {
		if new.get(name).is_some() {
			continue;
		}
		if let Some((attribute, _)) = rendered(name, value) {
			ops.push(AttributeOp::Remove { name: attribute })
		}
	}

	ops
}

/// The attribute `name: value` is written as, or [`None`] if it leaves the element without one.
fn rendered<'a>(name: &'a str, value: &'a PropValue) -> Option<(&'a str, Cow<'a, str>)> {
	match classify(name, value) {
		PropertyKind::Key | PropertyKind::EventHandler(_) => None,
		PropertyKind::ClassName => Some(("class", value.attribute_value()?)),
		PropertyKind::Boolean if value.is_truthy() => Some((name, Cow::Borrowed(""))),
		PropertyKind::Boolean => None,
		PropertyKind::Attribute => Some((name, value.attribute_value()?)),
	}
}

/// Patches `element`'s attributes from `old` (or nothing, on first mount) to `new`. Children aren't touched.
#[instrument(skip(new, old))]
pub fn apply_properties(element: &web_sys::Element, new: &Properties, old: Option<&Properties>) -> Result<(), RenderError> {
	for op in diff_properties(new, old) {
		match op {
			AttributeOp::Set { name, value } => {
				trace!(attribute = name, value = loggable(&value), "Setting attribute.");
				element.set_attribute(name, &value)?
			}
			AttributeOp::Remove { name } => {
				trace!(attribute = name, "Removing attribute.");
				element.remove_attribute(name)?
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vnode::EventHandler;

	fn props<'a>(entries: impl IntoIterator<Item = (&'a str, PropValue)>) -> Properties {
		entries.into_iter().collect()
	}

	fn set<'a>(name: &'a str, value: &'a str) -> AttributeOp<'a> {
		AttributeOp::Set { name, value: Cow::Borrowed(value) }
	}

	#[test]
	fn classification_precedence() {
		assert_eq!(classify("className", &"a".into()), PropertyKind::ClassName);
		assert_eq!(classify("key", &"a".into()), PropertyKind::Key);
		assert_eq!(classify("onclick", &"a".into()), PropertyKind::EventHandler("click".to_owned()));
		assert_eq!(classify("disabled", &"".into()), PropertyKind::Boolean);
		assert_eq!(classify("data-open", &true.into()), PropertyKind::Boolean);
		assert_eq!(classify("data-open", &"true".into()), PropertyKind::Attribute);
		assert_eq!(classify("made-up", &1.into()), PropertyKind::Attribute);
	}

	#[test]
	fn first_mount_writes_everything_except_reserved_names() {
		let new = props(vec![
			("className", "a b".into()),
			("id", "x".into()),
			("tabindex", 1.into()),
			("disabled", true.into()),
			("checked", false.into()),
			("key", "k".into()),
			("onclick", EventHandler::new(|_, _| ()).into()),
		]);
		assert_eq!(diff_properties(&new, None), [set("class", "a b"), set("id", "x"), set("tabindex", "1"), set("disabled", "")]);
	}

	#[test]
	fn identical_properties_produce_no_ops() {
		let handler = EventHandler::new(|_, _| ());
		let old = props(vec![("className", "a".into()), ("id", "x".into()), ("hidden", true.into()), ("onclick", handler.into())]);
		assert!(diff_properties(&old.clone(), Some(&old)).is_empty());
	}

	#[test]
	fn handler_swap_is_not_an_attribute_change() {
		let old = props(vec![("onclick", EventHandler::new(|_, _| ()).into())]);
		let new = props(vec![("onclick", EventHandler::new(|_, _| ()).into())]);
		assert!(diff_properties(&new, Some(&old)).is_empty());
		assert!(diff_properties(&props(vec![]), Some(&old)).is_empty());
	}

	#[test]
	fn removed_attribute() {
		let old = props(vec![("id", "x".into())]);
		assert_eq!(diff_properties(&props(vec![]), Some(&old)), [AttributeOp::Remove { name: "id" }]);
	}

	#[test]
	fn removed_class_name_removes_class() {
		let old = props(vec![("className", "a".into())]);
		assert_eq!(diff_properties(&props(vec![]), Some(&old)), [AttributeOp::Remove { name: "class" }]);
	}

	#[test]
	fn boolean_toggles_presence_and_never_writes_false() {
		let on = props(vec![("disabled", true.into())]);
		let off = props(vec![("disabled", false.into())]);
		assert_eq!(diff_properties(&on, None), [set("disabled", "")]);
		assert_eq!(diff_properties(&off, Some(&on)), [AttributeOp::Remove { name: "disabled" }]);
		assert!(diff_properties(&off, None).is_empty());
		assert_eq!(diff_properties(&on, Some(&off)), [set("disabled", "")]);
		assert_eq!(diff_properties(&props(vec![]), Some(&on)), [AttributeOp::Remove { name: "disabled" }]);
		assert!(diff_properties(&props(vec![]), Some(&off)).is_empty());
	}

	#[test]
	fn changed_value_is_rewritten() {
		let old = props(vec![("title", "a".into()), ("className", "x".into())]);
		let new = props(vec![("title", "b".into()), ("className", "x".into())]);
		assert_eq!(diff_properties(&new, Some(&old)), [set("title", "b")]);
	}

	#[test]
	fn handler_under_plain_name_is_ignored() {
		let new = props(vec![("callback", EventHandler::new(|_, _| ()).into())]);
		assert!(diff_properties(&new, None).is_empty());
		assert!(diff_properties(&props(vec![]), Some(&new)).is_empty());
	}

	#[test]
	fn switching_between_boolean_and_text_rewrites_the_attribute() {
		let absent = props(vec![("data-x", false.into())]);
		let present = props(vec![("data-x", true.into())]);
		let text_false = props(vec![("data-x", "false".into())]);
		let text_true = props(vec![("data-x", "true".into())]);
		let text_y = props(vec![("data-x", "y".into())]);

		assert_eq!(diff_properties(&text_false, Some(&absent)), [set("data-x", "false")]);
		assert_eq!(diff_properties(&text_true, Some(&present)), [set("data-x", "true")]);
		assert_eq!(diff_properties(&present, Some(&text_y)), [set("data-x", "")]);
		assert_eq!(diff_properties(&absent, Some(&text_y)), [AttributeOp::Remove { name: "data-x" }]);
	}

	#[test]
	fn switching_presence_only_attribute_to_text_keeps_presence() {
		let old = props(vec![("disabled", true.into())]);
		let new = props(vec![("disabled", "yes".into())]);
		assert!(diff_properties(&new, Some(&old)).is_empty());
	}
}
