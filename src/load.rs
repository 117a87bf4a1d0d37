//! Reads live DOM back into virtual nodes.
//!
//! The result uses the same conventions the patcher writes: `class` becomes `className`, empty boolean attributes
//! become `true`, and the delegation key marker is left out. Handlers and keys can't be recovered.

use crate::{
	properties::BOOLEAN_ATTRIBUTES,
	vnode::{Child, PropValue, Properties, VirtualNode},
	Options,
};
use tracing::trace;
use wasm_bindgen::JsCast;
use web_sys::{Attr, Element, NamedNodeMap, Node, NodeList, Text};

pub fn load_child_nodes(child_nodes: &NodeList, options: &Options) -> Vec<Child> {
	(0..child_nodes.length())
		.filter_map(|i| child_nodes.item(i))
		.filter_map(|child| {
			if let Some(element) = child.dyn_ref::<Element>() {
				Some(load_element(element, options).into())
			} else if let Some(text) = child.dyn_ref::<Text>() {
				Some(Child::Text(text.data().into()))
			} else {
				trace!(node_type = child.node_type(), "Skipping node that isn't an element or text.");
				None
			}
		})
		.collect()
}

pub fn load_element(element: &Element, options: &Options) -> VirtualNode {
	let node: &Node = element.as_ref();
	VirtualNode::element(element.local_name())
		.with_properties(load_attributes(&element.attributes(), options))
		.with_children(load_child_nodes(&node.child_nodes(), options))
}

pub fn load_attributes(attributes: &NamedNodeMap, options: &Options) -> Properties {
	(0..attributes.length())
		.filter_map(|i| attributes.item(i))
		.filter(|attribute| attribute.local_name() != options.key_attribute)
		.map(|attribute| load_attribute(&attribute))
		.collect()
}

pub fn load_attribute(attribute: &Attr) -> (String, PropValue) {
	let name = attribute.local_name();
	let value = attribute.value();
	if name == "class" {
		("className".to_owned(), PropValue::Text(value))
	} else if value.is_empty() && BOOLEAN_ATTRIBUTES.contains(&name.as_str()) {
		(name, PropValue::Bool(true))
	} else {
		(name, PropValue::Text(value))
	}
}
