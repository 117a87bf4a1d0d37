//! Mounting, updating and replacing a single virtual node position.

use crate::{
	events::{ElementKey, EventDelegation},
	loggable,
	properties::apply_properties,
	vnode::{Child, VirtualNode},
	RenderError,
};
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

/// The concrete DOM behind one rendered position.
#[derive(Debug)]
pub enum LiveNode {
	Element {
		element: web_sys::Element,
		/// Set once the element had event handlers.
		event_key: Option<ElementKey>,
		children: Vec<LiveBinding>,
	},
	Text(web_sys::Text),
	/// A fragment's children live directly in the parent, so a fragment is only the list of their bindings.
	Fragment(Vec<LiveBinding>),
}

/// Links a rendered position to its DOM and to the virtual node it was last rendered from.
#[derive(Debug)]
pub struct LiveBinding {
	pub node: LiveNode,
	pub virtual_node: Child,
}

impl LiveBinding {
	/// The first DOM node of this binding in document order, if it has any.
	#[must_use]
	pub fn first_dom_node(&self) -> Option<web_sys::Node> {
		match &self.node {
			LiveNode::Element { element, .. } => Some(element.clone().into()),
			LiveNode::Text(text) => Some(text.clone().into()),
			LiveNode::Fragment(children) => children.iter().find_map(LiveBinding::first_dom_node),
		}
	}
}

/// What a position looks like, for deciding between update and replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
	Text,
	Fragment,
	Element(&'a str),
}

impl<'a> Shape<'a> {
	#[must_use]
	pub fn of(child: &'a Child) -> Self {
		match child {
			Child::Text(_) => Shape::Text,
			Child::Node(node) => match node.tag() {
				Some(tag) => Shape::Element(tag),
				None => Shape::Fragment,
			},
		}
	}
}

/// State of one reconciliation pass over a root.
pub(crate) struct Reconciler<'a> {
	pub document: &'a web_sys::Document,
	pub events: &'a mut EventDelegation,
}

impl Reconciler<'_> {
	/// Creates the DOM for `child` and inserts it into `parent` before `anchor` (or at the end).
	#[instrument(skip(self, child))]
	pub fn mount(&mut self, child: &Child, parent: &web_sys::Node, anchor: Option<&web_sys::Node>) -> Result<LiveBinding, RenderError> {
		let node = match child {
			Child::Text(text) => {
				let span = trace_span!("Creating text node", text = loggable(text));
				let _enter = span.enter();
				let dom_text = self.document.create_text_node(text);
				parent.insert_before(&dom_text, anchor)?;
				LiveNode::Text(dom_text)
			}
			Child::Node(node) => match node.tag() {
				Some(tag) => {
					let span = trace_span!("Creating element", tag);
					let _enter = span.enter();
					let element = self.document.create_element(tag)?;
					apply_properties(&element, node.properties(), None)?;
					let event_key = self.events.bind(&element, node, None)?;
					// Built while detached, so the subtree is inserted in one operation.
					let children = self.mount_all(node.children(), &element)?;
					parent.insert_before(&element, anchor)?;
					LiveNode::Element { element, event_key, children }
				}
				None => {
					let span = trace_span!("Creating fragment", "children.len()" = node.children().len());
					let _enter = span.enter();
					let fragment = self.document.create_document_fragment();
					let children = self.mount_all(node.children(), &fragment)?;
					parent.insert_before(&fragment, anchor)?;
					LiveNode::Fragment(children)
				}
			},
		};
		Ok(LiveBinding { node, virtual_node: child.clone() })
	}

	fn mount_all(&mut self, children: &[Child], parent: &web_sys::Node) -> Result<Vec<LiveBinding>, RenderError> {
		children.iter().map(|child| self.mount(child, parent, None)).collect()
	}

	/// Brings `binding` up to date with `child` and makes sure it sits right before `anchor` in `parent`.
	///
	/// Falls back to replacing the binding if `child` has a different shape.
	#[instrument(skip(self, binding, child))]
	pub fn update(&mut self, binding: LiveBinding, child: &Child, parent: &web_sys::Node, anchor: Option<&web_sys::Node>) -> Result<LiveBinding, RenderError> {
		if Shape::of(&binding.virtual_node) != Shape::of(child) {
			let span = trace_span!("Replacing", from = ?Shape::of(&binding.virtual_node), to = ?Shape::of(child));
			let _enter = span.enter();
			self.unmount(binding);
			return self.mount(child, parent, anchor);
		}

		let LiveBinding { node, virtual_node } = binding;
		let node = match (node, &virtual_node, child) {
			(LiveNode::Text(dom_text), Child::Text(old), Child::Text(new)) => {
				if old != new {
					trace!(from = loggable(old), to = loggable(new), "Updating text data.");
					dom_text.set_data(new);
				}
				place(parent, &dom_text, anchor)?;
				LiveNode::Text(dom_text)
			}

			(LiveNode::Element { element, event_key, children }, Child::Node(old), Child::Node(new)) => {
				let (event_key, children) = if Rc::ptr_eq(old, new) {
					trace!("Unchanged subtree. Skipping.");
					(event_key, children)
				} else {
					self.update_element(&element, old, new, event_key, children)?
				};
				place(parent, &element, anchor)?;
				LiveNode::Element { element, event_key, children }
			}

			(LiveNode::Fragment(children), Child::Node(_), Child::Node(new)) => LiveNode::Fragment(self.diff_children(children, new.children(), parent, anchor)?),

			(node, _, _) => {
				// Only reachable if a binding and its recorded virtual node disagree.
				self.unbind(&node);
				detach(&node);
				return self.mount(child, parent, anchor);
			}
		};
		Ok(LiveBinding { node, virtual_node: child.clone() })
	}

	fn update_element(
		&mut self,
		element: &web_sys::Element,
		old: &VirtualNode,
		new: &VirtualNode,
		event_key: Option<ElementKey>,
		children: Vec<LiveBinding>,
	) -> Result<(Option<ElementKey>, Vec<LiveBinding>), RenderError> {
		let span = trace_span!("Updating element", tag = new.tag());
		let _enter = span.enter();
		apply_properties(element, new.properties(), Some(old.properties()))?;
		let event_key = self.events.bind(element, new, event_key)?;
		let children = self.diff_children(children, new.children(), element, None)?;
		Ok((event_key, children))
	}

	/// Removes `binding` from the DOM and drops the handler registrations of its whole subtree.
	#[instrument(skip(self, binding))]
	pub fn unmount(&mut self, binding: LiveBinding) {
		self.unbind(&binding.node);
		detach(&binding.node);
	}

	fn unbind(&mut self, node: &LiveNode) {
		match node {
			LiveNode::Element { event_key, children, .. } => {
				if let Some(key) = event_key {
					self.events.purge(key)
				}
				for child in children {
					self.unbind(&child.node)
				}
			}
			LiveNode::Fragment(children) => {
				for child in children {
					self.unbind(&child.node)
				}
			}
			LiveNode::Text(_) => (),
		}
	}
}

/// Descendants go with their element, so only top-level DOM nodes are detached.
fn detach(node: &LiveNode) {
	match node {
		LiveNode::Element { element, .. } => element.remove(),
		LiveNode::Text(text) => text.remove(),
		LiveNode::Fragment(children) => {
			for child in children {
				detach(&child.node)
			}
		}
	}
}

/// Moves `node` before `anchor` in `parent` unless it's already there.
fn place(parent: &web_sys::Node, node: &web_sys::Node, anchor: Option<&web_sys::Node>) -> Result<(), RenderError> {
	if node.next_sibling().as_ref() != anchor || node.parent_node().as_ref() != Some(parent) {
		trace!("Moving node.");
		parent.insert_before(node, anchor)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shapes() {
		let div = Child::from(VirtualNode::element("div"));
		let span = Child::from(VirtualNode::element("span"));
		let fragment = Child::from(VirtualNode::fragment());
		let text = Child::text("div");

		assert_eq!(Shape::of(&div), Shape::Element("div"));
		assert_ne!(Shape::of(&div), Shape::of(&span));
		assert_eq!(Shape::of(&fragment), Shape::Fragment);
		assert_eq!(Shape::of(&text), Shape::Text);
		assert_ne!(Shape::of(&text), Shape::of(&div));
	}
}
