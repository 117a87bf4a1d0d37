//! Per-root event delegation.
//!
//! Each root attaches at most one native listener per event type, no matter how many elements handle it.
//! Elements with handlers are marked with an [`ElementKey`] attribute, and the shared native listener walks up
//! from the event's origin to the nearest marked element, then looks up that element's *current* handler.
//! Swapping a handler between renders is therefore a map assignment, not a DOM listener operation.

use crate::{
	vnode::{EventHandler, VirtualNode},
	Options, RenderError,
};
use hashbrown::{HashMap, HashSet};
use js_sys::Function;
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, error, instrument, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast};

/// Identifies an element with event handlers within one root.
pub type ElementKey = String;

type Listeners = HashMap<ElementKey, HashMap<String, EventHandler>>;

/// Event types that don't bubble. Their root listener captures instead.
const CAPTURED_EVENT_TYPES: &[&str] = &[
	"abort",
	"blur",
	"error",
	"focus",
	"load",
	"loadend",
	"loadstart",
	"mouseenter",
	"mouseleave",
	"pointerenter",
	"pointerleave",
	"progress",
	"scroll",
];

fn uses_capture(event_type: &str) -> bool {
	CAPTURED_EVENT_TYPES.contains(&event_type)
}

/// Walks from `start` through `parent_of` until `key_of` recognises a node, inclusive of `start`.
pub fn nearest_keyed_ancestor<N, K>(start: N, mut parent_of: impl FnMut(&N) -> Option<N>, mut key_of: impl FnMut(&N) -> Option<K>) -> Option<(N, K)> {
	let mut current = Some(start);
	while let Some(node) = current {
		if let Some(key) = key_of(&node) {
			return Some((node, key));
		}
		current = parent_of(&node);
	}
	None
}

/// The delegated listeners and handler registrations of one root element.
///
/// Native listeners are removed from the root when this is dropped.
#[derive(Debug)]
pub struct EventDelegation {
	root: web_sys::Element,
	key_attribute: String,
	delegates: HashSet<String>,
	listeners: Rc<RefCell<Listeners>>,
	common_handler: Closure<dyn Fn(web_sys::Event)>,
	next_key: u64,
}

impl EventDelegation {
	#[must_use]
	#[instrument(skip(options))]
	pub fn new(root: web_sys::Element, options: &Options) -> Self {
		let listeners = Rc::new(RefCell::new(Listeners::new()));
		let key_attribute = options.key_attribute.to_string();
		let common_handler = {
			let root = root.clone();
			let listeners = Rc::clone(&listeners);
			let key_attribute = key_attribute.clone();
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let span = trace_span!("common_handler", event_type = %event.type_());
				let _enter = span.enter();
				dispatch(&root, &listeners, &key_attribute, &event)
			}) as Box<dyn Fn(web_sys::Event)>)
		};

		Self {
			root,
			key_attribute,
			delegates: HashSet::new(),
			listeners,
			common_handler,
			next_key: 0,
		}
	}

	/// Registers the event handlers of `node`, rendered as `element`, replacing the element's previous registrations.
	///
	/// `key` is the element's key from an earlier pass, if it has one. A key is generated and written to the element
	/// the first time it has handlers, and kept afterwards even if the handlers go away.
	///
	/// Returns the element's key.
	#[instrument(skip(self, node))]
	pub fn bind(&mut self, element: &web_sys::Element, node: &VirtualNode, key: Option<ElementKey>) -> Result<Option<ElementKey>, RenderError> {
		let handlers: HashMap<String, EventHandler> = node.properties().event_handlers().map(|(event_type, handler)| (event_type, handler.clone())).collect();

		if handlers.is_empty() {
			if let Some(key) = &key {
				self.purge(key);
			}
			return Ok(key);
		}

		let key = match key {
			Some(key) => key,
			None => {
				let key = self.generate_key();
				element.set_attribute(&self.key_attribute, &key)?;
				key
			}
		};

		for event_type in handlers.keys() {
			self.delegate(event_type)?;
		}
		self.listeners.borrow_mut().insert(key.clone(), handlers);
		Ok(Some(key))
	}

	/// Drops all handler registrations of the element with `key`.
	pub fn purge(&mut self, key: &str) {
		if self.listeners.borrow_mut().remove(key).is_some() {
			trace!(key, "Purged listeners.");
		}
	}

	fn delegate(&mut self, event_type: &str) -> Result<(), RenderError> {
		if self.delegates.contains(event_type) {
			return Ok(());
		}
		self.root
			.add_event_listener_with_callback_and_bool(event_type, self.common_handler.as_ref().unchecked_ref::<Function>(), uses_capture(event_type))?;
		debug!(event_type, capture = uses_capture(event_type), "Attached delegated listener.");
		self.delegates.insert(event_type.to_owned());
		Ok(())
	}

	fn generate_key(&mut self) -> ElementKey {
		let key = format!("e{}", self.next_key);
		self.next_key += 1;
		key
	}

	/// Event types with a native listener on the root.
	pub fn delegated_event_types(&self) -> impl Iterator<Item = &str> {
		self.delegates.iter().map(String::as_str)
	}

	/// Number of elements with at least one registered handler.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// The handler that would currently receive `event_type` events for the element with `key`.
	#[must_use]
	pub fn handler(&self, key: &str, event_type: &str) -> Option<EventHandler> {
		self.listeners.borrow().get(key)?.get(event_type).cloned()
	}
}

impl Drop for EventDelegation {
	fn drop(&mut self) {
		for event_type in &self.delegates {
			if let Err(error) =
				self.root
					.remove_event_listener_with_callback_and_bool(event_type, self.common_handler.as_ref().unchecked_ref::<Function>(), uses_capture(event_type))
			{
				error!("Failed to remove delegated listener {:?}: {:?}", event_type, error)
			}
		}
	}
}

/// Routes `event` to the handler of the nearest element (inside `root`) with registered handlers.
///
/// Events of [captured](`CAPTURED_EVENT_TYPES`) types only reach their target's own handler.
///
/// Handlers are looked up when the event fires and called without holding any borrow,
/// so they may re-render. Whatever they throw propagates into the dispatching JavaScript.
fn dispatch(root: &web_sys::Element, listeners: &RefCell<Listeners>, key_attribute: &str, event: &web_sys::Event) {
	let origin = match event.target().and_then(|target| target.dyn_into::<web_sys::Node>().ok()) {
		Some(origin) => origin,
		None => return trace!("Event target is not a node. Ignoring."),
	};

	// Captured types don't bubble natively, so only their own target may handle them.
	let own_target_only = uses_capture(&event.type_());
	let root: &web_sys::Node = root.as_ref();
	let found = nearest_keyed_ancestor(
		origin,
		|node| if own_target_only || node == root { None } else { node.parent_node() },
		|node| {
			let key = node.dyn_ref::<web_sys::Element>()?.get_attribute(key_attribute)?;
			if listeners.borrow().contains_key(&key) {
				Some(key)
			} else {
				None
			}
		},
	);

	let (element, key) = match found {
		Some(found) => found,
		None => return trace!("No delegate found. Ignoring."),
	};

	let handler = listeners.borrow().get(&key).and_then(|by_type| by_type.get(&event.type_())).cloned();
	match handler {
		Some(handler) => {
			let element: web_sys::Element = element.unchecked_into();
			handler.call(event, &element)
		}
		None => trace!(key = %key, "Delegate has no handler for this event type. Ignoring."),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// Index-based toy tree: `parents[i]` is the parent of node `i`.
	fn walk(parents: &[Option<usize>], keys: &[Option<&'static str>], start: usize) -> Option<(usize, &'static str)> {
		nearest_keyed_ancestor(start, |&node| parents[node], |&node| keys[node])
	}

	#[test]
	fn start_node_is_inclusive() {
		assert_eq!(walk(&[None, Some(0)], &[Some("root"), Some("own")], 1), Some((1, "own")));
	}

	#[test]
	fn nearest_wins() {
		let parents = [None, Some(0), Some(1), Some(2)];
		let keys = [Some("outer"), Some("inner"), None, None];
		assert_eq!(walk(&parents, &keys, 3), Some((1, "inner")));
	}

	#[test]
	fn unkeyed_chain_finds_nothing() {
		assert_eq!(walk(&[None, Some(0), Some(1)], &[None, None, None], 2), None);
	}

	#[test]
	fn walk_stops_where_parent_of_stops() {
		let parents = [None, Some(0), Some(1)];
		let keys = [Some("beyond root"), None, None];
		let found = nearest_keyed_ancestor(2, |&node| if node == 1 { None } else { parents[node] }, |&node| keys[node]);
		assert_eq!(found, None);
	}

	#[test]
	fn non_bubbling_events_capture() {
		assert!(uses_capture("focus"));
		assert!(uses_capture("mouseenter"));
		assert!(!uses_capture("click"));
		assert!(!uses_capture("input"));
	}
}
