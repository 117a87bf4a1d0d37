#![cfg(target_arch = "wasm32")]
#![allow(dead_code)]

use std::sync::Once;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, Document, Element, HtmlElement, MutationObserver, MutationObserverInit};

static LOG_INITIALIZED: Once = Once::new();

pub fn document() -> Document {
	window().unwrap().document().unwrap()
}

/// Appends a fresh, empty `<div id=…>` to the body and returns its selector along with it.
pub fn container(id: &str) -> (String, Element) {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = document();
	if let Some(stale) = document.get_element_by_id(id) {
		stale.remove();
	}
	let element = document.create_element("div").unwrap();
	element.set_id(id);
	document.body().unwrap().append_child(&element).unwrap();
	(format!("#{}", id), element)
}

pub fn child_element(parent: &Element, index: u32) -> Element {
	let mut child = parent.first_element_child();
	for _ in 0..index {
		child = child.unwrap().next_element_sibling();
	}
	child.unwrap()
}

pub fn click(element: &Element) {
	element.dyn_ref::<HtmlElement>().unwrap().click()
}

/// Records every DOM mutation below a target.
pub struct MutationCounter {
	observer: MutationObserver,
	_callback: Closure<dyn FnMut(JsValue, JsValue)>,
}

impl MutationCounter {
	pub fn observe(target: &Element) -> Self {
		let callback = Closure::wrap(Box::new(|_: JsValue, _: JsValue| ()) as Box<dyn FnMut(JsValue, JsValue)>);
		let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).unwrap();
		let init = MutationObserverInit::new();
		init.set_subtree(true);
		init.set_child_list(true);
		init.set_attributes(true);
		init.set_character_data(true);
		observer.observe_with_options(target, &init).unwrap();
		Self { observer, _callback: callback }
	}

	/// Number of mutation records since the last call.
	pub fn take(&self) -> u32 {
		self.observer.take_records().length()
	}
}

impl Drop for MutationCounter {
	fn drop(&mut self) {
		self.observer.disconnect()
	}
}
