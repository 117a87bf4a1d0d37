use std::borrow::Cow;

/// Settings shared by every [`Context`](`crate::context::Context`) of one [`ContextStore`](`crate::context::ContextStore`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// Name of the attribute that marks elements with delegated event handlers.
	///
	/// Its value is the element's [`ElementKey`](`crate::events::ElementKey`).
	pub key_attribute: Cow<'static, str>,

	/// Prefix of generated context ids.
	pub context_id_prefix: Cow<'static, str>,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			key_attribute: Cow::Borrowed("data-e-key"),
			context_id_prefix: Cow::Borrowed("vdom-context-"),
		}
	}
}
