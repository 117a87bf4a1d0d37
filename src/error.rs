use thiserror::Error;
use wasm_bindgen::JsValue;

/// Everything that can make a render pass fail.
///
/// Failures are never recovered from locally. A root whose pass failed is discarded,
/// so the next render for the same selector starts over with an initial mount.
#[derive(Debug, Error)]
pub enum RenderError {
	/// The root selector matched no element.
	#[error("no element matches root selector {0:?}")]
	MissingMountTarget(String),

	#[error("no document is available in this environment")]
	NoDocument,

	#[error("unknown context {0:?}")]
	UnknownContext(String),

	/// A native DOM call threw, for example because of an invalid tag or attribute name.
	#[error("DOM operation failed: {0:?}")]
	Dom(JsValue),

	/// Re-entrant renders kept requesting further passes.
	#[error("render storm: {0} deferred passes were requested by a single render call")]
	RenderStorm(usize),

	/// The store was accessed while a render pass was running.
	#[error("the context store is busy rendering")]
	Busy,
}

impl From<JsValue> for RenderError {
	fn from(value: JsValue) -> Self {
		Self::Dom(value)
	}
}

impl From<RenderError> for JsValue {
	fn from(error: RenderError) -> Self {
		match error {
			RenderError::Dom(value) => value,
			other => js_sys::Error::new(&other.to_string()).into(),
		}
	}
}
