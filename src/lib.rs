#![doc(html_root_url = "https://docs.rs/reconcile-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A keyed virtual DOM reconciler with per-root event delegation.
//!
//! Describe the page as a tree of [`VirtualNode`]s and render it with [`Context::render`] (or [`ContextStore::render`], or [`App::render`]).
//! The first render for a root selector builds the DOM, later ones patch it in place:
//!
//! - [`properties`] patches attributes,
//! - [`children`] matches children by key or position and moves as little as possible,
//! - [`events`] routes every event type through a single listener on the root element.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod children;
pub mod context;
mod error;
pub mod events;
pub mod load;
pub mod node;
mod options;
pub mod properties;
pub mod vnode;

pub use context::{App, Context, ContextStore, RenderOutcome, RootContext};
pub use error::RenderError;
pub use options::Options;
pub use vnode::{Child, EventHandler, PropValue, Properties, VirtualNode};

/// Text data or attribute values as they may appear in logs.
fn loggable(text: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		text
	} else {
		"<redacted>"
	}
}
