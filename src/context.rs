//! Registries that remember what was last rendered where.
//!
//! A [`ContextStore`] owns any number of independent [`Context`]s, each of which owns one [`RootContext`] per root selector.
//! [`App`] is a shareable handle around a store for callers (like event handlers) that need to trigger renders themselves.

use crate::{
	events::EventDelegation,
	node::{LiveBinding, Reconciler},
	vnode::Child,
	Options, RenderError,
};
use core::{mem, slice};
use hashbrown::{hash_map::Entry, HashMap};
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, instrument, level_filters::STATIC_MAX_LEVEL, trace, warn, Level};

/// Everything one mount target needs between passes: its container, its live tree and its event delegation.
#[derive(Debug)]
pub struct RootContext {
	container: web_sys::Element,
	bindings: Vec<LiveBinding>,
	events: EventDelegation,
}

impl RootContext {
	/// The element matched by the root selector.
	#[must_use]
	pub fn container(&self) -> &web_sys::Element {
		&self.container
	}

	/// The live tree from the last pass.
	#[must_use]
	pub fn bindings(&self) -> &[LiveBinding] {
		&self.bindings
	}

	#[must_use]
	pub fn events(&self) -> &EventDelegation {
		&self.events
	}

	#[instrument(skip(self, tree))]
	fn update(mut self, tree: &Child) -> Result<Self, RenderError> {
		let document = self.container.owner_document().ok_or(RenderError::NoDocument)?;
		let old = mem::take(&mut self.bindings);
		let mut reconciler = Reconciler {
			document: &document,
			events: &mut self.events,
		};
		self.bindings = reconciler.diff_children(old, slice::from_ref(tree), &self.container, None)?;
		Ok(self)
	}

	/// Initial mount: the container is emptied, then the whole tree is built without diffing.
	#[instrument(skip(tree, options))]
	fn mount(tree: &Child, root_selector: &str, options: &Options) -> Result<Self, RenderError> {
		let document = web_sys::window().and_then(|window| window.document()).ok_or(RenderError::NoDocument)?;
		let container = document
			.query_selector(root_selector)?
			.ok_or_else(|| RenderError::MissingMountTarget(root_selector.to_owned()))?;
		container.set_text_content(None);

		let mut events = EventDelegation::new(container.clone(), options);
		let binding = Reconciler {
			document: &document,
			events: &mut events,
		}
		.mount(tree, &container, None)?;

		Ok(Self {
			container,
			bindings: vec![binding],
			events,
		})
	}
}

/// One logical application: a set of roots sharing [`Options`].
#[derive(Debug)]
pub struct Context {
	id: String,
	options: Options,
	roots: HashMap<String, RootContext>,
}

impl Context {
	#[must_use]
	pub fn new(id: impl Into<String>, options: Options) -> Self {
		Self {
			id: id.into(),
			options,
			roots: HashMap::new(),
		}
	}

	#[must_use]
	pub fn id(&self) -> &str {
		&self.id
	}

	#[must_use]
	pub fn root(&self, root_selector: &str) -> Option<&RootContext> {
		self.roots.get(root_selector)
	}

	pub fn roots(&self) -> impl Iterator<Item = (&str, &RootContext)> {
		self.roots.iter().map(|(selector, root)| (selector.as_str(), root))
	}

	/// Renders `tree` into the element selected by `root_selector`.
	///
	/// The first render for a selector mounts from scratch, later ones reconcile against the previous tree.
	/// Runs synchronously to completion.
	///
	/// # Errors
	///
	/// If the selector matches nothing or a DOM operation throws. The root is forgotten in that case,
	/// so the next render for it mounts from scratch again.
	#[instrument(skip(self, tree), fields(context = %self.id))]
	pub fn render(&mut self, tree: impl Into<Child>, root_selector: &str) -> Result<(), RenderError> {
		let tree = tree.into();
		let root = match self.roots.remove(root_selector) {
			Some(root) => root.update(&tree)?,
			None => RootContext::mount(&tree, root_selector, &self.options)?,
		};

		if STATIC_MAX_LEVEL >= Level::DEBUG {
			debug!(
				delegated_event_types = root.events.delegated_event_types().count(),
				elements_with_handlers = root.events.listener_count(),
				"Render pass complete."
			);
		}
		self.roots.insert(root_selector.to_owned(), root);
		Ok(())
	}
}

/// Explicit registry of [`Context`]s, with a lazily created default one.
#[derive(Debug, Default)]
pub struct ContextStore {
	options: Options,
	contexts: HashMap<String, Context>,
	default_context: Option<String>,
	next_id: u64,
}

impl ContextStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_options(options: Options) -> Self {
		Self { options, ..Self::default() }
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.options
	}

	/// Creates a context, generating an id unless one is given.
	///
	/// An existing context with the same id is replaced (and its roots' listeners removed).
	#[instrument(skip(self))]
	pub fn create_context(&mut self, id: Option<&str>) -> &mut Context {
		let id = match id {
			Some(id) => id.to_owned(),
			None => self.generate_id(),
		};
		let context = Context::new(id.clone(), self.options.clone());
		match self.contexts.entry(id) {
			Entry::Occupied(mut occupied) => {
				warn!(id = %occupied.key(), "Replacing existing context.");
				occupied.insert(context);
				occupied.into_mut()
			}
			Entry::Vacant(vacant) => vacant.insert(context),
		}
	}

	/// The context used by renders without an explicit context id. Created on first use.
	pub fn default_context(&mut self) -> &mut Context {
		let id = match &self.default_context {
			Some(id) => id.clone(),
			None => {
				let id = self.generate_id();
				trace!(%id, "Creating default context.");
				self.default_context = Some(id.clone());
				id
			}
		};
		match self.contexts.entry(id) {
			Entry::Occupied(occupied) => occupied.into_mut(),
			Entry::Vacant(vacant) => {
				let context = Context::new(vacant.key().clone(), self.options.clone());
				vacant.insert(context)
			}
		}
	}

	#[must_use]
	pub fn context(&self, id: &str) -> Option<&Context> {
		self.contexts.get(id)
	}

	pub fn context_mut(&mut self, id: &str) -> Option<&mut Context> {
		self.contexts.get_mut(id)
	}

	/// Renders into the context `context_id`, or the default context.
	///
	/// # Errors
	///
	/// [`RenderError::UnknownContext`] if `context_id` names no context, otherwise as [`Context::render`].
	pub fn render(&mut self, tree: impl Into<Child>, root_selector: &str, context_id: Option<&str>) -> Result<(), RenderError> {
		let context = match context_id {
			Some(id) => self.contexts.get_mut(id).ok_or_else(|| RenderError::UnknownContext(id.to_owned()))?,
			None => self.default_context(),
		};
		context.render(tree, root_selector)
	}

	fn generate_id(&mut self) -> String {
		loop {
			let id = format!("{}{}", self.options.context_id_prefix, self.next_id);
			self.next_id += 1;
			if !self.contexts.contains_key(&id) {
				return id;
			}
		}
	}
}

/// Whether [`App::render`] ran its pass or queued it behind the one in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
	Rendered,
	Deferred,
}

#[derive(Debug)]
struct PendingRender {
	context_id: Option<String>,
	root_selector: String,
	tree: Child,
}

/// Maximum number of deferred passes a single [`App::render`] call will run.
const MAX_DEFERRED_PASSES: usize = 64;

/// Shared application handle around a [`ContextStore`].
///
/// Renders requested while a pass is running (for example by a handler of an event the pass itself triggered)
/// don't re-enter the reconciler. They are queued, coalesced per context and root (the latest tree wins)
/// and run right after the current pass, before the outer [`App::render`] returns.
#[derive(Debug, Clone, Default)]
pub struct App {
	store: Rc<RefCell<ContextStore>>,
	pending: Rc<RefCell<Vec<PendingRender>>>,
}

impl App {
	#[must_use]
	pub fn new(store: ContextStore) -> Self {
		Self {
			store: Rc::new(RefCell::new(store)),
			pending: Rc::default(),
		}
	}

	/// # Errors
	///
	/// As [`ContextStore::render`], for this pass or any deferred one it runs,
	/// and [`RenderError::RenderStorm`] if deferred passes keep requesting more.
	/// Queued renders are dropped on error.
	#[instrument(skip(self, tree))]
	pub fn render(&self, tree: impl Into<Child>, root_selector: &str, context_id: Option<&str>) -> Result<RenderOutcome, RenderError> {
		let request = PendingRender {
			context_id: context_id.map(str::to_owned),
			root_selector: root_selector.to_owned(),
			tree: tree.into(),
		};

		let mut store = match self.store.try_borrow_mut() {
			Ok(store) => store,
			Err(_) => {
				debug!("Render requested during a pass. Deferring.");
				coalesce(&mut self.pending.borrow_mut(), request);
				return Ok(RenderOutcome::Deferred);
			}
		};

		let result = self.run(&mut store, request);
		if result.is_err() {
			self.pending.borrow_mut().clear();
		}
		result.map(|()| RenderOutcome::Rendered)
	}

	fn run(&self, store: &mut ContextStore, first: PendingRender) -> Result<(), RenderError> {
		let mut request = first;
		let mut deferred_passes = 0;
		loop {
			store.render(request.tree, &request.root_selector, request.context_id.as_deref())?;

			request = {
				let mut pending = self.pending.borrow_mut();
				if pending.is_empty() {
					return Ok(());
				}
				pending.remove(0)
			};
			deferred_passes += 1;
			if deferred_passes > MAX_DEFERRED_PASSES {
				return Err(RenderError::RenderStorm(deferred_passes));
			}
			trace!(deferred_passes, "Running deferred render.");
		}
	}

	/// Read access to the store.
	///
	/// # Errors
	///
	/// [`RenderError::Busy`] during a render pass.
	pub fn with_store<R>(&self, f: impl FnOnce(&ContextStore) -> R) -> Result<R, RenderError> {
		let store = self.store.try_borrow().map_err(|_| RenderError::Busy)?;
		Ok(f(&store))
	}

	/// Write access to the store, e.g. to create contexts.
	///
	/// # Errors
	///
	/// [`RenderError::Busy`] during a render pass.
	pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut ContextStore) -> R) -> Result<R, RenderError> {
		let mut store = self.store.try_borrow_mut().map_err(|_| RenderError::Busy)?;
		Ok(f(&mut store))
	}

	/// Number of renders waiting for the current pass to finish.
	#[must_use]
	pub fn pending_renders(&self) -> usize {
		self.pending.borrow().len()
	}
}

fn coalesce(pending: &mut Vec<PendingRender>, request: PendingRender) {
	match pending
		.iter_mut()
		.find(|queued| queued.context_id == request.context_id && queued.root_selector == request.root_selector)
	{
		Some(queued) => queued.tree = request.tree,
		None => pending.push(request),
	}
}
