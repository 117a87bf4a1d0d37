//! Children reconciliation: positional matching with key override.
//!
//! Planning is separate from the DOM work. [`plan_children`] decides, for each new child, whether it updates
//! a live child or is mounted fresh, and which live children go away. Keyed children match by key,
//! unkeyed ones match the unkeyed live children in order, and a match of a different [`Shape`] is a replacement.
//!
//! This is a heuristic, not a minimal edit script: reordering unkeyed children rebuilds or rewrites them.
//! Lists that get reordered need keys.

use crate::{
	loggable,
	node::{LiveBinding, Reconciler, Shape},
	vnode::Child,
	RenderError,
};
use hashbrown::{HashMap, HashSet};
use std::borrow::Cow;
use tracing::{instrument, trace_span, warn};

/// What the planner needs to know about one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot<'a> {
	pub key: Option<Cow<'a, str>>,
	pub shape: Shape<'a>,
}

impl<'a> Slot<'a> {
	#[must_use]
	pub fn of(child: &'a Child) -> Self {
		Self {
			key: child.key(),
			shape: Shape::of(child),
		}
	}
}

/// What happens to the new child at the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	/// Update the live child at this index in place.
	Update(usize),
	Mount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenPlan {
	/// One step per new child.
	pub steps: Vec<Step>,
	/// Indices of live children that aren't reused, ascending.
	pub removals: Vec<usize>,
}

/// Matches `new` children against `old` (live) ones.
///
/// Only the first occurrence of a key within one list counts as keyed. Later duplicates are matched like unkeyed children.
#[must_use]
pub fn plan_children(old: &[Slot<'_>], new: &[Slot<'_>]) -> ChildrenPlan {
	let mut keyed = HashMap::<&str, usize>::new();
	let mut unkeyed = Vec::new();
	for (index, slot) in old.iter().enumerate() {
		match slot.key.as_deref() {
			Some(key) if !keyed.contains_key(key) => {
				keyed.insert(key, index);
			}
			_ => unkeyed.push(index),
		}
	}

	let mut unkeyed = unkeyed.into_iter();
	let mut seen = HashSet::<&str>::new();
	let mut reused = vec![false; old.len()];
	let steps = new
		.iter()
		.map(|slot| {
			let candidate = match slot.key.as_deref() {
				Some(key) if seen.insert(key) => keyed.remove(key),
				Some(key) => {
					warn!(key = loggable(key), "Duplicate sibling key. Matching the child as unkeyed.");
					unkeyed.next()
				}
				None => unkeyed.next(),
			};
			match candidate {
				Some(index) if old[index].shape == slot.shape => {
					reused[index] = true;
					Step::Update(index)
				}
				_ => Step::Mount,
			}
		})
		.collect();

	let removals = reused.iter().enumerate().filter(|(_, reused)| !**reused).map(|(index, _)| index).collect();
	ChildrenPlan { steps, removals }
}

impl Reconciler<'_> {
	/// Reconciles the live children `old` of `parent` with `new`, returning the new bindings in order.
	///
	/// Afterwards, the DOM nodes of the returned bindings are the siblings right before `anchor` (or the last children of `parent`),
	/// in the order of `new`. Live nodes are reused wherever the plan allows, and only moved if they aren't in place already.
	#[instrument(skip(self, old, new), fields(old_len = old.len(), new_len = new.len()))]
	pub fn diff_children(&mut self, old: Vec<LiveBinding>, new: &[Child], parent: &web_sys::Node, anchor: Option<&web_sys::Node>) -> Result<Vec<LiveBinding>, RenderError> {
		let plan = {
			let old_slots: Vec<_> = old.iter().map(|binding| Slot::of(&binding.virtual_node)).collect();
			let new_slots: Vec<_> = new.iter().map(Slot::of).collect();
			plan_children(&old_slots, &new_slots)
		};

		let mut old: Vec<Option<LiveBinding>> = old.into_iter().map(Some).collect();
		for &index in &plan.removals {
			if let Some(binding) = old[index].take() {
				let span = trace_span!("Removing", index);
				let _enter = span.enter();
				self.unmount(binding);
			}
		}

		// Back to front, so each child's anchor is already in its final place.
		let mut anchor = anchor.cloned();
		let mut bindings = Vec::with_capacity(new.len());
		for (child, step) in new.iter().zip(plan.steps).rev() {
			let previous = match step {
				Step::Update(index) => old[index].take(),
				Step::Mount => None,
			};
			let binding = match previous {
				Some(previous) => self.update(previous, child, parent, anchor.as_ref())?,
				None => self.mount(child, parent, anchor.as_ref())?,
			};
			if let Some(first) = binding.first_dom_node() {
				anchor = Some(first);
			}
			bindings.push(binding);
		}
		bindings.reverse();
		Ok(bindings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn keyed(key: &'static str, tag: &'static str) -> Slot<'static> {
		Slot {
			key: Some(Cow::Borrowed(key)),
			shape: Shape::Element(tag),
		}
	}

	fn unkeyed(shape: Shape<'static>) -> Slot<'static> {
		Slot { key: None, shape }
	}

	#[test]
	fn identical_lists_update_everything_in_place() {
		let children = [keyed("1", "li"), unkeyed(Shape::Text), keyed("2", "li")];
		let plan = plan_children(&children, &children);
		assert_eq!(plan.steps, [Step::Update(0), Step::Update(1), Step::Update(2)]);
		assert!(plan.removals.is_empty());
	}

	#[test]
	fn swapped_keys_reuse_both() {
		let plan = plan_children(&[keyed("1", "li"), keyed("2", "li")], &[keyed("2", "li"), keyed("1", "li")]);
		assert_eq!(plan.steps, [Step::Update(1), Step::Update(0)]);
		assert!(plan.removals.is_empty());
	}

	#[test]
	fn missing_key_is_removed_and_new_key_mounted() {
		let plan = plan_children(&[keyed("1", "li"), keyed("2", "li")], &[keyed("3", "li"), keyed("2", "li")]);
		assert_eq!(plan.steps, [Step::Mount, Step::Update(1)]);
		assert_eq!(plan.removals, [0]);
	}

	#[test]
	fn same_key_different_tag_is_replaced() {
		let plan = plan_children(&[keyed("1", "li")], &[keyed("1", "div")]);
		assert_eq!(plan.steps, [Step::Mount]);
		assert_eq!(plan.removals, [0]);
	}

	#[test]
	fn unkeyed_children_match_in_order() {
		let old = [unkeyed(Shape::Element("p")), unkeyed(Shape::Text)];
		let new = [unkeyed(Shape::Element("p")), unkeyed(Shape::Text), unkeyed(Shape::Text)];
		let plan = plan_children(&old, &new);
		assert_eq!(plan.steps, [Step::Update(0), Step::Update(1), Step::Mount]);
		assert!(plan.removals.is_empty());
	}

	#[test]
	fn unkeyed_type_mismatch_replaces_at_that_position() {
		let old = [unkeyed(Shape::Element("input")), unkeyed(Shape::Element("p"))];
		let new = [unkeyed(Shape::Element("textarea")), unkeyed(Shape::Element("p"))];
		let plan = plan_children(&old, &new);
		assert_eq!(plan.steps, [Step::Mount, Step::Update(1)]);
		assert_eq!(plan.removals, [0]);
	}

	#[test]
	fn surplus_live_children_are_removed() {
		let old = [unkeyed(Shape::Text), unkeyed(Shape::Text), unkeyed(Shape::Fragment)];
		let plan = plan_children(&old, &[unkeyed(Shape::Text)]);
		assert_eq!(plan.steps, [Step::Update(0)]);
		assert_eq!(plan.removals, [1, 2]);
	}

	#[test]
	fn keyed_children_do_not_consume_unkeyed_positions() {
		let old = [unkeyed(Shape::Text), keyed("a", "li"), unkeyed(Shape::Element("hr"))];
		let new = [keyed("a", "li"), unkeyed(Shape::Text), keyed("b", "li"), unkeyed(Shape::Element("hr"))];
		let plan = plan_children(&old, &new);
		assert_eq!(plan.steps, [Step::Update(1), Step::Update(0), Step::Mount, Step::Update(2)]);
		assert!(plan.removals.is_empty());
	}

	#[test]
	fn duplicate_keys_fall_back_to_unkeyed_matching() {
		let children = [keyed("a", "li"), keyed("a", "li"), unkeyed(Shape::Text)];
		let plan = plan_children(&children, &children);
		assert_eq!(plan.steps, [Step::Update(0), Step::Update(1), Step::Update(2)]);
		assert!(plan.removals.is_empty());
	}

	#[test]
	fn emptying_removes_everything() {
		let plan = plan_children(&[keyed("a", "li"), unkeyed(Shape::Text)], &[]);
		assert!(plan.steps.is_empty());
		assert_eq!(plan.removals, [0, 1]);
	}

	#[test]
	fn slots_read_keys_and_shapes() {
		let child = Child::from(crate::vnode::VirtualNode::element("li").with_key("x"));
		assert_eq!(Slot::of(&child), keyed("x", "li"));
		assert_eq!(Slot::of(&Child::text("x")), unkeyed(Shape::Text));
	}
}
