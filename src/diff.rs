//! Node-sequence splicing: reconciles one ordered child run against another.
//!
//! [`splice_node_list`] transforms the run of `parent`'s children described by
//! `old` into `new`, using moves and insertions only. Removed nodes are never
//! detached here; instead the caller's [`SpliceOptions::on_remove`] callback
//! is invoked exactly once per node present in `old` but absent from `new`,
//! in ascending old-list order, and owns disposal. This keeps template
//! teardown (which must run before the node disappears) in the caller's
//! hands.
//!
//! After return, the nodes of `new` are children of `parent`, in `new` order,
//! immediately before [`SpliceOptions::anchor`] (or at the end of the child
//! list when no anchor is given).
//!
//! Nodes compare by pointer identity throughout.

use crate::dom::Node;
use hashbrown::HashSet;
use tracing::{error, trace, trace_span, warn};

pub struct SpliceOptions<'a> {
	/// Stable boundary the spliced run ends at.
	pub anchor: Option<&'a Node>,
	/// Removal callback; see the module docs for the exactly-once guarantee.
	/// The callback receives the removed node and its index in `old`.
	pub on_remove: Option<&'a mut dyn FnMut(&Node, usize)>,
}

/// Returns the number of structural operations performed (insertions, moves
/// and reported removals). Identical sequences cost zero operations.
pub fn splice_node_list(parent: &Node, mut old: &[Node], mut new: &[Node], options: SpliceOptions<'_>) -> usize {
	let span = trace_span!("splice_node_list", old = old.len(), new = new.len());
	let _enter = span.enter();

	debug_assert_eq!(
		old.len(),
		old.iter().collect::<HashSet<_>>().len(),
		"duplicate node in the source list"
	);
	debug_assert_eq!(
		new.len(),
		new.iter().collect::<HashSet<_>>().len(),
		"duplicate node in the target list"
	);

	let SpliceOptions { anchor, mut on_remove } = options;

	// Shrink the working window from both ends first; a fully stable
	// sequence never touches the tree at all.
	let mut prefix = 0;
	while !old.is_empty() && !new.is_empty() && old.first() == new.first() {
		old = &old[1..];
		new = &new[1..];
		prefix += 1;
	}
	let mut suffix_head: Option<Node> = None;
	while !old.is_empty() && !new.is_empty() && old.last() == new.last() {
		suffix_head = old.last().cloned();
		old = &old[..old.len() - 1];
		new = &new[..new.len() - 1];
	}
	if old.is_empty() && new.is_empty() {
		trace!("Sequences already aligned.");
		return 0;
	}

	let mut ops = 0;

	let target: HashSet<&Node> = new.iter().collect();
	for (i, node) in old.iter().enumerate() {
		if target.contains(node) {
			continue;
		}
		if let Some(on_remove) = on_remove.as_mut() {
			on_remove(node, prefix + i);
		}
		if node.parent().as_ref() == Some(parent) {
			// Disposal is the callback's job; clean up if it skipped it.
			warn!("Removed node {:?} was left attached; detaching.", node);
			node.detach();
		}
		ops += 1;
	}

	// Place the replacement run back to front so every node knows its final
	// successor. A node already sitting in front of that successor is left
	// alone, which keeps stable subsequences cheap.
	//TODO: A longest-increasing-subsequence pass would minimize moves for
	// long rotations; so far the window trimming has been enough.
	let mut next: Option<Node> = suffix_head.or_else(|| anchor.cloned());
	for node in new.iter().rev() {
		let in_place = node.parent().as_ref() == Some(parent) && node.next_sibling() == next;
		if !in_place {
			match parent.insert_before(node, next.as_ref()) {
				Ok(()) => ops += 1,
				Err(error) => error!("Failed to place node {:?}: {}", node, error),
			}
		}
		next = Some(node.clone());
	}

	ops
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn nodes(n: usize) -> Vec<Node> {
		(0..n).map(|i| Node::element(&format!("n{}", i))).collect()
	}

	fn attach(parent: &Node, nodes: &[Node]) {
		for node in nodes {
			parent.append(node).unwrap();
		}
	}

	fn splice_collecting(parent: &Node, old: &[Node], new: &[Node], anchor: Option<&Node>) -> (usize, Vec<usize>) {
		let mut removed = Vec::new();
		let mut on_remove = |node: &Node, index: usize| {
			node.detach();
			removed.push(index);
		};
		let ops = splice_node_list(
			parent,
			old,
			new,
			SpliceOptions {
				anchor,
				on_remove: Some(&mut on_remove),
			},
		);
		(ops, removed)
	}

	#[test]
	fn identical_sequences_cost_nothing() {
		let parent = Node::element("ul");
		let all = nodes(4);
		attach(&parent, &all);
		let (ops, removed) = splice_collecting(&parent, &all, &all, None);
		assert_eq!(ops, 0);
		assert!(removed.is_empty());
		assert_eq!(parent.children(), all);
	}

	#[test]
	fn rotation_moves_into_order() {
		let parent = Node::element("ul");
		let all = nodes(3);
		attach(&parent, &all);
		let rotated = vec![all[2].clone(), all[0].clone(), all[1].clone()];
		let (ops, removed) = splice_collecting(&parent, &all, &rotated, None);
		assert!(removed.is_empty());
		assert!(ops > 0);
		assert_eq!(parent.children(), rotated);
	}

	#[test]
	fn removals_report_old_indices_in_order() {
		let parent = Node::element("ul");
		let all = nodes(4);
		attach(&parent, &all);
		let kept = vec![all[1].clone(), all[3].clone()];
		let (_, removed) = splice_collecting(&parent, &all, &kept, None);
		assert_eq!(removed, vec![0, 2]);
		assert_eq!(parent.children(), kept);
	}

	#[test]
	fn insertions_land_before_the_anchor() {
		let parent = Node::element("ul");
		let anchor = Node::placeholder();
		parent.append(&anchor).unwrap();
		let all = nodes(2);
		let (ops, _) = splice_collecting(&parent, &[], &all, Some(&anchor));
		assert_eq!(ops, 2);
		assert_eq!(parent.children(), vec![all[0].clone(), all[1].clone(), anchor]);
	}

	#[test]
	fn unreported_removals_are_detached_defensively() {
		let parent = Node::element("ul");
		let all = nodes(2);
		attach(&parent, &all);
		let kept = vec![all[1].clone()];
		// No callback at all: the differ still restores the target sequence.
		let ops = splice_node_list(
			&parent,
			&all,
			&kept,
			SpliceOptions {
				anchor: None,
				on_remove: None,
			},
		);
		assert_eq!(ops, 1);
		assert_eq!(parent.children(), kept);
	}

	proptest! {
		/// For arbitrary old/new index sequences over a shared node pool, the
		/// spliced children equal the target and every dropped node is
		/// reported exactly once, in old-list order.
		#[test]
		fn splice_reaches_the_target(
			old_picks in proptest::collection::vec(0usize..8, 0..8),
			new_picks in proptest::collection::vec(0usize..8, 0..8),
		) {
			let pool = nodes(8);
			let dedup = |picks: &[usize]| {
				let mut seen = HashSet::new();
				picks
					.iter()
					.copied()
					.filter(|i| seen.insert(*i))
					.map(|i| pool[i].clone())
					.collect::<Vec<_>>()
			};
			let old = dedup(&old_picks);
			let new = dedup(&new_picks);

			let parent = Node::element("ul");
			let anchor = Node::placeholder();
			parent.append(&anchor).unwrap();
			for node in &old {
				parent.insert_before(node, Some(&anchor)).unwrap();
			}

			let mut removed = Vec::new();
			let mut on_remove = |node: &Node, _: usize| {
				node.detach();
				removed.push(node.clone());
			};
			splice_node_list(
				&parent,
				&old,
				&new,
				SpliceOptions {
					anchor: Some(&anchor),
					on_remove: Some(&mut on_remove),
				},
			);

			let mut expected = new.clone();
			expected.push(anchor.clone());
			prop_assert_eq!(parent.children(), expected);

			let target: HashSet<&Node> = new.iter().collect();
			let expected_removed = old
				.iter()
				.filter(|node| !target.contains(*node))
				.cloned()
				.collect::<Vec<_>>();
			prop_assert_eq!(removed, expected_removed);
		}
	}
}
