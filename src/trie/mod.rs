//! Optional longest-known-prefix matcher over confirmed tokens (spec.md §4.3).
//!
//! Built on `radix_trie`, the same dependency the teacher codebase already
//! uses for its own in-memory prefix trie (`dbs/distinct.rs`). Disabled at
//! compile time when the `trie` feature is off, so the "no-op, not a
//! conditional branch" design note in spec.md §9 holds structurally rather
//! than by a runtime flag.
use radix_trie::{Trie as RadixTrie, TrieCommon};

/// A longest-known-prefix matcher over byte-sequence tokens, keyed by their
/// canonical byte form.
#[derive(Default)]
pub struct Trie {
	inner: RadixTrie<Vec<u8>, u64>,
}

impl Trie {
	/// An empty trie.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `bytes` with its lattice token id. Idempotent: inserting the
	/// same bytes again with a different id simply replaces the mapping.
	pub fn insert(&mut self, bytes: Vec<u8>, token_id: u64) {
		self.inner.insert(bytes, token_id);
	}

	/// The longest stored token that is a prefix of `stream_view`, along with
	/// its byte length, or `None` if no stored token prefixes it.
	pub fn longest_prefix(&self, stream_view: &[u8]) -> Option<(Vec<u8>, usize)> {
		let subtrie = self.inner.get_ancestor(&stream_view.to_vec())?;
		let key = subtrie.key()?;
		Some((key.clone(), key.len()))
	}

	/// Whether any token has been inserted.
	pub fn is_empty(&self) -> bool {
		self.inner.len() == 0
	}

	/// The number of distinct tokens stored.
	pub fn len(&self) -> usize {
		self.inner.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn longest_prefix_prefers_the_longer_known_token() {
		let mut t = Trie::new();
		t.insert(b"A".to_vec(), 1);
		t.insert(b"AB".to_vec(), 2);

		let (bytes, len) = t.longest_prefix(b"ABC").unwrap();
		assert_eq!(bytes, b"AB");
		assert_eq!(len, 2);
	}

	#[test]
	fn no_match_when_nothing_is_a_prefix() {
		let mut t = Trie::new();
		t.insert(b"XYZ".to_vec(), 1);
		assert!(t.longest_prefix(b"ABC").is_none());
	}

	#[test]
	fn insert_is_idempotent() {
		let mut t = Trie::new();
		t.insert(b"A".to_vec(), 1);
		t.insert(b"A".to_vec(), 1);
		assert_eq!(t.len(), 1);
	}

	#[test]
	fn never_shrinks_within_a_session() {
		let mut t = Trie::new();
		t.insert(b"A".to_vec(), 1);
		t.insert(b"B".to_vec(), 2);
		assert_eq!(t.len(), 2);
	}
}
