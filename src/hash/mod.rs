//! An O(1)-per-symbol incremental polynomial hash (spec.md §4.1).
//!
//! This is *incremental*, not a sliding-window rolling hash: the candidate
//! only ever grows within a step, so there is no need to subtract an
//! outgoing symbol's contribution. The name follows spec.md's terminology.
use crate::cnf;
use std::num::Wrapping;

/// `h <- h * 31 + (x & 0xFFFF_FFFF) (mod 2^32)`, computed over `Wrapping<u32>`
/// so the 32-bit overflow behavior pinned by spec.md §8 scenario S6 is exact
/// and portable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingHash {
	seed: Wrapping<u32>,
	state: Wrapping<u32>,
	multiplier: Wrapping<u32>,
}

impl RollingHash {
	/// A hash seeded with spec.md's default (`0x811C9DC5`, the FNV offset
	/// basis) and multiplier 31.
	pub fn new() -> Self {
		Self::with_seed(cnf::ROLLING_HASH_SEED)
	}

	/// A hash seeded with an explicit value, multiplier 31.
	pub fn with_seed(seed: u32) -> Self {
		Self {
			seed: Wrapping(seed),
			state: Wrapping(seed),
			multiplier: Wrapping(cnf::ROLLING_HASH_MULTIPLIER),
		}
	}

	/// The current hash value.
	pub fn value(&self) -> u32 {
		self.state.0
	}

	/// Extends the hash by one symbol, returning the new value.
	pub fn update(&mut self, symbol: u32) -> u32 {
		self.state = self.state * self.multiplier + Wrapping(symbol);
		self.state.0
	}

	/// Restores the hash to its initial seed.
	pub fn reset(&mut self) {
		self.state = self.seed;
	}

	/// Resets then updates over every symbol in `buf`, returning the final value.
	pub fn recalculate(&mut self, buf: &[u32]) -> u32 {
		self.reset();
		for &s in buf {
			self.update(s);
		}
		self.value()
	}
}

impl Default for RollingHash {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn update_matches_manual_polynomial() {
		// spec.md §8 S6: recalculate([0x41,0x42,0x43]) with seed 0x811C9DC5.
		let seed = Wrapping(0x811C_9DC5u32);
		let mul = Wrapping(31u32);
		let expected = ((seed * mul + Wrapping(0x41)) * mul + Wrapping(0x42)) * mul + Wrapping(0x43);

		let mut h = RollingHash::new();
		let got = h.recalculate(&[0x41, 0x42, 0x43]);
		assert_eq!(got, expected.0);
	}

	#[test]
	fn reset_then_update_equals_recalculate() {
		let seq = [1u32, 2, 3, 4, 5];

		let mut a = RollingHash::new();
		a.reset();
		for &s in &seq {
			a.update(s);
		}

		let mut b = RollingHash::new();
		let via_recalculate = b.recalculate(&seq);

		assert_eq!(a.value(), via_recalculate);
	}

	#[test]
	fn reset_restores_seed() {
		let mut h = RollingHash::with_seed(7);
		h.update(100);
		h.update(200);
		h.reset();
		assert_eq!(h.value(), 7);
	}

	#[test]
	fn wraps_on_overflow_without_panicking() {
		let mut h = RollingHash::with_seed(u32::MAX);
		// Must not panic in debug builds: arithmetic is explicit wrapping.
		let _ = h.update(u32::MAX);
	}

	#[test]
	fn candidate_reset_reseeds_then_refeeds_singleton() {
		let mut h = RollingHash::new();
		h.update(0x41);
		h.update(0x42);
		// Candidate reset to a singleton: reset + re-feed that one symbol.
		h.reset();
		let singleton = h.update(0x43);

		let mut fresh = RollingHash::new();
		assert_eq!(singleton, fresh.update(0x43));
	}
}
