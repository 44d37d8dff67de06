//! The optional MDL-style surprise probe that backs the sequencer's
//! forced-emit heuristic (spec.md §4.4).
//!
//! The probe is self-contained: the sequencer owns no reference to the
//! lattice (spec.md §5 draws that ownership line), so "probability of a
//! token given its context" is approximated from the sequencer's own
//! emission history rather than from the lattice's transition table. Only
//! `ZMode::ChildDegree` is implemented, per spec.md §9; any other mode is a
//! documented open extension point.
use crate::err::{Error, Result};
use std::collections::HashMap;

/// Tunables for the surprise probe (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MdlConfig {
	/// Laplace smoothing constant over transition-probability estimates.
	pub alpha: f64,
	/// EWMA decay applied to the running surprise estimate.
	pub beta: f64,
	/// Surprise tolerance: the probe forces an emission once the EWMA
	/// exceeds `c * tau`.
	pub c: f64,
	/// Entropy scaling factor.
	pub tau: f64,
	/// The normalizer used to turn a raw count into a probability estimate.
	pub z_mode: ZMode,
}

impl Default for MdlConfig {
	fn default() -> Self {
		use crate::cnf;
		Self {
			alpha: *cnf::MDL_ALPHA,
			beta: *cnf::MDL_BETA,
			c: *cnf::MDL_C,
			tau: *cnf::MDL_TAU,
			z_mode: ZMode::ChildDegree,
		}
	}
}

/// The normalizer spec.md §4.4 calls `zMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZMode {
	/// Normalizes by the count of distinct successors observed for the
	/// previous token. The only mode this crate implements.
	ChildDegree,
	/// Normalize by raw token frequency alone, ignoring context. Reserved
	/// per spec.md §9's "documented open extension point"; selecting it
	/// is a configuration error, not a silent fallback to `ChildDegree`.
	Unigram,
}

/// Running state for the surprise probe.
///
/// Probability of a fingerprint is estimated from how often this sequencer
/// has emitted it before, Laplace-smoothed over the number of distinct
/// fingerprints emitted so far (the "child-degree" normalizer, approximated
/// locally since the sequencer has no view of the lattice's real successor
/// counts).
#[derive(Debug, Clone)]
pub struct MdlProbe {
	config: MdlConfig,
	counts: HashMap<u32, u64>,
	total: u64,
	ewma_surprise: f64,
}

impl MdlProbe {
	/// Constructs a probe from `config`.
	///
	/// # Errors
	///
	/// Returns [`Error::Unimplemented`] if `config.z_mode` names a normalizer
	/// this crate does not implement (spec.md §9).
	pub fn new(config: MdlConfig) -> Result<Self> {
		match config.z_mode {
			ZMode::ChildDegree => {}
			ZMode::Unigram => {
				return Err(Error::Unimplemented(format!("MDL zMode {:?} is not implemented", config.z_mode)));
			}
		}
		Ok(Self {
			config,
			counts: HashMap::new(),
			total: 0,
			ewma_surprise: 0.0,
		})
	}

	/// Records one more observation of `fingerprint` and returns whether the
	/// accumulated surprise now exceeds tolerance, i.e. whether the policy
	/// wants to force an emission rather than continue extending.
	pub fn observe(&mut self, fingerprint: u32) -> bool {
		let distinct = self.counts.len().max(1) as f64;
		let count = *self.counts.get(&fingerprint).unwrap_or(&0);
		let alpha = self.config.alpha;
		let p = (count as f64 + alpha) / (self.total as f64 + alpha * distinct);
		let surprise = -p.max(f64::MIN_POSITIVE).ln();

		self.ewma_surprise = self.config.beta * surprise + (1.0 - self.config.beta) * self.ewma_surprise;

		*self.counts.entry(fingerprint).or_insert(0) += 1;
		self.total += 1;

		self.ewma_surprise > self.config.c * self.config.tau
	}

	/// The current EWMA surprise estimate.
	pub fn ewma(&self) -> f64 {
		self.ewma_surprise
	}

	/// Resets all accumulated state (mirrors `Sequencer::clear`).
	pub fn reset(&mut self) {
		self.counts.clear();
		self.total = 0;
		self.ewma_surprise = 0.0;
	}
}
