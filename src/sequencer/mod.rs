//! The online LZ-style tokenization state machine (spec.md §4.4, "LZS/LZST").
//!
//! This is the central component: a synchronous, single-threaded state
//! machine with no suspension points (spec.md §5). One symbol goes in, at
//! most one token comes out.
use crate::cnf;
use crate::err::Result;
use crate::hash::RollingHash;
use crate::memory::Memory;
#[cfg(feature = "trie")]
use crate::trie::Trie;
use std::collections::HashMap;
use std::time::Instant;

#[cfg(feature = "mdl")]
pub mod mdl;
#[cfg(feature = "mdl")]
pub use mdl::{MdlConfig, MdlProbe, ZMode};

/// How much statistics bookkeeping a [`Sequencer`] performs beyond the
/// counters spec.md §4.4 always requires (`bytes_in`/`bytes_out`/wall time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsMode {
	/// No additional bookkeeping.
	#[default]
	None,
	/// Track per-fingerprint trust counts (always tracked internally; this
	/// mode only affects what a host is told is worth inspecting).
	Basic,
	/// Everything `Basic` tracks, plus the vocabulary-size-over-time
	/// snapshots a [`crate::lattice::Lattice`] configured the same way will
	/// also record (SPEC_FULL.md §9).
	Extended,
}

/// Construction parameters for a [`Sequencer`] (spec.md §6).
#[derive(Debug, Clone)]
pub struct SequencerConfig {
	/// Bounded LRU capacity for the candidate-fingerprint [`Memory`].
	pub memory_size: usize,
	/// Minimum emission count before a token is considered trusted.
	pub trust_threshold: u32,
	/// Whether the optional trie-backed longest-known-prefix override is
	/// active. Compiled out entirely when the `trie` feature is disabled.
	#[cfg(feature = "trie")]
	pub trie_search: bool,
	/// How much statistics bookkeeping to perform.
	pub stats_mode: StatsMode,
	/// The optional MDL surprise probe's configuration; `None` disables it.
	#[cfg(feature = "mdl")]
	pub mdl: Option<MdlConfig>,
}

impl Default for SequencerConfig {
	fn default() -> Self {
		Self {
			memory_size: *cnf::MEMORY_CAPACITY,
			trust_threshold: *cnf::TRUST_THRESHOLD,
			#[cfg(feature = "trie")]
			trie_search: false,
			stats_mode: StatsMode::None,
			#[cfg(feature = "mdl")]
			mdl: None,
		}
	}
}

/// A token emitted by [`Sequencer::process_symbol`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EmittedToken {
	/// The canonical byte form of the emitted symbol sequence.
	pub bytes: Vec<u8>,
	/// Whether this token's fingerprint has now been emitted at least
	/// `trust_threshold` times (spec.md §4.4).
	pub trusted: bool,
}

/// The result of [`Sequencer::flush`]: spec.md §4.4 — "returns whatever
/// candidate is in flight ... and preserves memory for inspection."
#[derive(Debug)]
pub struct Flushed<'a> {
	/// The sequencer's memory, unaffected by the flush.
	pub memory: &'a Memory,
	/// The in-flight candidate at the time of the flush, as raw symbols.
	pub current: Vec<u32>,
}

/// A throughput snapshot (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Throughput {
	pub duration_ms: u64,
	pub bytes_in: u64,
	pub bytes_out: u64,
	pub rate_mbps: f64,
}

/// The online LZ-style tokenizer.
pub struct Sequencer {
	config: SequencerConfig,
	candidate: Vec<u32>,
	hash: RollingHash,
	memory: Memory,
	#[cfg(feature = "trie")]
	trie: Option<Trie>,
	#[cfg(feature = "mdl")]
	mdl: Option<MdlProbe>,
	trust_counts: HashMap<u32, u32>,
	bytes_in: u64,
	bytes_out: u64,
	start: Option<Instant>,
}

impl Sequencer {
	/// Constructs a sequencer from an explicit configuration.
	///
	/// # Errors
	///
	/// Returns [`crate::err::Error::MemoryExhausted`] if `memory_size` is
	/// zero (spec.md §7), or [`crate::err::Error::Unimplemented`] if
	/// `config.mdl` names an unimplemented `zMode`.
	pub fn new(config: SequencerConfig) -> Result<Self> {
		let memory = Memory::new(config.memory_size)?;
		#[cfg(feature = "trie")]
		let trie = if config.trie_search {
			Some(Trie::new())
		} else {
			None
		};
		#[cfg(feature = "mdl")]
		let mdl = config.mdl.map(MdlProbe::new).transpose()?;
		Ok(Self {
			config,
			candidate: Vec::new(),
			hash: RollingHash::new(),
			memory,
			#[cfg(feature = "trie")]
			trie,
			#[cfg(feature = "mdl")]
			mdl,
			trust_counts: HashMap::new(),
			bytes_in: 0,
			bytes_out: 0,
			start: None,
		})
	}

	/// A sequencer built from process-wide defaults (spec.md §6).
	pub fn with_defaults() -> Result<Self> {
		Self::new(SequencerConfig::default())
	}

	/// Informs the trie of a token the ingest path has confirmed, so future
	/// candidates can be stabilized against it (spec.md §4.3). A no-op when
	/// the `trie` feature is disabled or `trie_search` was not enabled.
	#[cfg(feature = "trie")]
	pub fn learn_token(&mut self, bytes: Vec<u8>, token_id: u64) {
		if let Some(trie) = self.trie.as_mut() {
			trie.insert(bytes, token_id);
		}
	}

	/// Feeds one symbol through the state machine, returning an emitted
	/// token when the candidate's extension misses the memory (spec.md §4.4).
	pub fn process_symbol(&mut self, x: u32) -> Result<Option<EmittedToken>> {
		if self.start.is_none() {
			self.start = Some(Instant::now());
		}
		self.bytes_in += 1;

		if self.candidate.is_empty() {
			self.candidate.push(x);
			self.hash.reset();
			let k = self.hash.update(x);
			self.memory.set(k);
			trace!(symbol = x, "started new candidate");
			return Ok(None);
		}

		let mut trial = self.hash;
		let extended_fingerprint = trial.update(x);

		if self.memory.has(extended_fingerprint) {
			if self.wants_forced_emit(x) {
				debug!(candidate_len = self.candidate.len(), "forced emission before extension miss");
				let emitted = self.emit_current();
				self.start_candidate(x);
				return Ok(Some(emitted));
			}
			self.memory.set(extended_fingerprint);
			self.candidate.push(x);
			self.hash = trial;
			return Ok(None);
		}

		self.memory.set(extended_fingerprint);
		let emitted = self.emit_current();
		self.start_candidate(x);
		Ok(Some(emitted))
	}

	/// Whether continuing to extend the candidate with `x` should instead be
	/// overridden by an immediate emission of the current candidate
	/// (trie override / MDL probe, spec.md §4.4).
	fn wants_forced_emit(&mut self, _x: u32) -> bool {
		#[cfg(feature = "trie")]
		if self.trie_wants_emit_now() {
			return true;
		}
		#[cfg(feature = "mdl")]
		if let Some(mdl) = self.mdl.as_mut() {
			if mdl.observe(self.hash.value()) {
				return true;
			}
		}
		false
	}

	#[cfg(feature = "trie")]
	fn trie_wants_emit_now(&self) -> bool {
		let trie = match self.trie.as_ref() {
			Some(t) => t,
			None => return false,
		};
		if self.candidate.len() < 2 {
			return false;
		}
		let bytes = Self::symbols_to_bytes(&self.candidate);
		matches!(trie.longest_prefix(&bytes), Some((_, len)) if len == bytes.len())
	}

	/// Emits the current candidate, bumping its trust count, and returns it.
	/// Does not reset any state; callers start a new candidate afterward.
	fn emit_current(&mut self) -> EmittedToken {
		let fingerprint = self.hash.value();
		let count = self.trust_counts.entry(fingerprint).or_insert(0);
		*count += 1;
		let trusted = *count >= self.config.trust_threshold;

		let bytes = Self::symbols_to_bytes(&self.candidate);
		self.bytes_out += bytes.len() as u64;
		debug!(len = bytes.len(), trusted, "emitted token");
		EmittedToken {
			bytes,
			trusted,
		}
	}

	fn start_candidate(&mut self, x: u32) {
		self.candidate = vec![x];
		self.hash.reset();
		self.hash.update(x);
	}

	/// Canonical byte form of a symbol sequence (spec.md §3). The sequencer
	/// is alphabet-agnostic (spec.md §9): in byte mode each symbol already
	/// fits a `u8` and this is lossless. A caller feeding full Unicode
	/// codepoints is responsible for decomposing them into bytes upstream
	/// (corpus decoding is explicitly out of scope, spec.md §1) if it wants
	/// a lossless byte form; this fallback truncates to the low byte so the
	/// sequencer never panics on an out-of-range symbol.
	fn symbols_to_bytes(symbols: &[u32]) -> Vec<u8> {
		symbols.iter().map(|&s| (s & 0xFF) as u8).collect()
	}

	/// Returns whatever candidate is in flight and a reference to the
	/// memory, without resetting anything (spec.md §4.4).
	pub fn flush(&self) -> Flushed<'_> {
		Flushed {
			memory: &self.memory,
			current: self.candidate.clone(),
		}
	}

	/// Empties the candidate and memory, resets the hash, and zeroes
	/// counters (spec.md §4.4).
	pub fn clear(&mut self) {
		self.candidate.clear();
		self.memory.clear();
		self.hash.reset();
		self.trust_counts.clear();
		self.bytes_in = 0;
		self.bytes_out = 0;
		self.start = None;
		#[cfg(feature = "mdl")]
		if let Some(mdl) = self.mdl.as_mut() {
			mdl.reset();
		}
	}

	/// A throughput snapshot, or `None` if no symbol has been processed yet
	/// (spec.md §4.4).
	pub fn throughput(&self) -> Option<Throughput> {
		let start = self.start?;
		if self.bytes_in == 0 {
			return None;
		}
		let elapsed = start.elapsed();
		let secs = elapsed.as_secs_f64().max(f64::EPSILON);
		let rate_mbps = (self.bytes_out as f64 / 1_048_576.0) / secs;
		Some(Throughput {
			duration_ms: elapsed.as_millis() as u64,
			bytes_in: self.bytes_in,
			bytes_out: self.bytes_out,
			rate_mbps,
		})
	}

	/// Cumulative bytes consumed by `process_symbol` since construction or
	/// the last `clear()`.
	pub fn bytes_in(&self) -> u64 {
		self.bytes_in
	}

	/// Cumulative bytes emitted across all tokens so far.
	pub fn bytes_out(&self) -> u64 {
		self.bytes_out
	}

	/// Whether a fingerprint has crossed the trust threshold.
	pub fn is_trusted_fingerprint(&self, fingerprint: u32) -> bool {
		self.trust_counts.get(&fingerprint).is_some_and(|&c| c >= self.config.trust_threshold)
	}
}
