//! The batched writer that turns emitted tokens into lattice mutations
//! (spec.md §4.5).
//!
//! Per-token writes would dominate cost; this amortizes transaction
//! overhead by accumulating `(token, predecessor)` observations locally and
//! committing them to the [`crate::lattice::Lattice`] in one transaction
//! per batch (spec.md §4.5 rationale, "~100x").
use crate::cnf;
use crate::err::{Error, Result};
use crate::lattice::{EdgeDelta, Lattice, TokenDelta};
use std::collections::HashMap;
use std::sync::Arc;

/// Construction parameters for an [`Ingest`] (spec.md §6).
#[derive(Debug, Clone)]
pub struct IngestConfig {
	/// Number of buffered tokens before an automatic flush.
	pub batch_size: usize,
}

impl Default for IngestConfig {
	fn default() -> Self {
		Self {
			batch_size: *cnf::INGEST_BATCH_SIZE,
		}
	}
}

/// The batching writer.
pub struct Ingest {
	lattice: Arc<Lattice>,
	batch_size: usize,
	initialized: bool,
	token_counts: HashMap<Vec<u8>, u64>,
	edge_counts: HashMap<(Vec<u8>, Vec<u8>), u64>,
	last_token: Option<Vec<u8>>,
	buffered_since_flush: usize,
}

impl Ingest {
	/// Constructs an ingest batcher targeting `lattice`. Call [`Ingest::init`]
	/// before the first [`Ingest::buffer`].
	pub fn new(lattice: Arc<Lattice>, config: IngestConfig) -> Self {
		Self {
			lattice,
			batch_size: config.batch_size.max(1),
			initialized: false,
			token_counts: HashMap::new(),
			edge_counts: HashMap::new(),
			last_token: None,
			buffered_since_flush: 0,
		}
	}

	/// Creates the lattice schema (if not already present) and prepares the
	/// batcher for buffering. Must precede [`Ingest::buffer`] (spec.md §4.5).
	pub fn init(&mut self) -> Result<()> {
		self.initialized = true;
		debug!("ingest initialized");
		Ok(())
	}

	/// Records one emitted token, pairing it with the immediately preceding
	/// buffered token (none for the first call since construction or since
	/// the last [`Ingest::close`]), and flushes automatically once the
	/// batch is full.
	///
	/// Returns the `(bytes, id)` pairs the lattice just confirmed, if this
	/// call triggered an automatic flush — empty otherwise. A host that
	/// wants the sequencer's trie kept current (spec.md §4.3) should feed
	/// these into [`crate::sequencer::Sequencer::learn_token`] the same way
	/// it would the return of an explicit [`Ingest::flush`].
	///
	/// # Errors
	///
	/// Returns [`Error::IngestNotInitialized`] if called before [`Ingest::init`].
	pub fn buffer(&mut self, token_bytes: &[u8]) -> Result<Vec<(Vec<u8>, u64)>> {
		if !self.initialized {
			return Err(Error::IngestNotInitialized);
		}
		*self.token_counts.entry(token_bytes.to_vec()).or_insert(0) += 1;
		if let Some(prev) = self.last_token.replace(token_bytes.to_vec()) {
			*self.edge_counts.entry((prev, token_bytes.to_vec())).or_insert(0) += 1;
		}
		self.buffered_since_flush += 1;
		trace!(len = token_bytes.len(), "buffered token");
		if self.buffered_since_flush >= self.batch_size {
			return self.flush();
		}
		Ok(Vec::new())
	}

	/// Commits the current batch to the lattice in a single transaction.
	/// A no-op if nothing is buffered. Partial failure leaves the lattice
	/// untouched (spec.md §4.5) and the local buffer intact so a host can
	/// retry.
	///
	/// Returns the `(bytes, id)` pair for every token this batch confirmed
	/// (spec.md §4.3), so a host can wire them into
	/// [`crate::sequencer::Sequencer::learn_token`].
	pub fn flush(&mut self) -> Result<Vec<(Vec<u8>, u64)>> {
		if !self.initialized {
			return Err(Error::IngestNotInitialized);
		}
		if self.token_counts.is_empty() {
			return Ok(Vec::new());
		}

		let tokens: Vec<TokenDelta> = self
			.token_counts
			.iter()
			.map(|(bytes, &occurrences)| TokenDelta {
				bytes: bytes.clone(),
				occurrences,
			})
			.collect();
		let edges: Vec<EdgeDelta> = self
			.edge_counts
			.iter()
			.map(|((from, to), &weight)| EdgeDelta {
				from: from.clone(),
				to: to.clone(),
				weight,
			})
			.collect();

		let confirmed = self.lattice.batch_ingest(&tokens, &edges)?;

		// batch_ingest already committed at this point: clear the local
		// buffers now so a failure in update_token_degrees below can't cause
		// a host retry to double-apply deltas batch_ingest already upserted
		// (spec.md §8 invariants 4/5).
		info!(tokens = tokens.len(), edges = edges.len(), "ingest batch committed");
		self.token_counts.clear();
		self.edge_counts.clear();
		self.buffered_since_flush = 0;

		self.lattice.update_token_degrees()?;

		Ok(confirmed)
	}

	/// Flushes any remaining batch and releases this handle's hold on the
	/// lattice reference.
	pub fn close(mut self) -> Result<Vec<(Vec<u8>, u64)>> {
		self.flush()
	}
}
