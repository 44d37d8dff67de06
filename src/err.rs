//! The crate's error taxonomy (spec.md §7).
use thiserror::Error;

/// Errors produced by the sequencer, ingest batcher, and lattice store.
///
/// Propagation policy (spec.md §7): the sequencer has no I/O and recovers
/// from nothing internally; the ingest batcher retries nothing automatically;
/// the lattice surfaces store errors verbatim. [`Error::IntegrityViolation`]
/// is logged at `error!` before it is ever returned, so it can never be
/// silently dropped by a caller that discards the `Result`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// A symbol fell outside the alphabet a bounded-alphabet sequencer was
	/// constructed with.
	#[error("symbol {0} is outside the declared alphabet")]
	InvalidSymbol(u32),

	/// [`crate::memory::Memory::new`] was asked for a capacity of zero.
	#[error("memory capacity must be greater than zero")]
	MemoryExhausted,

	/// [`crate::ingest::Ingest::buffer`] or `flush` was called before `init`.
	#[error("ingest buffer used before init()")]
	IngestNotInitialized,

	/// A lattice write transaction failed; the batch that produced it was
	/// rolled back in full.
	#[error("lattice store write failed: {0}")]
	StoreWriteFailed(#[source] rusqlite::Error),

	/// A lattice read/query failed; no state was changed.
	#[error("lattice store read failed: {0}")]
	StoreReadFailed(#[source] rusqlite::Error),

	/// An edge referenced a token id that does not exist in the store.
	#[error("edge ({from}, {to}) references a missing token id")]
	IntegrityViolation {
		/// The edge's source token id.
		from: u64,
		/// The edge's destination token id.
		to: u64,
	},

	/// A configured MDL `zMode` has no implementation yet (spec.md §9: only
	/// `child-degree` is implemented; other modes are a documented open
	/// extension point rather than a silent fallback).
	#[error("zMode `{0}` is not implemented")]
	Unimplemented(String),

	/// An I/O failure opening or creating the lattice's backing file.
	#[error("lattice store I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// An invariant the type system could not express was violated.
	#[error("unreachable: {0}")]
	Unreachable(String),
}

impl From<rusqlite::Error> for Error {
	/// Defaults uncategorized `rusqlite` failures to [`Error::StoreReadFailed`];
	/// call sites inside a write transaction should prefer constructing
	/// [`Error::StoreWriteFailed`] explicitly so the distinction in spec.md §7
	/// is preserved.
	fn from(e: rusqlite::Error) -> Self {
		Error::StoreReadFailed(e)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
