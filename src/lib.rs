//! LZST: a streaming LZ-style tokenizer and its persistent token lattice.
//!
//! The crate is split into the pieces described by the design document:
//! an O(1) [`hash`] for keying candidates, a bounded [`memory`] of
//! previously-seen fingerprints, an optional [`trie`] for longest-known-prefix
//! matching, the [`sequencer`] state machine that ties them together into an
//! online tokenizer, the [`ingest`] batcher, and the persistent [`lattice`]
//! store the batcher writes into.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

#[doc(hidden)]
pub mod cnf;
pub mod err;

pub mod hash;
pub mod ingest;
pub mod lattice;
pub mod memory;
pub mod sequencer;
#[cfg(feature = "trie")]
pub mod trie;

pub use err::Error;
pub use hash::RollingHash;
pub use ingest::Ingest;
pub use lattice::Lattice;
pub use memory::Memory;
pub use sequencer::{Sequencer, SequencerConfig};
