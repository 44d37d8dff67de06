//! Process-wide defaults for tunables documented in spec.md §4 and §6.
//!
//! These back-stop the explicit construction parameters on
//! [`crate::sequencer::SequencerConfig`] / [`crate::ingest::Ingest`]; a caller
//! that supplies its own value never consults these.
use once_cell::sync::Lazy;

/// Polynomial multiplier used by [`crate::hash::RollingHash`] (spec.md §4.1).
pub const ROLLING_HASH_MULTIPLIER: u32 = 31;

/// FNV offset basis, used as the rolling hash's default seed. Chosen for
/// dispersion, not cryptographic strength (spec.md §4.1).
pub const ROLLING_HASH_SEED: u32 = 0x811C_9DC5;

/// Default bounded-LRU capacity for [`crate::memory::Memory`] (spec.md §4.2).
pub static MEMORY_CAPACITY: Lazy<usize> = lazy_env_parse!("LZST_MEMORY_CAPACITY", usize, 10_000);

/// Minimum emission count before a token is considered trusted (spec.md §4.4).
pub static TRUST_THRESHOLD: Lazy<u32> = lazy_env_parse!("LZST_TRUST_THRESHOLD", u32, 2);

/// Default ingest batch size before an automatic flush (spec.md §4.5).
pub static INGEST_BATCH_SIZE: Lazy<usize> =
	lazy_env_parse!("LZST_INGEST_BATCH_SIZE", usize, 50_000);

/// Laplace smoothing constant for the MDL surprise probe (spec.md §4.4).
pub static MDL_ALPHA: Lazy<f64> = lazy_env_parse!("LZST_MDL_ALPHA", f64, 0.1);

/// EWMA decay for the MDL surprise probe (spec.md §4.4).
pub static MDL_BETA: Lazy<f64> = lazy_env_parse!("LZST_MDL_BETA", f64, 0.02);

/// Surprise tolerance for the MDL surprise probe (spec.md §4.4).
pub static MDL_C: Lazy<f64> = lazy_env_parse!("LZST_MDL_C", f64, 0.7);

/// Entropy scaling factor for the MDL surprise probe (spec.md §4.4).
pub static MDL_TAU: Lazy<f64> = lazy_env_parse!("LZST_MDL_TAU", f64, 0.8);

/// Capacity of the Lattice's internal hot-query cache (spec.md §4.6).
pub static LATTICE_CACHE_CAPACITY: Lazy<usize> =
	lazy_env_parse!("LZST_LATTICE_CACHE_CAPACITY", usize, 4_096);

/// Number of ingested tokens between vocabulary-size-over-time samples, when
/// `stats_mode = extended` (spec.md §3; SPEC_FULL.md §9 "LatticeStats snapshot over time").
pub static STATS_SNAPSHOT_INTERVAL: Lazy<u64> =
	lazy_env_parse!("LZST_STATS_SNAPSHOT_INTERVAL", u64, 1_000);
