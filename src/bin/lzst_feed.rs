//! A thin demonstration binary: feeds a file byte-by-byte through a
//! [`lzst::Sequencer`] into an [`lzst::Ingest`]/[`lzst::Lattice`], printing
//! throughput at the end.
//!
//! This mirrors the "host" role spec.md assigns to out-of-scope
//! collaborators (file I/O, CLI parsing, configuration); it is not part of
//! the library's tested contract.
use clap::Parser;
use lzst::lattice::StatsMode as LatticeStatsMode;
use lzst::sequencer::{SequencerConfig, StatsMode};
use lzst::{Ingest, Lattice, Sequencer};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

/// Feeds a corpus through the streaming LZ tokenizer and records the result
/// into a token lattice.
#[derive(Parser, Debug)]
#[command(name = "lzst-feed", author, version, about)]
struct Args {
	/// Path to the corpus to tokenize (read as raw bytes).
	corpus: PathBuf,

	/// Path to the SQLite lattice database to write into.
	#[arg(long, default_value = "lattice.db")]
	database: PathBuf,

	/// LRU fingerprint memory capacity (spec.md §4.2).
	#[arg(long, default_value_t = 10_000)]
	memory_size: usize,

	/// Minimum emission count before a token is considered trusted.
	#[arg(long, default_value_t = 2)]
	trust_threshold: u32,

	/// Ingest batch size before an automatic flush (spec.md §4.5).
	#[arg(long, default_value_t = 50_000)]
	batch_size: usize,

	/// Enables the trie-backed longest-known-prefix override (spec.md §4.3).
	#[cfg(feature = "trie")]
	#[arg(long)]
	trie: bool,

	/// Prints the final lattice statistics as JSON instead of plain text.
	#[arg(long)]
	json: bool,
}

/// Feeds tokens the ingest just confirmed into the sequencer's trie
/// (spec.md §4.3: the trie holds "the canonical byte forms of tokens the
/// ingest has confirmed"). A no-op when the `trie` feature is disabled.
#[cfg(feature = "trie")]
fn learn_confirmed(sequencer: &mut Sequencer, confirmed: Vec<(Vec<u8>, u64)>) {
	for (bytes, token_id) in confirmed {
		sequencer.learn_token(bytes, token_id);
	}
}

#[cfg(not(feature = "trie"))]
fn learn_confirmed(_sequencer: &mut Sequencer, _confirmed: Vec<(Vec<u8>, u64)>) {}

fn main() -> lzst::err::Result<()> {
	tracing_subscriber::fmt::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let args = Args::parse();

	let lattice = Arc::new(Lattice::open_with_stats(&args.database, LatticeStatsMode::Basic)?);
	let mut ingest = Ingest::new(lattice.clone(), lzst::ingest::IngestConfig {
		batch_size: args.batch_size,
	});
	ingest.init()?;

	let mut sequencer = Sequencer::new(SequencerConfig {
		memory_size: args.memory_size,
		trust_threshold: args.trust_threshold,
		#[cfg(feature = "trie")]
		trie_search: args.trie,
		stats_mode: StatsMode::Basic,
		#[cfg(feature = "mdl")]
		mdl: None,
	})?;

	let file = File::open(&args.corpus)?;
	let mut reader = BufReader::new(file);
	let mut buf = [0u8; 64 * 1024];
	loop {
		let n = reader.read(&mut buf)?;
		if n == 0 {
			break;
		}
		for &byte in &buf[..n] {
			if let Some(token) = sequencer.process_symbol(byte as u32)? {
				let confirmed = ingest.buffer(&token.bytes)?;
				learn_confirmed(&mut sequencer, confirmed);
			}
		}
	}

	let flushed = sequencer.flush();
	if !flushed.current.is_empty() {
		let tail: Vec<u8> = flushed.current.iter().map(|&s| s as u8).collect();
		let confirmed = ingest.buffer(&tail)?;
		learn_confirmed(&mut sequencer, confirmed);
	}
	let confirmed = ingest.close()?;
	learn_confirmed(&mut sequencer, confirmed);

	if let Some(t) = sequencer.throughput() {
		println!(
			"processed {} bytes -> {} bytes in {} ms ({:.2} MB/s)",
			t.bytes_in, t.bytes_out, t.duration_ms, t.rate_mbps
		);
	}

	let stats = lattice.stats()?;
	if args.json {
		println!("{}", serde_json::to_string(&stats).unwrap_or_default());
	} else {
		println!(
			"lattice: {} tokens, {} edges, mean degree {:.2}, max degree {}",
			stats.token_count, stats.edge_count, stats.mean_degree, stats.max_degree
		);
	}

	Ok(())
}
