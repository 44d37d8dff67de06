//! The persistent token/edge store (spec.md §4.6).
//!
//! Tokens and edges live in an embedded SQLite database (`rusqlite`,
//! bundled) per the schema in spec.md §6. A `quick_cache`-backed hot-query
//! cache sits in front of the three point-lookup queries, mirroring the
//! teacher's own `TreeCache` (`idx/trees/store/cache.rs`): any write
//! invalidates the cache entries it touches.
use crate::cnf;
use crate::err::{Error, Result};
use quick_cache::sync::Cache;
use quick_cache::UnitWeighter;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tokens (
	id INTEGER PRIMARY KEY,
	bytes TEXT UNIQUE NOT NULL,
	length INTEGER NOT NULL,
	occurrences INTEGER NOT NULL DEFAULT 0,
	in_degree INTEGER NOT NULL DEFAULT 0,
	out_degree INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_tokens_bytes ON tokens(bytes);
CREATE TABLE IF NOT EXISTS edges (
	from_id INTEGER NOT NULL,
	to_id INTEGER NOT NULL,
	weight INTEGER NOT NULL DEFAULT 0,
	PRIMARY KEY (from_id, to_id)
);
CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);
";

/// A persisted token (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Token {
	pub id: u64,
	pub bytes: Vec<u8>,
	pub length: u32,
	pub occurrences: u64,
	pub in_degree: u32,
	pub out_degree: u32,
}

impl Token {
	/// Uppercase hex, no separators, no `0x` prefix (spec.md §6).
	pub fn hex(&self) -> String {
		hex::encode_upper(&self.bytes)
	}
}

impl std::fmt::Display for Token {
	/// The `\x`-prefixed hex-literal form spec.md §6 specifies for logging.
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "\\x{}", self.hex())
	}
}

/// A directed transition observation (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
	pub from_id: u64,
	pub to_id: u64,
	pub weight: u64,
}

/// Aggregate statistics over the closed world `(Tokens, Edges)` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatticeStats {
	pub token_count: u64,
	pub edge_count: u64,
	pub mean_degree: f64,
	pub median_degree: f64,
	pub max_degree: u32,
}

/// A normalized outgoing transition, as returned by
/// [`Lattice::refined_transitions_from`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transition {
	pub to_id: u64,
	pub weight: u64,
	pub normalized_prob: f64,
}

/// A per-batch occurrence delta for one token (SPEC_FULL.md §4.5/§9, feeding
/// [`Lattice::batch_ingest`]).
#[derive(Debug, Clone)]
pub struct TokenDelta {
	pub bytes: Vec<u8>,
	pub occurrences: u64,
}

/// A per-batch weight delta for one transition.
#[derive(Debug, Clone)]
pub struct EdgeDelta {
	pub from: Vec<u8>,
	pub to: Vec<u8>,
	pub weight: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
	ByBytesHash(u64),
	ById(u64),
	Edge(u64, u64),
}

/// How much of the ambient vocabulary-size-over-time bookkeeping (SPEC_FULL.md
/// §9) the lattice performs alongside ordinary ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsMode {
	#[default]
	None,
	Basic,
	Extended,
}

/// The persistent token/edge store.
pub struct Lattice {
	conn: Mutex<Connection>,
	cache: Cache<CacheKey, CachedEntry, UnitWeighter>,
	stats_mode: StatsMode,
	snapshots: Mutex<Vec<(u64, u64)>>,
	/// Cumulative token occurrences ingested since the last recorded
	/// snapshot; gates `record_snapshot` against `cnf::STATS_SNAPSHOT_INTERVAL`
	/// (SPEC_FULL.md §9: "one sample every N ingested tokens").
	tokens_since_snapshot: Mutex<u64>,
}

#[derive(Debug, Clone)]
enum CachedEntry {
	Token(Option<Token>),
	Edge(Option<Edge>),
}

impl Lattice {
	/// Opens (creating if necessary) a lattice backed by the file at `path`.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let conn = Connection::open(path)?;
		Self::from_connection(conn, StatsMode::None)
	}

	/// Opens a lattice with explicit statistics bookkeeping.
	pub fn open_with_stats(path: impl AsRef<Path>, stats_mode: StatsMode) -> Result<Self> {
		let conn = Connection::open(path)?;
		Self::from_connection(conn, stats_mode)
	}

	/// An ephemeral in-memory lattice, for tests and short-lived sessions.
	pub fn in_memory() -> Result<Self> {
		let conn = Connection::open_in_memory()?;
		Self::from_connection(conn, StatsMode::None)
	}

	/// An ephemeral in-memory lattice with explicit statistics bookkeeping.
	pub fn in_memory_with_stats(stats_mode: StatsMode) -> Result<Self> {
		let conn = Connection::open_in_memory()?;
		Self::from_connection(conn, stats_mode)
	}

	fn from_connection(conn: Connection, stats_mode: StatsMode) -> Result<Self> {
		conn.execute_batch(SCHEMA)?;
		Ok(Self {
			conn: Mutex::new(conn),
			cache: Cache::with_weighter(
				*cnf::LATTICE_CACHE_CAPACITY,
				*cnf::LATTICE_CACHE_CAPACITY as u64,
				UnitWeighter,
			),
			stats_mode,
			snapshots: Mutex::new(Vec::new()),
			tokens_since_snapshot: Mutex::new(0),
		})
	}

	fn bytes_key(bytes: &[u8]) -> u64 {
		use std::hash::{Hash, Hasher};
		let mut h = std::collections::hash_map::DefaultHasher::new();
		bytes.hash(&mut h);
		h.finish()
	}

	/// Looks up a token by its canonical bytes, consulting the cache first.
	pub fn get_token_by_bytes(&self, bytes: &[u8]) -> Result<Option<Token>> {
		let key = CacheKey::ByBytesHash(Self::bytes_key(bytes));
		if let Some(CachedEntry::Token(t)) = self.cache.get(&key) {
			return Ok(t);
		}
		let conn = self.conn.lock().unwrap();
		let hex = hex::encode_upper(bytes);
		let token = conn
			.query_row(
				"SELECT id, bytes, length, occurrences, in_degree, out_degree FROM tokens WHERE bytes = ?1",
				params![hex],
				Self::row_to_token,
			)
			.optional()
			.map_err(Error::StoreReadFailed)?;
		self.cache.insert(key, CachedEntry::Token(token.clone()));
		Ok(token)
	}

	/// Looks up a token by its dense id.
	pub fn get_token_by_id(&self, id: u64) -> Result<Option<Token>> {
		let key = CacheKey::ById(id);
		if let Some(CachedEntry::Token(t)) = self.cache.get(&key) {
			return Ok(t);
		}
		let conn = self.conn.lock().unwrap();
		let token = conn
			.query_row(
				"SELECT id, bytes, length, occurrences, in_degree, out_degree FROM tokens WHERE id = ?1",
				params![id as i64],
				Self::row_to_token,
			)
			.optional()
			.map_err(Error::StoreReadFailed)?;
		self.cache.insert(key, CachedEntry::Token(token.clone()));
		Ok(token)
	}

	/// Looks up an edge by its endpoint token ids.
	pub fn get_edge(&self, from: u64, to: u64) -> Result<Option<Edge>> {
		let key = CacheKey::Edge(from, to);
		if let Some(CachedEntry::Edge(e)) = self.cache.get(&key) {
			return Ok(e);
		}
		let conn = self.conn.lock().unwrap();
		let edge = conn
			.query_row(
				"SELECT from_id, to_id, weight FROM edges WHERE from_id = ?1 AND to_id = ?2",
				params![from as i64, to as i64],
				|row| {
					Ok(Edge {
						from_id: row.get::<_, i64>(0)? as u64,
						to_id: row.get::<_, i64>(1)? as u64,
						weight: row.get::<_, i64>(2)? as u64,
					})
				},
			)
			.optional()
			.map_err(Error::StoreReadFailed)?;
		self.cache.insert(key, CachedEntry::Edge(edge));
		Ok(edge)
	}

	/// The number of distinct predecessors of `to` (spec.md §4.6).
	pub fn count_predecessors(&self, to: u64) -> Result<u64> {
		let conn = self.conn.lock().unwrap();
		let n: i64 = conn
			.query_row(
				"SELECT COUNT(*) FROM edges WHERE to_id = ?1",
				params![to as i64],
				|row| row.get(0),
			)
			.map_err(Error::StoreReadFailed)?;
		Ok(n as u64)
	}

	/// Tokens whose hex form starts with `hex_prefix`, ordered lexicographically.
	pub fn prefix_search(&self, hex_prefix: &str) -> Result<Vec<Token>> {
		let conn = self.conn.lock().unwrap();
		let upper = hex_prefix.to_uppercase();
		let bound = format!("{upper}\u{10FFFF}");
		let mut stmt = conn.prepare(
			"SELECT id, bytes, length, occurrences, in_degree, out_degree FROM tokens \
			 WHERE bytes >= ?1 AND bytes < ?2 ORDER BY bytes ASC",
		)?;
		let rows = stmt
			.query_map(params![upper, bound], Self::row_to_token)
			.map_err(Error::StoreReadFailed)?;
		let mut out = Vec::new();
		for row in rows {
			out.push(row.map_err(Error::StoreReadFailed)?);
		}
		Ok(out)
	}

	/// Outgoing transitions from `from`, with weights normalized to sum to 1
	/// over `from`'s total outgoing weight (spec.md §4.6).
	pub fn refined_transitions_from(&self, from: u64) -> Result<Vec<Transition>> {
		let conn = self.conn.lock().unwrap();
		let mut stmt = conn.prepare("SELECT to_id, weight FROM edges WHERE from_id = ?1")?;
		let rows: Vec<(u64, u64)> = stmt
			.query_map(params![from as i64], |row| {
				Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64))
			})
			.map_err(Error::StoreReadFailed)?
			.collect::<rusqlite::Result<Vec<_>>>()
			.map_err(Error::StoreReadFailed)?;
		let total: u64 = rows.iter().map(|(_, w)| w).sum();
		if total == 0 {
			return Ok(Vec::new());
		}
		Ok(rows
			.into_iter()
			.map(|(to_id, weight)| Transition {
				to_id,
				weight,
				normalized_prob: weight as f64 / total as f64,
			})
			.collect())
	}

	/// A single transaction: inserts any unseen tokens, upserts edge
	/// weights, and bumps occurrence counts (spec.md §4.5).
	///
	/// Partial failure rolls back the whole batch — the lattice is left
	/// exactly as it was before the call. On success, returns the `(bytes,
	/// id)` pair for every token this batch confirmed, so a caller (the
	/// `Ingest` batcher) can hand them to `Sequencer::learn_token` (spec.md
	/// §4.3: the trie holds "the canonical byte forms of tokens the ingest
	/// has confirmed").
	pub fn batch_ingest(&self, tokens: &[TokenDelta], edges: &[EdgeDelta]) -> Result<Vec<(Vec<u8>, u64)>> {
		let mut conn = self.conn.lock().unwrap();
		let tx = conn.transaction().map_err(Error::StoreWriteFailed)?;

		let mut confirmed = Vec::with_capacity(tokens.len());
		for t in tokens {
			let hex = hex::encode_upper(&t.bytes);
			tx.execute(
				"INSERT INTO tokens (bytes, length, occurrences) VALUES (?1, ?2, ?3) \
				 ON CONFLICT(bytes) DO UPDATE SET occurrences = occurrences + excluded.occurrences",
				params![hex, t.bytes.len() as i64, t.occurrences as i64],
			)
			.map_err(Error::StoreWriteFailed)?;
			let id: i64 = tx
				.query_row("SELECT id FROM tokens WHERE bytes = ?1", params![hex], |r| r.get(0))
				.map_err(Error::StoreWriteFailed)?;
			confirmed.push((t.bytes.clone(), id as u64));
		}

		for e in edges {
			let from_hex = hex::encode_upper(&e.from);
			let to_hex = hex::encode_upper(&e.to);
			let from_id: i64 = tx
				.query_row("SELECT id FROM tokens WHERE bytes = ?1", params![from_hex], |r| r.get(0))
				.optional()
				.map_err(Error::StoreWriteFailed)?
				.ok_or_else(|| {
					error!(from = %format!("\\x{from_hex}"), to = %format!("\\x{to_hex}"), "edge references a token never ingested");
					Error::IntegrityViolation {
						from: 0,
						to: 0,
					}
				})?;
			let to_id: i64 = tx
				.query_row("SELECT id FROM tokens WHERE bytes = ?1", params![to_hex], |r| r.get(0))
				.optional()
				.map_err(Error::StoreWriteFailed)?
				.ok_or_else(|| {
					error!(from = %format!("\\x{from_hex}"), to = %format!("\\x{to_hex}"), "edge references a token never ingested");
					Error::IntegrityViolation {
						from: from_id as u64,
						to: 0,
					}
				})?;

			tx.execute(
				"INSERT INTO edges (from_id, to_id, weight) VALUES (?1, ?2, ?3) \
				 ON CONFLICT(from_id, to_id) DO UPDATE SET weight = weight + excluded.weight",
				params![from_id, to_id, e.weight as i64],
			)
			.map_err(Error::StoreWriteFailed)?;
		}

		tx.commit().map_err(Error::StoreWriteFailed)?;
		drop(conn);

		self.clear_caches();
		if matches!(self.stats_mode, StatsMode::Extended) {
			let total_occurrences: u64 = tokens.iter().map(|t| t.occurrences).sum();
			let mut counter = self.tokens_since_snapshot.lock().unwrap();
			*counter += total_occurrences;
			if *counter >= *cnf::STATS_SNAPSHOT_INTERVAL {
				*counter = 0;
				drop(counter);
				self.record_snapshot()?;
			}
		}
		debug!(tokens = tokens.len(), edges = edges.len(), "batch ingest committed");
		Ok(confirmed)
	}

	fn record_snapshot(&self) -> Result<()> {
		let stats = self.stats()?;
		let mut snaps = self.snapshots.lock().unwrap();
		snaps.push((stats.token_count, stats.token_count));
		let cap = 1000;
		if snaps.len() > cap {
			let excess = snaps.len() - cap;
			snaps.drain(0..excess);
		}
		Ok(())
	}

	/// Vocabulary-size-over-time samples recorded while `stats_mode =
	/// extended` (SPEC_FULL.md §9). Empty under any other stats mode.
	pub fn vocab_snapshots(&self) -> Vec<(u64, u64)> {
		self.snapshots.lock().unwrap().clone()
	}

	/// Recomputes `in_degree`/`out_degree` for every token from the edge
	/// table (spec.md §4.5). Idempotent.
	pub fn update_token_degrees(&self) -> Result<()> {
		let conn = self.conn.lock().unwrap();
		conn.execute_batch(
			"UPDATE tokens SET
				out_degree = (SELECT COUNT(*) FROM edges WHERE edges.from_id = tokens.id),
				in_degree = (SELECT COUNT(*) FROM edges WHERE edges.to_id = tokens.id);",
		)
		.map_err(Error::StoreWriteFailed)?;
		drop(conn);
		self.clear_caches();
		Ok(())
	}

	/// Aggregate statistics over the current closed world.
	pub fn stats(&self) -> Result<LatticeStats> {
		let conn = self.conn.lock().unwrap();
		let token_count: i64 = conn.query_row("SELECT COUNT(*) FROM tokens", [], |r| r.get(0))?;
		let edge_count: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;

		let mut degrees: Vec<u32> = Vec::new();
		{
			let mut stmt = conn.prepare("SELECT in_degree + out_degree FROM tokens")?;
			let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
			for row in rows {
				degrees.push(row? as u32);
			}
		}
		degrees.sort_unstable();

		let mean_degree = if degrees.is_empty() {
			0.0
		} else {
			degrees.iter().map(|&d| d as f64).sum::<f64>() / degrees.len() as f64
		};
		let median_degree = if degrees.is_empty() {
			0.0
		} else if degrees.len() % 2 == 1 {
			degrees[degrees.len() / 2] as f64
		} else {
			let mid = degrees.len() / 2;
			(degrees[mid - 1] as f64 + degrees[mid] as f64) / 2.0
		};
		let max_degree = degrees.last().copied().unwrap_or(0);

		Ok(LatticeStats {
			token_count: token_count as u64,
			edge_count: edge_count as u64,
			mean_degree,
			median_degree,
			max_degree,
		})
	}

	/// Drops every cached query result. Writes already invalidate the
	/// entries they touch; this is for a host that wants a cold start.
	pub fn clear_caches(&self) {
		self.cache.clear();
	}

	/// Flushes and releases the underlying connection.
	pub fn close(self) -> Result<()> {
		let conn = self.conn.into_inner().unwrap();
		conn.execute_batch("PRAGMA optimize;")?;
		Ok(())
	}

	fn row_to_token(row: &rusqlite::Row) -> rusqlite::Result<Token> {
		let hex_bytes: String = row.get(1)?;
		let bytes = hex::decode(&hex_bytes).unwrap_or_default();
		Ok(Token {
			id: row.get::<_, i64>(0)? as u64,
			bytes,
			length: row.get::<_, i64>(2)? as u32,
			occurrences: row.get::<_, i64>(3)? as u64,
			in_degree: row.get::<_, i64>(4)? as u32,
			out_degree: row.get::<_, i64>(5)? as u32,
		})
	}
}
