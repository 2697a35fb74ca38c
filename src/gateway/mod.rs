//! Graph Query Gateway.
//!
//! Builds one of two parameterized traversals, runs it in a store session that
//! lives exactly as long as the query, and hands the rows to the materializer.

pub mod http;
#[cfg(feature = "server")]
pub mod neo4j;

use std::time::Instant;

use async_trait::async_trait;
use log::{error, info, warn};
use thiserror::Error;

use crate::graph::{MaterializedGraph, RawRow, materialize};

/// Every node with each outgoing relationship; isolated nodes come back with
/// null `r` and `m`.
pub const FULL_GRAPH_QUERY: &str = "MATCH (n) OPTIONAL MATCH (n)-[r]->(m) RETURN n, r, m";

/// The node whose domain identifier equals `$guid` and its one-hop
/// neighbourhood in either direction.
pub const SCOPED_GRAPH_QUERY: &str = "MATCH (n) WHERE n.GUID = $guid OR n.GlobalId = $guid OPTIONAL MATCH (n)-[r]-(m) RETURN n, r, m";

/// Failures reported by a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The store could not be reached or refused the login.
	#[error("graph store unavailable: {0}")]
	Unavailable(String),
	/// The store rejected the statement.
	#[error("query failed: {0}")]
	Query(String),
	/// A row did not have the expected shape.
	#[error("could not decode row: {0}")]
	Decode(String),
}

/// Failures surfaced to Gateway callers. A scope that matches nothing is not
/// an error.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// Connectivity or decoding failure.
	#[error("transport error: {0}")]
	Transport(String),
	/// The unscoped traversal was rejected.
	#[error("query error: {0}")]
	Query(String),
}

/// Which slice of the graph to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
	/// The whole graph.
	All,
	/// One node and its neighbours.
	Centered(String),
	/// A scope that can never match, such as a blank GUID.
	Malformed,
}

impl Scope {
	/// `None` is the whole graph; the GUID is trimmed.
	pub fn from_guid(guid: Option<&str>) -> Self {
		match guid {
			None => Scope::All,
			Some(g) if g.trim().is_empty() => Scope::Malformed,
			Some(g) => Scope::Centered(g.trim().to_string()),
		}
	}
}

/// A Cypher statement with its string parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphQuery {
	/// Statement text.
	pub cypher: &'static str,
	/// Named parameters.
	pub params: Vec<(&'static str, String)>,
}

impl GraphQuery {
	/// [`FULL_GRAPH_QUERY`].
	pub fn full() -> Self {
		Self {
			cypher: FULL_GRAPH_QUERY,
			params: Vec::new(),
		}
	}

	/// [`SCOPED_GRAPH_QUERY`] bound to `guid`.
	pub fn centered(guid: &str) -> Self {
		Self {
			cypher: SCOPED_GRAPH_QUERY,
			params: vec![("guid", guid.to_string())],
		}
	}
}

/// A connection lease. Dropping the session releases it.
#[async_trait]
pub trait StoreSession: Send {
	/// Runs one statement and returns every row.
	async fn run(&mut self, query: &GraphQuery) -> Result<Vec<RawRow>, StoreError>;
}

/// A property-graph store able to open sessions.
#[async_trait]
pub trait GraphStore: Send + Sync {
	/// Lease type.
	type Session: StoreSession;

	/// Leases a session for one query.
	async fn open_session(&self) -> Result<Self::Session, StoreError>;
}

/// Runs scoped or unscoped traversals against a store.
pub struct Gateway<S> {
	store: S,
}

impl<S: GraphStore> Gateway<S> {
	/// Gateway over `store`.
	pub fn new(store: S) -> Self {
		Self { store }
	}

	/// The wrapped store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Raw rows for `scope_guid`: the whole graph when `None`, the one-hop
	/// neighbourhood of the matching node otherwise.
	pub async fn fetch_rows(&self, scope_guid: Option<&str>) -> Result<Vec<RawRow>, GatewayError> {
		let scope = Scope::from_guid(scope_guid);
		let query = match &scope {
			Scope::All => GraphQuery::full(),
			Scope::Centered(guid) => GraphQuery::centered(guid),
			Scope::Malformed => {
				warn!("ignoring malformed scope {:?}", scope_guid);
				return Ok(Vec::new());
			}
		};

		let started = Instant::now();
		let rows = {
			let mut session = self.store.open_session().await.map_err(|e| {
				error!("could not open store session: {}", e);
				GatewayError::Transport(e.to_string())
			})?;
			// The session is dropped at the end of this block on every path.
			session.run(&query).await
		};

		match rows {
			Ok(rows) => {
				info!(
					"graph query scope={:?} rows={} elapsed_ms={}",
					scope,
					rows.len(),
					started.elapsed().as_millis()
				);
				Ok(rows)
			}
			Err(StoreError::Query(msg)) if scope != Scope::All => {
				warn!("scoped query for {:?} failed, returning empty graph: {}", scope, msg);
				Ok(Vec::new())
			}
			Err(StoreError::Query(msg)) => {
				error!("graph query failed: {}", msg);
				Err(GatewayError::Query(msg))
			}
			Err(e) => {
				error!("graph query failed: {}", e);
				Err(GatewayError::Transport(e.to_string()))
			}
		}
	}

	/// Fetches and materializes in one step.
	pub async fn fetch_graph(&self, scope_guid: Option<&str>) -> Result<MaterializedGraph, GatewayError> {
		self.fetch_rows(scope_guid).await.map(materialize)
	}
}

/// Failures seen by a graph consumer.
#[derive(Debug, Error)]
pub enum FetchError {
	/// The request never got an answer.
	#[error("request failed: {0}")]
	Transport(String),
	/// The backend answered with a failure envelope.
	#[error("server answered {status}: {message}")]
	Rejected {
		/// HTTP status.
		status: u16,
		/// Envelope `message`.
		message: String,
	},
	/// The body was not a graph envelope.
	#[error("malformed response: {0}")]
	Decode(String),
}

impl From<GatewayError> for FetchError {
	fn from(err: GatewayError) -> Self {
		match err {
			GatewayError::Transport(msg) => FetchError::Transport(msg),
			GatewayError::Query(message) => FetchError::Rejected { status: 500, message },
		}
	}
}

/// Anything that can produce a materialized graph for a scope. The browser
/// talks to the backend over HTTP; tests and embedded uses go straight to a
/// [`Gateway`].
#[async_trait(?Send)]
pub trait GraphSource {
	/// Materialized graph for `scope_guid`, or the whole graph for `None`.
	async fn fetch_graph(&self, scope_guid: Option<&str>) -> Result<MaterializedGraph, FetchError>;
}

#[async_trait(?Send)]
impl<S: GraphStore> GraphSource for Gateway<S> {
	async fn fetch_graph(&self, scope_guid: Option<&str>) -> Result<MaterializedGraph, FetchError> {
		Gateway::fetch_graph(self, scope_guid).await.map_err(FetchError::from)
	}
}

#[cfg(test)]
pub(crate) mod testing {
	//! In-memory store doubles.

	use std::sync::Arc;
	use std::sync::Mutex;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::graph::{NodeRecord, RelationshipRecord};

	/// Serves rows from memory, matching the two traversals the Gateway issues.
	#[derive(Clone, Default)]
	pub struct MemoryStore {
		pub nodes: Vec<NodeRecord>,
		pub relationships: Vec<RelationshipRecord>,
		pub fail_open: bool,
		pub fail_run: Option<fn() -> StoreError>,
		pub open_sessions: Arc<AtomicUsize>,
		pub sessions_opened: Arc<AtomicUsize>,
		pub queries: Arc<Mutex<Vec<GraphQuery>>>,
	}

	pub struct MemorySession {
		store: MemoryStore,
	}

	impl Drop for MemorySession {
		fn drop(&mut self) {
			self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
		}
	}

	impl MemoryStore {
		pub fn with(nodes: Vec<NodeRecord>, relationships: Vec<RelationshipRecord>) -> Self {
			Self {
				nodes,
				relationships,
				..Self::default()
			}
		}

		fn node(&self, id: i64) -> Option<NodeRecord> {
			self.nodes.iter().find(|n| n.identity == id).cloned()
		}

		fn rows_for(&self, query: &GraphQuery) -> Vec<RawRow> {
			let mut rows = Vec::new();
			let guid = query.params.iter().find(|(k, _)| *k == "guid").map(|(_, v)| v.as_str());
			for n in &self.nodes {
				if let Some(guid) = guid {
					let hit = crate::graph::GUID_KEYS
						.iter()
						.any(|k| n.properties.get(*k).and_then(|v| v.as_str()) == Some(guid));
					if !hit {
						continue;
					}
				}
				let mut any = false;
				for r in &self.relationships {
					let other = if r.start == n.identity {
						Some(r.end)
					} else if guid.is_some() && r.end == n.identity {
						Some(r.start)
					} else {
						None
					};
					if let Some(other) = other.and_then(|id| self.node(id)) {
						rows.push(RawRow::linked(n.clone(), r.clone(), other));
						any = true;
					}
				}
				if !any {
					rows.push(RawRow::node(n.clone()));
				}
			}
			rows
		}
	}

	#[async_trait]
	impl StoreSession for MemorySession {
		async fn run(&mut self, query: &GraphQuery) -> Result<Vec<RawRow>, StoreError> {
			self.store.queries.lock().unwrap().push(query.clone());
			if let Some(fail) = self.store.fail_run {
				return Err(fail());
			}
			Ok(self.store.rows_for(query))
		}
	}

	#[async_trait]
	impl GraphStore for MemoryStore {
		type Session = MemorySession;

		async fn open_session(&self) -> Result<MemorySession, StoreError> {
			if self.fail_open {
				return Err(StoreError::Unavailable("connection refused".into()));
			}
			self.open_sessions.fetch_add(1, Ordering::SeqCst);
			self.sessions_opened.fetch_add(1, Ordering::SeqCst);
			Ok(MemorySession { store: self.clone() })
		}
	}

	pub fn record(id: i64, label: &str, guid: &str) -> NodeRecord {
		NodeRecord {
			identity: id,
			labels: vec![label.to_string()],
			properties: [("GlobalId".to_string(), crate::graph::PropertyValue::text(guid))]
				.into_iter()
				.collect(),
		}
	}

	pub fn relation(id: i64, start: i64, end: i64, kind: &str) -> RelationshipRecord {
		RelationshipRecord {
			identity: id,
			start,
			end,
			kind: kind.to_string(),
			properties: Default::default(),
		}
	}

	/// Wall(1) -CONTAINS-> Door(2), Slab(3) -SUPPORTS-> Wall(1), Space(4) alone.
	pub fn building() -> MemoryStore {
		MemoryStore::with(
			vec![
				record(1, "Wall", "G1"),
				record(2, "Door", "G2"),
				record(3, "Slab", "G3"),
				record(4, "Space", "G4"),
			],
			vec![relation(10, 1, 2, "CONTAINS"), relation(11, 3, 1, "SUPPORTS")],
		)
	}
}
