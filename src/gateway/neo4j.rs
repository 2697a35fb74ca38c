//! Neo4j adapter over the Bolt driver.
//!
//! The pool is built on first use, so the backend starts even when the
//! database is down; each request then reports the outage on its own.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use neo4rs::{ConfigBuilder, Graph, Node, Query, Relation, Row};
use tokio::sync::OnceCell;

use super::{GraphQuery, GraphStore, StoreError, StoreSession};
use crate::config::StoreConfig;
use crate::graph::{NodeRecord, Properties, PropertyValue, RawRow, RelationshipRecord};

impl From<neo4rs::Error> for StoreError {
	fn from(err: neo4rs::Error) -> Self {
		use neo4rs::Error as E;
		match err {
			// A FAILURE summary from the server: bad statement or parameters.
			E::UnexpectedMessage(msg) => StoreError::Query(msg),
			decode @ (E::DeserializationError(_) | E::ConversionError | E::UnknownType(_) | E::InvalidTypeMarker(_)) => {
				StoreError::Decode(decode.to_string())
			}
			other => StoreError::Unavailable(other.to_string()),
		}
	}
}

/// Lazily connected Neo4j database.
pub struct Neo4jStore {
	config: StoreConfig,
	graph: OnceCell<Arc<Graph>>,
}

impl Neo4jStore {
	/// Store for `config`; nothing connects until the first session.
	pub fn new(config: StoreConfig) -> Self {
		Self {
			config,
			graph: OnceCell::new(),
		}
	}

	async fn connect(config: &StoreConfig) -> Result<Arc<Graph>, StoreError> {
		let mut builder = ConfigBuilder::default()
			.uri(config.uri.as_str())
			.user(config.user.as_str())
			.password(config.password.as_str());
		if let Some(db) = &config.database {
			builder = builder.db(db.as_str());
		}
		let neo4j_config = builder
			.build()
			.map_err(|e| StoreError::Unavailable(format!("invalid Neo4j configuration: {}", e)))?;
		let graph = Graph::connect(neo4j_config).await?;
		info!("connected to Neo4j at {}", config.uri);
		Ok(Arc::new(graph))
	}
}

/// A lease on the pool for one query. The pooled connection goes back when
/// the row stream is dropped at the end of [`StoreSession::run`].
pub struct Neo4jSession {
	graph: Arc<Graph>,
}

#[async_trait]
impl GraphStore for Neo4jStore {
	type Session = Neo4jSession;

	async fn open_session(&self) -> Result<Neo4jSession, StoreError> {
		let graph = self
			.graph
			.get_or_try_init(|| Self::connect(&self.config))
			.await?;
		Ok(Neo4jSession {
			graph: Arc::clone(graph),
		})
	}
}

#[async_trait]
impl StoreSession for Neo4jSession {
	async fn run(&mut self, query: &GraphQuery) -> Result<Vec<RawRow>, StoreError> {
		let mut q = Query::new(query.cypher.to_string());
		for (key, value) in &query.params {
			q = q.param(key, value.as_str());
		}
		let mut stream = self.graph.execute(q).await?;
		let mut rows = Vec::new();
		while let Some(row) = stream.next().await? {
			rows.push(decode_row(&row)?);
		}
		debug!("neo4j returned {} rows", rows.len());
		Ok(rows)
	}
}

fn decode_row(row: &Row) -> Result<RawRow, StoreError> {
	let start = row
		.get::<Option<Node>>("n")
		.map_err(|e| StoreError::Decode(e.to_string()))?;
	let relationship = row
		.get::<Option<Relation>>("r")
		.map_err(|e| StoreError::Decode(e.to_string()))?;
	let end = row
		.get::<Option<Node>>("m")
		.map_err(|e| StoreError::Decode(e.to_string()))?;

	Ok(RawRow {
		start: start.as_ref().map(node_record).transpose()?,
		relationship: relationship.as_ref().map(relationship_record).transpose()?,
		end: end.as_ref().map(node_record).transpose()?,
	})
}

fn node_record(node: &Node) -> Result<NodeRecord, StoreError> {
	let mut properties = Properties::new();
	for key in node.keys() {
		let key: &str = key.as_ref();
		let value = node
			.get::<serde_json::Value>(key)
			.map_err(|e| StoreError::Decode(format!("node {} property {}: {}", node.id(), key, e)))?;
		properties.insert(key.to_string(), PropertyValue::from(value));
	}
	Ok(NodeRecord {
		identity: node.id(),
		labels: node.labels().iter().map(|l| l.to_string()).collect(),
		properties,
	})
}

fn relationship_record(rel: &Relation) -> Result<RelationshipRecord, StoreError> {
	let mut properties = Properties::new();
	for key in rel.keys() {
		let key: &str = key.as_ref();
		let value = rel
			.get::<serde_json::Value>(key)
			.map_err(|e| StoreError::Decode(format!("relationship {} property {}: {}", rel.id(), key, e)))?;
		properties.insert(key.to_string(), PropertyValue::from(value));
	}
	Ok(RelationshipRecord {
		identity: rel.id(),
		start: rel.start_node_id(),
		end: rel.end_node_id(),
		kind: rel.typ().to_string(),
		properties,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_failures_are_query_errors() {
		let err = StoreError::from(neo4rs::Error::UnexpectedMessage("Neo.ClientError.Statement.SyntaxError".into()));
		assert!(matches!(err, StoreError::Query(msg) if msg.contains("SyntaxError")));
	}

	#[test]
	fn unreadable_values_are_decode_errors() {
		assert!(matches!(StoreError::from(neo4rs::Error::ConversionError), StoreError::Decode(_)));
		assert!(matches!(
			StoreError::from(neo4rs::Error::UnknownType("0x42".into())),
			StoreError::Decode(_)
		));
	}

	#[test]
	fn connectivity_failures_are_unavailable() {
		let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		assert!(matches!(StoreError::from(neo4rs::Error::from(refused)), StoreError::Unavailable(_)));
		assert!(matches!(StoreError::from(neo4rs::Error::ConnectionError), StoreError::Unavailable(_)));
		assert!(matches!(
			StoreError::from(neo4rs::Error::AuthenticationError("bad credentials".into())),
			StoreError::Unavailable(_)
		));
	}

	#[tokio::test]
	async fn scoped_syntax_failure_is_an_empty_graph() {
		use crate::gateway::Gateway;
		use crate::gateway::testing::{MemoryStore, building};

		let store = MemoryStore {
			fail_run: Some(|| StoreError::from(neo4rs::Error::UnexpectedMessage("FAILURE".into()))),
			..building()
		};
		let gw = Gateway::new(store);
		assert!(gw.fetch_graph(Some("G1")).await.unwrap().is_empty());
	}
}
