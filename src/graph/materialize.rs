//! Row-to-graph materialization.
//!
//! A traversal returns the same node many times, once per row it takes part
//! in, and sometimes with a different property snapshot each time. Nodes are
//! deduplicated by store identity with the first snapshot kept; relationship
//! occurrences are appended as they come.

use std::collections::HashSet;

use log::{debug, warn};

use super::{GraphLink, GraphNode, MaterializedGraph, Properties};

/// A node as delivered by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
	/// Store-internal identity.
	pub identity: i64,
	/// Node labels.
	pub labels: Vec<String>,
	/// Node properties.
	pub properties: Properties,
}

/// A relationship as delivered by the store, carrying its own direction.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipRecord {
	/// Store-internal identity.
	pub identity: i64,
	/// Identity of the start node.
	pub start: i64,
	/// Identity of the end node.
	pub end: i64,
	/// Relationship type.
	pub kind: String,
	/// Relationship properties.
	pub properties: Properties,
}

/// One result row: `n`, `r`, `m` in query order. `r` and `m` are absent for
/// nodes without a matching relationship.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
	/// `n`.
	pub start: Option<NodeRecord>,
	/// `r`.
	pub relationship: Option<RelationshipRecord>,
	/// `m`.
	pub end: Option<NodeRecord>,
}

impl RawRow {
	/// A row for a node without relationships.
	pub fn node(start: NodeRecord) -> Self {
		Self {
			start: Some(start),
			..Self::default()
		}
	}

	/// A row for one relationship and its far node.
	pub fn linked(start: NodeRecord, relationship: RelationshipRecord, end: NodeRecord) -> Self {
		Self {
			start: Some(start),
			relationship: Some(relationship),
			end: Some(end),
		}
	}
}

impl NodeRecord {
	fn key(&self) -> String {
		self.identity.to_string()
	}

	fn into_node(self) -> GraphNode {
		GraphNode {
			id: self.identity.to_string(),
			labels: self.labels,
			properties: self.properties,
		}
	}
}

#[derive(Default)]
struct Builder {
	seen: HashSet<String>,
	graph: MaterializedGraph,
	skipped_links: usize,
}

impl Builder {
	fn add_node(&mut self, record: NodeRecord) -> String {
		let key = record.key();
		if self.seen.insert(key.clone()) {
			self.graph.nodes.push(record.into_node());
		}
		key
	}

	fn add_link(&mut self, row_ends: (&str, &str), rel: RelationshipRecord) {
		let (source, target) = (rel.start.to_string(), rel.end.to_string());
		let ends_match = (source == row_ends.0 && target == row_ends.1)
			|| (source == row_ends.1 && target == row_ends.0);
		if !ends_match || !self.seen.contains(&source) || !self.seen.contains(&target) {
			warn!(
				"skipping relationship {} ({}): endpoints {}->{} not among row nodes {}/{}",
				rel.identity, rel.kind, source, target, row_ends.0, row_ends.1
			);
			self.skipped_links += 1;
			return;
		}
		self.graph.links.push(GraphLink {
			source,
			target,
			kind: rel.kind,
			properties: rel.properties,
		});
	}
}

/// Turns raw rows into a canonical graph.
///
/// Node order is first-encounter order. A relationship contributes a link only
/// when both row endpoints are present and match its own endpoints; anything
/// else is logged and skipped without aborting the rest.
pub fn materialize<I>(rows: I) -> MaterializedGraph
where
	I: IntoIterator<Item = RawRow>,
{
	let mut builder = Builder::default();
	let mut row_count = 0usize;

	for row in rows {
		row_count += 1;
		let start = row.start.map(|n| builder.add_node(n));
		let end = row.end.map(|n| builder.add_node(n));

		match (start, row.relationship, end) {
			(Some(s), Some(rel), Some(e)) => builder.add_link((s.as_str(), e.as_str()), rel),
			(_, Some(rel), _) => {
				warn!("skipping relationship {} ({}): missing endpoint in row", rel.identity, rel.kind);
				builder.skipped_links += 1;
			}
			_ => {}
		}
	}

	debug!(
		"materialized {} rows into {} nodes, {} links ({} skipped)",
		row_count,
		builder.graph.nodes.len(),
		builder.graph.links.len(),
		builder.skipped_links
	);
	builder.graph
}
