//! Canonical node/link graph produced from property-graph query rows.

pub mod materialize;
pub mod value;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use materialize::{NodeRecord, RawRow, RelationshipRecord, materialize};
pub use value::{Properties, PropertyValue, Scalar};

/// Property keys that carry the domain identifier, in lookup order.
pub const GUID_KEYS: &[&str] = &["GUID", "GlobalId"];

/// A node keyed by the store's internal identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	/// Store identity as a string.
	pub id: String,
	/// Labels in store order; the store never repeats a label on one node.
	pub labels: Vec<String>,
	/// Properties as stored, classified once.
	pub properties: Properties,
}

/// One relationship occurrence. Parallel links are kept, never merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
	/// Id of the relationship's start node.
	pub source: String,
	/// Id of the relationship's end node.
	pub target: String,
	/// Relationship type, `type` on the wire.
	#[serde(rename = "type")]
	pub kind: String,
	/// Relationship properties.
	pub properties: Properties,
}

/// Deduplicated nodes and the links between them, ready to render.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializedGraph {
	/// Unique by id, in first-seen order.
	pub nodes: Vec<GraphNode>,
	/// Every endpoint names a node in `nodes`.
	pub links: Vec<GraphLink>,
}

impl GraphNode {
	/// Domain identifier used to correlate with the 3D model, if any.
	pub fn guid(&self) -> Option<&str> {
		GUID_KEYS
			.iter()
			.filter_map(|key| self.properties.get(*key))
			.filter_map(PropertyValue::as_str)
			.find(|s| !s.is_empty())
	}
}

impl MaterializedGraph {
	/// No nodes at all.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Node by store id.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Whether a node with this id is present.
	pub fn contains(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	/// Node carrying this domain identifier.
	pub fn find_by_guid(&self, guid: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.guid() == Some(guid))
	}

	/// Checks the two structural invariants: unique node ids and links that
	/// only reference nodes of this graph.
	pub fn is_consistent(&self) -> bool {
		let mut ids = HashSet::with_capacity(self.nodes.len());
		if !self.nodes.iter().all(|n| ids.insert(n.id.as_str())) {
			return false;
		}
		self.links
			.iter()
			.all(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn guid_prefers_guid_then_global_id() {
		let node: GraphNode = serde_json::from_value(json!({
			"id": "7",
			"labels": ["Wall"],
			"properties": {"GlobalId": "G7"}
		}))
		.unwrap();
		assert_eq!(node.guid(), Some("G7"));

		let both: GraphNode = serde_json::from_value(json!({
			"id": "8",
			"labels": [],
			"properties": {"GUID": "A", "GlobalId": "B"}
		}))
		.unwrap();
		assert_eq!(both.guid(), Some("A"));
	}

	#[test]
	fn link_type_uses_wire_name() {
		let link = GraphLink {
			source: "1".into(),
			target: "2".into(),
			kind: "REL".into(),
			properties: Properties::new(),
		};
		let v = serde_json::to_value(&link).unwrap();
		assert_eq!(v["type"], "REL");
	}
}
