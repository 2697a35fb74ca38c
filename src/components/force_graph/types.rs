//! Render-side records derived once per materialized graph.

use std::collections::HashMap;

use crate::graph::{GraphNode, MaterializedGraph};

/// Property keys tried, in order, for a node's caption.
pub const NAME_KEYS: &[&str] = &["Name", "name", "LongName", "Tag", "title"];

/// Distance between the midpoints of neighbouring parallel links.
pub const LANE_SPACING: f64 = 14.0;

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

#[derive(Clone, Debug, PartialEq)]
pub struct NodeInfo {
	pub label: String,
	pub color: &'static str,
	pub guid: Option<String>,
}

/// A link resolved to layout slots. `lane` separates parallel links between
/// the same pair of nodes and is measured along the link's own direction;
/// for self-loops it is the loop's nesting depth.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeInfo {
	pub source: usize,
	pub target: usize,
	pub kind: String,
	pub lane: i32,
}

impl EdgeInfo {
	pub fn is_loop(&self) -> bool {
		self.source == self.target
	}
}

/// Human-readable caption: the first non-blank candidate property, then the
/// first label, then the node id.
pub fn display_name(node: &GraphNode) -> String {
	NAME_KEYS
		.iter()
		.filter_map(|key| node.properties.get(*key))
		.find(|value| !value.is_blank())
		.and_then(|value| value.display_text())
		.or_else(|| node.labels.first().cloned())
		.unwrap_or_else(|| node.id.clone())
}

/// Cuts `text` to `budget` characters plus an ellipsis.
pub fn truncate(text: &str, budget: usize) -> String {
	if text.chars().count() <= budget {
		return text.to_string();
	}
	let mut cut: String = text.chars().take(budget).collect();
	cut.push('…');
	cut
}

/// Nodes sharing a first label share a color.
fn color_for(node: &GraphNode, palette: &mut HashMap<String, &'static str>) -> &'static str {
	let key = node.labels.first().cloned().unwrap_or_default();
	let next = COLORS[palette.len() % COLORS.len()];
	*palette.entry(key).or_insert(next)
}

pub fn node_infos(graph: &MaterializedGraph, label_budget: usize) -> Vec<NodeInfo> {
	let mut palette = HashMap::new();
	graph
		.nodes
		.iter()
		.map(|node| NodeInfo {
			label: truncate(&display_name(node), label_budget),
			color: color_for(node, &mut palette),
			guid: node.guid().map(str::to_string),
		})
		.collect()
}

/// Resolves links to slots through `slot_of` and numbers parallel links
/// 0, 1, -1, 2, -2, ... per unordered node pair, counted in the direction
/// from the lower slot to the higher one.
pub fn edge_infos(graph: &MaterializedGraph, slot_of: impl Fn(&str) -> Option<usize>) -> Vec<EdgeInfo> {
	let mut seen: HashMap<(usize, usize), i32> = HashMap::new();
	graph
		.links
		.iter()
		.filter_map(|link| {
			let (source, target) = (slot_of(&link.source)?, slot_of(&link.target)?);
			let count = seen.entry((source.min(target), source.max(target))).or_insert(0);
			let n = *count;
			*count += 1;
			let lane = if n % 2 == 0 { -(n / 2) } else { n / 2 + 1 };
			// A reversed link's normal points the other way; loops nest outward.
			let lane = match source.cmp(&target) {
				std::cmp::Ordering::Less => lane,
				std::cmp::Ordering::Greater => -lane,
				std::cmp::Ordering::Equal => n,
			};
			Some(EdgeInfo {
				source,
				target,
				kind: link.kind.clone(),
				lane,
			})
		})
		.collect()
}

/// Control point of the quadratic curve drawn for a link on `lane` from
/// `from` to `to`; `None` when the endpoints coincide.
pub fn lane_control_point(from: (f64, f64), to: (f64, f64), lane: i32) -> Option<(f64, f64)> {
	let (dx, dy) = (to.0 - from.0, to.1 - from.1);
	let len = (dx * dx + dy * dy).sqrt();
	if len < 1e-6 {
		return None;
	}
	let (ux, uy) = (dx / len, dy / len);
	// The curve's midpoint sits one lane spacing per lane off the straight line.
	let bend = lane as f64 * LANE_SPACING * 2.0;
	Some(((from.0 + to.0) / 2.0 - uy * bend, (from.1 + to.1) / 2.0 + ux * bend))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{GraphLink, PropertyValue};
	use pretty_assertions::assert_eq;

	fn node(id: &str, labels: &[&str], props: &[(&str, &str)]) -> GraphNode {
		GraphNode {
			id: id.to_string(),
			labels: labels.iter().map(|l| l.to_string()).collect(),
			properties: props
				.iter()
				.map(|(k, v)| (k.to_string(), PropertyValue::text(*v)))
				.collect(),
		}
	}

	#[test]
	fn caption_falls_back_through_keys_then_label_then_id() {
		assert_eq!(display_name(&node("1", &["Wall"], &[("Tag", "T-1"), ("Name", "Basic Wall")])), "Basic Wall");
		assert_eq!(display_name(&node("1", &["Wall"], &[("Name", " "), ("LongName", "Long")])), "Long");
		assert_eq!(display_name(&node("1", &["Wall"], &[("GlobalId", "G1")])), "Wall");
		assert_eq!(display_name(&node("1", &[], &[])), "1");
	}

	#[test]
	fn long_captions_are_cut_with_ellipsis() {
		assert_eq!(truncate("Basic Wall", 18), "Basic Wall");
		assert_eq!(truncate("Basic Wall:Interior - 138mm", 18), "Basic Wall:Interio…");
		assert_eq!(truncate("ÄÖÜäöü", 3), "ÄÖÜ…");
	}

	fn pair_graph(links: &[(&str, &str)]) -> MaterializedGraph {
		MaterializedGraph {
			nodes: vec![node("1", &[], &[]), node("2", &[], &[])],
			links: links
				.iter()
				.map(|(s, t)| GraphLink {
					source: s.to_string(),
					target: t.to_string(),
					kind: "REL".into(),
					properties: Default::default(),
				})
				.collect(),
		}
	}

	fn slot(id: &str) -> Option<usize> {
		id.parse::<usize>().ok().map(|n| n - 1)
	}

	#[test]
	fn lanes_follow_each_links_direction() {
		let graph = pair_graph(&[("1", "2"), ("2", "1"), ("1", "2"), ("1", "1"), ("1", "1")]);
		let lanes: Vec<_> = edge_infos(&graph, slot).iter().map(|e| e.lane).collect();
		assert_eq!(lanes, vec![0, -1, -1, 0, 1]);
	}

	#[test]
	fn parallel_links_in_both_directions_never_share_a_curve() {
		let graph = pair_graph(&[("1", "2"), ("2", "1"), ("1", "2"), ("2", "1"), ("1", "2")]);
		let positions = [(0.0, 0.0), (100.0, 0.0)];
		let controls: Vec<(f64, f64)> = edge_infos(&graph, slot)
			.iter()
			.map(|e| lane_control_point(positions[e.source], positions[e.target], e.lane).unwrap())
			.collect();
		for (i, a) in controls.iter().enumerate() {
			for b in &controls[i + 1..] {
				assert!((a.0 - b.0).abs() + (a.1 - b.1).abs() > 1.0, "{:?} overlaps {:?}", a, b);
			}
		}
	}

	#[test]
	fn coincident_endpoints_have_no_control_point() {
		assert_eq!(lane_control_point((5.0, 5.0), (5.0, 5.0), 1), None);
		assert_eq!(lane_control_point((0.0, 0.0), (100.0, 0.0), 0), Some((50.0, 0.0)));
	}

	#[test]
	fn same_label_same_color() {
		let graph = MaterializedGraph {
			nodes: vec![node("1", &["Wall"], &[]), node("2", &["Door"], &[]), node("3", &["Wall"], &[])],
			links: vec![],
		};
		let infos = node_infos(&graph, 18);
		assert_eq!(infos[0].color, infos[2].color);
		assert_ne!(infos[0].color, infos[1].color);
	}
}
