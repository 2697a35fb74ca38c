//! Force Layout Engine.
//!
//! `force_graph` supplies pairwise repulsion and velocity integration. On top
//! of it each tick applies a rest-length link pass, a centering pass and the
//! drag pins, all scaled by an `alpha` that decays toward `alpha_target`.
//!
//! Per-node layout state lives in [`SimulationNode`] slots owned here and
//! joined to the graph by node id; the materialized graph itself is never
//! written to.

use std::collections::HashMap;
use std::f32::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use crate::config::LayoutConfig;
use crate::graph::MaterializedGraph;

/// Mutable layout record for one graph node.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationNode {
	pub id: String,
	pub x: f32,
	pub y: f32,
	pub vx: f32,
	pub vy: f32,
	pub fx: Option<f32>,
	pub fy: Option<f32>,
}

impl SimulationNode {
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

pub struct LayoutEngine {
	config: LayoutConfig,
	physics: ForceGraph<usize, ()>,
	handles: Vec<DefaultNodeIdx>,
	nodes: Vec<SimulationNode>,
	index: HashMap<String, usize>,
	springs: Vec<(usize, usize)>,
	center: (f32, f32),
	alpha: f32,
	alpha_target: f32,
}

impl LayoutEngine {
	pub fn new(config: LayoutConfig, center: (f32, f32)) -> Self {
		let physics = Self::physics(&config);
		Self {
			config,
			physics,
			handles: Vec::new(),
			nodes: Vec::new(),
			index: HashMap::new(),
			springs: Vec::new(),
			center,
			alpha: 0.0,
			alpha_target: 0.0,
		}
	}

	fn physics(config: &LayoutConfig) -> ForceGraph<usize, ()> {
		ForceGraph::new(SimulationParameters {
			force_charge: config.charge,
			force_spring: config.spring,
			force_max: config.max_force,
			node_speed: config.node_speed,
			damping_factor: config.damping,
		})
	}

	/// Discards every position and restarts from a ring around the center.
	pub fn reset(&mut self, graph: &MaterializedGraph) {
		self.physics = Self::physics(&self.config);
		self.handles.clear();
		self.nodes.clear();
		self.index.clear();
		self.springs.clear();

		let count = graph.nodes.len().max(1) as f32;
		for (slot, node) in graph.nodes.iter().enumerate() {
			let angle = slot as f32 * 2.0 * PI / count;
			let (x, y) = (
				self.center.0 + self.config.seed_radius * angle.cos(),
				self.center.1 + self.config.seed_radius * angle.sin(),
			);
			let handle = self.physics.add_node(NodeData {
				x,
				y,
				mass: self.config.node_mass,
				is_anchor: false,
				user_data: slot,
			});
			self.handles.push(handle);
			self.index.insert(node.id.clone(), slot);
			self.nodes.push(SimulationNode {
				id: node.id.clone(),
				x,
				y,
				vx: 0.0,
				vy: 0.0,
				fx: None,
				fy: None,
			});
		}

		for link in &graph.links {
			let (Some(&source), Some(&target)) = (self.index.get(&link.source), self.index.get(&link.target))
			else {
				continue;
			};
			if source == target {
				continue;
			}
			self.physics
				.add_edge(self.handles[source], self.handles[target], EdgeData::default());
			self.springs.push((source, target));
		}

		self.alpha = 1.0;
		self.alpha_target = 0.0;
		debug!(
			"layout reset: {} nodes, {} springs",
			self.nodes.len(),
			self.springs.len()
		);
	}

	pub fn nodes(&self) -> &[SimulationNode] {
		&self.nodes
	}

	pub fn slot(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	pub fn position(&self, slot: usize) -> Option<(f32, f32)> {
		self.nodes.get(slot).map(|n| (n.x, n.y))
	}

	pub fn alpha(&self) -> f32 {
		self.alpha
	}

	pub fn center(&self) -> (f32, f32) {
		self.center
	}

	pub fn set_center(&mut self, center: (f32, f32)) {
		if self.center == center {
			return;
		}
		self.center = center;
		if !self.nodes.is_empty() {
			self.alpha = self.alpha.max(0.1);
		}
	}

	/// Whether ticking would still move anything.
	pub fn is_active(&self) -> bool {
		!self.nodes.is_empty() && (self.alpha >= self.config.alpha_min || self.alpha_target > 0.0)
	}

	/// Advances the layout by `dt` seconds. Returns `false` when idle.
	pub fn tick(&mut self, dt: f32) -> bool {
		if !self.is_active() || dt <= 0.0 {
			return false;
		}
		let before: Vec<(f32, f32)> = self.nodes.iter().map(|n| (n.x, n.y)).collect();

		self.push_positions();
		self.physics.update(dt * self.alpha);
		self.pull_positions();
		self.apply_springs();
		self.apply_centering();
		self.apply_pins();
		self.push_positions();

		for (node, (bx, by)) in self.nodes.iter_mut().zip(before) {
			node.vx = (node.x - bx) / dt;
			node.vy = (node.y - by) / dt;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		if self.alpha < self.config.alpha_min && self.alpha_target <= 0.0 {
			self.alpha = 0.0;
			for node in &mut self.nodes {
				node.vx = 0.0;
				node.vy = 0.0;
			}
			debug!("layout settled");
		}
		true
	}

	/// Pins `slot` where it stands and keeps the simulation warm until
	/// [`LayoutEngine::end_drag`].
	pub fn begin_drag(&mut self, slot: usize) {
		let Some(node) = self.nodes.get_mut(slot) else {
			return;
		};
		node.fx = Some(node.x);
		node.fy = Some(node.y);
		self.alpha_target = self.config.drag_alpha_target;
		if self.alpha < self.config.alpha_min {
			self.alpha = self.config.alpha_min;
		}
		self.push_positions();
	}

	pub fn drag_to(&mut self, slot: usize, x: f32, y: f32) {
		let Some(node) = self.nodes.get_mut(slot) else {
			return;
		};
		node.fx = Some(x);
		node.fy = Some(y);
		node.x = x;
		node.y = y;
		self.push_positions();
	}

	/// Releases the pin; activity decays from here.
	pub fn end_drag(&mut self, slot: usize) {
		if let Some(node) = self.nodes.get_mut(slot) {
			node.fx = None;
			node.fy = None;
		}
		self.alpha_target = 0.0;
		self.push_positions();
	}

	fn push_positions(&mut self) {
		let nodes = &self.nodes;
		self.physics.visit_nodes_mut(|node| {
			if let Some(n) = nodes.get(node.data.user_data) {
				node.data.x = n.x;
				node.data.y = n.y;
				node.data.is_anchor = n.is_pinned();
			}
		});
	}

	fn pull_positions(&mut self) {
		let nodes = &mut self.nodes;
		self.physics.visit_nodes(|node| {
			if let Some(n) = nodes.get_mut(node.data.user_data) {
				if node.x().is_finite() && node.y().is_finite() {
					n.x = node.x();
					n.y = node.y();
				}
			}
		});
	}

	fn apply_springs(&mut self) {
		let strength = self.config.link_strength * self.alpha;
		for &(source, target) in &self.springs {
			let (sx, sy) = (self.nodes[source].x, self.nodes[source].y);
			let (tx, ty) = (self.nodes[target].x, self.nodes[target].y);
			let (dx, dy) = (tx - sx, ty - sy);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 1e-3 {
				continue;
			}
			let f = (dist - self.config.rest_length) / dist * strength * 0.5;
			let (mx, my) = (dx * f, dy * f);
			if !self.nodes[target].is_pinned() {
				self.nodes[target].x -= mx;
				self.nodes[target].y -= my;
			}
			if !self.nodes[source].is_pinned() {
				self.nodes[source].x += mx;
				self.nodes[source].y += my;
			}
		}
	}

	fn apply_centering(&mut self) {
		if self.nodes.is_empty() {
			return;
		}
		let n = self.nodes.len() as f32;
		let (sx, sy) = self
			.nodes
			.iter()
			.fold((0.0, 0.0), |(ax, ay), node| (ax + node.x, ay + node.y));
		let shift_x = (self.center.0 - sx / n) * self.config.center_strength;
		let shift_y = (self.center.1 - sy / n) * self.config.center_strength;
		for node in self.nodes.iter_mut().filter(|node| !node.is_pinned()) {
			node.x += shift_x;
			node.y += shift_y;
		}
	}

	fn apply_pins(&mut self) {
		for node in &mut self.nodes {
			if let Some(fx) = node.fx {
				node.x = fx;
			}
			if let Some(fy) = node.fy {
				node.y = fy;
			}
		}
	}
}
