use std::collections::HashSet;

use crate::config::{LayoutConfig, ViewConfig};
use crate::graph::MaterializedGraph;

use super::simulation::LayoutEngine;
use super::types::{EdgeInfo, NodeInfo, edge_infos, node_infos};
use super::view::{ViewTransform, ZoomAnimation};

pub const NODE_RADIUS: f64 = 8.0;
pub const HIT_RADIUS: f64 = 12.0;
/// Fill of the node whose GUID is the active selection.
pub const ACTIVE_FILL: &str = "#ffcc00";

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<usize>,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Neighbourhood highlight. The focus is the hovered node, or the active
/// node when nothing is hovered.
#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<usize>,
	pub focus: Option<usize>,
	pub neighbors: HashSet<usize>,
	pub highlight_t: f64,
	pub prev_focus: Option<usize>,
	pub prev_neighbors: HashSet<usize>,
	delay_t: f64,
}

/// What a completed press means to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
	/// A node was clicked without being dragged.
	Select(usize),
	/// Empty canvas was clicked without panning.
	Clear,
	None,
}

pub struct ForceGraphState {
	pub engine: LayoutEngine,
	pub graph: MaterializedGraph,
	pub nodes: Vec<NodeInfo>,
	pub edges: Vec<EdgeInfo>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub active: Option<usize>,
	pub selected: Option<usize>,
	pub width: f64,
	pub height: f64,
	pub view: ViewConfig,
	zoom: Option<ZoomAnimation>,
	active_guid: Option<String>,
	selected_id: Option<String>,
	dirty: bool,
}

impl ForceGraphState {
	pub fn new(graph: &MaterializedGraph, width: f64, height: f64, layout: LayoutConfig, view: ViewConfig) -> Self {
		let mut state = Self {
			engine: LayoutEngine::new(layout, ((width / 2.0) as f32, (height / 2.0) as f32)),
			graph: MaterializedGraph::default(),
			nodes: Vec::new(),
			edges: Vec::new(),
			transform: ViewTransform::IDENTITY,
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			active: None,
			selected: None,
			width,
			height,
			view,
			zoom: None,
			active_guid: None,
			selected_id: None,
			dirty: true,
		};
		state.load(graph);
		state
	}

	/// Replaces the displayed graph and restarts the layout from scratch.
	pub fn load(&mut self, graph: &MaterializedGraph) {
		self.graph = graph.clone();
		self.engine.reset(&self.graph);
		self.nodes = node_infos(&self.graph, self.view.label_budget);
		let engine = &self.engine;
		self.edges = edge_infos(&self.graph, |id| engine.slot(id));
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.hover = HoverState::default();
		self.active = self.active_guid.as_deref().and_then(|g| self.slot_of_guid(g));
		self.selected = self.selected_id.as_deref().and_then(|id| self.engine.slot(id));
		self.refresh_focus();
		self.dirty = true;
	}

	fn slot_of_guid(&self, guid: &str) -> Option<usize> {
		self.nodes.iter().position(|n| n.guid.as_deref() == Some(guid))
	}

	pub fn set_active_guid(&mut self, guid: Option<String>) {
		if self.active_guid == guid {
			return;
		}
		self.active = guid.as_deref().and_then(|g| self.slot_of_guid(g));
		self.active_guid = guid;
		self.refresh_focus();
		self.dirty = true;
	}

	pub fn set_selected(&mut self, id: Option<String>) {
		self.selected = id.as_deref().and_then(|id| self.engine.slot(id));
		self.selected_id = id;
		self.dirty = true;
	}

	/// Fill for `slot`: the highlight color when it carries the active GUID.
	pub fn node_fill(&self, slot: usize) -> &str {
		match self.nodes.get(slot) {
			Some(_) if self.active == Some(slot) => ACTIVE_FILL,
			Some(info) => info.color,
			None => "#888888",
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		self.transform.screen_to_model(sx, sy)
	}

	/// The nearest node within the hit radius of a screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		let mut best = HIT_RADIUS;
		for (slot, node) in self.engine.nodes().iter().enumerate() {
			let (dx, dy) = (node.x as f64 - gx, node.y as f64 - gy);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < best {
				best = dist;
				found = Some(slot);
			}
		}
		found
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		if let Some(slot) = self.node_at_position(x, y) {
			let Some((nx, ny)) = self.engine.position(slot) else {
				return;
			};
			self.drag = DragState {
				node: Some(slot),
				moved: false,
				start_x: x,
				start_y: y,
				node_start_x: nx,
				node_start_y: ny,
			};
			self.engine.begin_drag(slot);
		} else {
			self.pan = PanState {
				active: true,
				moved: false,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if let Some(slot) = self.drag.node {
			let (dx, dy) = (x - self.drag.start_x, y - self.drag.start_y);
			if !self.drag.moved && dx.hypot(dy) > self.view.click_slop {
				self.drag.moved = true;
			}
			if self.drag.moved {
				let k = self.transform.k;
				let (nx, ny) = (
					self.drag.node_start_x + (dx / k) as f32,
					self.drag.node_start_y + (dy / k) as f32,
				);
				self.engine.drag_to(slot, nx, ny);
				self.dirty = true;
			}
		} else if self.pan.active {
			let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
			if !self.pan.moved && dx.hypot(dy) > self.view.click_slop {
				self.pan.moved = true;
			}
			if self.pan.moved {
				self.zoom = None;
				self.transform.x = self.pan.transform_start_x + dx;
				self.transform.y = self.pan.transform_start_y + dy;
				self.dirty = true;
			}
		} else {
			let hovered = self.node_at_position(x, y);
			self.set_hover(hovered);
		}
	}

	pub fn pointer_up(&mut self) -> PointerOutcome {
		let outcome = if let Some(slot) = self.drag.node {
			self.engine.end_drag(slot);
			if self.drag.moved {
				PointerOutcome::None
			} else {
				PointerOutcome::Select(slot)
			}
		} else if self.pan.active && !self.pan.moved {
			PointerOutcome::Clear
		} else {
			PointerOutcome::None
		};
		self.drag = DragState::default();
		self.pan = PanState::default();
		outcome
	}

	/// The pointer left the canvas: drop any press without a click.
	pub fn pointer_leave(&mut self) {
		if let Some(slot) = self.drag.node {
			self.engine.end_drag(slot);
		}
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.set_hover(None);
	}

	pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 {
			1.0 / self.view.wheel_factor
		} else {
			self.view.wheel_factor
		};
		let k = (self.transform.k * factor).clamp(self.view.min_scale, self.view.max_scale);
		self.zoom = None;
		self.transform = self.transform.zoomed_at(k, x, y);
		self.dirty = true;
	}

	/// Where the view is heading: the end of a running animation, or the
	/// current transform.
	fn zoom_base(&self) -> ViewTransform {
		self.zoom.as_ref().map(|z| z.target()).unwrap_or(self.transform)
	}

	fn animate_to(&mut self, to: ViewTransform) {
		self.zoom = Some(ZoomAnimation::new(self.transform, to, self.view.zoom_duration));
		self.dirty = true;
	}

	fn zoom_by(&mut self, factor: f64) {
		let base = self.zoom_base();
		let k = (base.k * factor).clamp(self.view.min_scale, self.view.max_scale);
		self.animate_to(base.zoomed_at(k, self.width / 2.0, self.height / 2.0));
	}

	pub fn zoom_in(&mut self) {
		self.zoom_by(self.view.zoom_step);
	}

	pub fn zoom_out(&mut self) {
		self.zoom_by(1.0 / self.view.zoom_step);
	}

	pub fn reset_zoom(&mut self) {
		self.animate_to(ViewTransform::IDENTITY);
	}

	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		if self.hover.node.is_none() {
			self.hover.delay_t = 0.0;
		}
		self.hover.node = node;
		self.refresh_focus();
	}

	fn refresh_focus(&mut self) {
		let focus = self.hover.node.or(self.active);
		if self.hover.focus == focus {
			return;
		}
		// Keep the outgoing neighbourhood around while it fades.
		if self.hover.focus.is_some() && focus.is_none() {
			self.hover.prev_focus = self.hover.focus.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_focus = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.focus = focus;
		self.hover.neighbors.clear();
		if let Some(slot) = focus {
			for edge in &self.edges {
				if edge.source == slot {
					self.hover.neighbors.insert(edge.target);
				} else if edge.target == slot {
					self.hover.neighbors.insert(edge.source);
				}
			}
		}
		self.dirty = true;
	}

	pub fn is_highlighted(&self, slot: usize) -> bool {
		self.hover.focus == Some(slot)
			|| self.hover.neighbors.contains(&slot)
			|| self.hover.prev_focus == Some(slot)
			|| self.hover.prev_neighbors.contains(&slot)
	}

	pub fn is_focused(&self, slot: usize) -> bool {
		self.hover.focus == Some(slot) || self.hover.prev_focus == Some(slot)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.focus.is_some() || self.hover.prev_focus.is_some()
	}

	/// Advances layout, zoom and highlight by `dt` seconds. Returns whether
	/// the canvas needs repainting.
	pub fn frame(&mut self, dt: f64) -> bool {
		let mut changed = std::mem::take(&mut self.dirty);

		if let Some(zoom) = self.zoom.as_mut() {
			let (transform, done) = zoom.step(dt);
			self.transform = transform;
			if done {
				self.zoom = None;
			}
			changed = true;
		}

		changed |= self.engine.tick(dt as f32);

		let before = self.hover.highlight_t;
		let (target, delay, speed) = if self.hover.focus.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};
		if self.hover.focus.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * (speed * dt).min(1.0);
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * (speed * dt).min(1.0);
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_focus = None;
				self.hover.prev_neighbors.clear();
			}
		}
		changed |= (self.hover.highlight_t - before).abs() > 1e-4;

		changed
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.engine.set_center(((width / 2.0) as f32, (height / 2.0) as f32));
		self.dirty = true;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gateway::Gateway;
	use crate::gateway::testing::building;
	use crate::selection::{Refresh, SelectionBridge, refresh};

	async fn state_for(guid: Option<&str>) -> ForceGraphState {
		let graph = Gateway::new(building()).fetch_graph(guid).await.unwrap();
		ForceGraphState::new(&graph, 800.0, 600.0, LayoutConfig::default(), ViewConfig::default())
	}

	fn screen_of(state: &ForceGraphState, slot: usize) -> (f64, f64) {
		let (x, y) = state.engine.position(slot).unwrap();
		state.transform.model_to_screen(x as f64, y as f64)
	}

	fn settle(state: &mut ForceGraphState) {
		for _ in 0..1000 {
			if !state.frame(0.016) {
				return;
			}
		}
	}

	#[tokio::test]
	async fn click_on_node_selects_and_leaves_no_pin() {
		let mut state = state_for(None).await;
		let (x, y) = screen_of(&state, 1);
		state.pointer_down(x, y);
		state.pointer_move(x + 1.0, y);
		assert_eq!(state.pointer_up(), PointerOutcome::Select(1));
		assert!(!state.engine.nodes()[1].is_pinned());
	}

	#[tokio::test]
	async fn drag_pins_during_and_releases_after() {
		let mut state = state_for(None).await;
		let (x, y) = screen_of(&state, 0);
		state.pointer_down(x, y);
		state.pointer_move(x + 60.0, y + 20.0);
		state.frame(0.016);
		let dragged = &state.engine.nodes()[0];
		assert!(dragged.is_pinned());
		assert!((dragged.x as f64 - (x + 60.0)).abs() < 1e-3);
		assert!((dragged.y as f64 - (y + 20.0)).abs() < 1e-3);

		assert_eq!(state.pointer_up(), PointerOutcome::None);
		assert!(!state.engine.nodes()[0].is_pinned());
		assert!(state.engine.is_active());
	}

	#[tokio::test]
	async fn background_click_clears_but_pan_does_not() {
		let mut state = state_for(None).await;
		state.pointer_down(5.0, 5.0);
		assert_eq!(state.pointer_up(), PointerOutcome::Clear);

		state.pointer_down(5.0, 5.0);
		state.pointer_move(45.0, 35.0);
		assert_eq!(state.pointer_up(), PointerOutcome::None);
		assert_eq!((state.transform.x, state.transform.y), (40.0, 30.0));
	}

	#[tokio::test]
	async fn zoom_is_clamped_and_leaves_layout_alone() {
		let mut state = state_for(None).await;
		settle(&mut state);
		let before = state.engine.nodes().to_vec();

		for _ in 0..20 {
			state.zoom_in();
			state.frame(1.0);
		}
		assert_eq!(state.transform.k, state.view.max_scale);
		for _ in 0..40 {
			state.zoom_out();
			state.frame(1.0);
		}
		assert_eq!(state.transform.k, state.view.min_scale);
		state.wheel(10.0, 10.0, -1.0);
		state.reset_zoom();
		state.frame(1.0);
		assert_eq!(state.transform, ViewTransform::IDENTITY);

		assert_eq!(state.engine.nodes(), &before[..]);
	}

	#[tokio::test]
	async fn new_graph_restarts_layout_and_drops_missing_selection() {
		let mut state = state_for(None).await;
		state.set_selected(Some("4".into()));
		assert_eq!(state.selected, Some(3));
		settle(&mut state);

		let scoped = Gateway::new(building()).fetch_graph(Some("G1")).await.unwrap();
		state.load(&scoped);
		assert_eq!(state.engine.alpha(), 1.0);
		assert_eq!(state.engine.nodes().len(), 3);
		assert_eq!(state.selected, None);
	}

	#[tokio::test]
	async fn external_selection_highlights_then_clears() {
		let mut bridge = SelectionBridge::new();
		let gateway = Gateway::new(building());
		let mut state = state_for(None).await;

		let ticket = bridge.on_external_select(Some("G2".into())).unwrap();
		assert_eq!(ticket.scope(), Some("G2"));
		let Refresh::Fresh(graph) = refresh(&gateway, &ticket, |t| bridge.is_current(t)).await else {
			panic!("expected a fresh graph");
		};
		state.load(&graph);
		state.set_active_guid(bridge.active_guid().map(str::to_string));

		let slot = state.nodes.iter().position(|n| n.guid.as_deref() == Some("G2")).unwrap();
		assert_eq!(state.node_fill(slot), ACTIVE_FILL);
		assert!(state.is_highlighted(slot));
		let (_, wall) = state
			.graph
			.nodes
			.iter()
			.enumerate()
			.find(|(_, n)| n.guid() == Some("G1"))
			.unwrap();
		assert!(state.is_highlighted(state.engine.slot(&wall.id).unwrap()));

		bridge.on_external_select(None).unwrap();
		state.set_active_guid(None);
		assert_ne!(state.node_fill(slot), ACTIVE_FILL);
		for _ in 0..200 {
			state.frame(0.05);
		}
		assert!(!state.has_active_highlight());
	}
}
