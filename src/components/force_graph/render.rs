use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::simulation::SimulationNode;
use super::state::{ForceGraphState, NODE_RADIUS};
use super::types::{EdgeInfo, lane_control_point};
use super::view::ease_out_cubic;

const LOOP_RADIUS: f64 = 10.0;

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn unit(dx: f64, dy: f64) -> (f64, f64) {
	let len = (dx * dx + dy * dy).sqrt();
	if len < 1e-6 { (0.0, 0.0) } else { (dx / len, dy / len) }
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, arrow_size) = (1.5 / k, 8.0 / k);
	let t = ease_out_cubic(state.hover.highlight_t);
	let nodes = state.engine.nodes();

	ctx.set_font(&format!("{}px sans-serif", 9.0 / k.max(0.5)));
	ctx.set_text_align("center");

	for edge in &state.edges {
		let (Some(a), Some(b)) = (nodes.get(edge.source), nodes.get(edge.target)) else {
			continue;
		};
		let is_highlighted = state.is_highlighted(edge.source) && state.is_highlighted(edge.target);

		// t=0: every edge at base (0.6); t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, arrow_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};
		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
		ctx.set_line_width(width);

		let (label_x, label_y) = if edge.is_loop() {
			draw_loop(ctx, a, edge, k)
		} else {
			match draw_link(ctx, a, b, edge, arrow_size, arrow_alpha) {
				Some(mid) => mid,
				None => continue,
			}
		};

		ctx.set_fill_style_str(&format!("rgba(200, 220, 255, {})", edge_alpha));
		let _ = ctx.fill_text(&edge.kind, label_x, label_y - 3.0 / k);
	}
	ctx.set_text_align("left");
}

/// Draws a possibly bent link with its arrowhead and returns the label anchor.
fn draw_link(
	ctx: &CanvasRenderingContext2d,
	a: &SimulationNode,
	b: &SimulationNode,
	edge: &EdgeInfo,
	arrow_size: f64,
	arrow_alpha: f64,
) -> Option<(f64, f64)> {
	let (x1, y1, x2, y2) = (a.x as f64, a.y as f64, b.x as f64, b.y as f64);
	let (cx, cy) = lane_control_point((x1, y1), (x2, y2), edge.lane)?;
	let (sx, sy) = unit(cx - x1, cy - y1);
	let (ex, ey) = unit(x2 - cx, y2 - cy);

	let (tip_x, tip_y) = (x2 - ex * NODE_RADIUS, y2 - ey * NODE_RADIUS);
	let (back_x, back_y) = (tip_x - ex * arrow_size, tip_y - ey * arrow_size);

	ctx.begin_path();
	ctx.move_to(x1 + sx * NODE_RADIUS, y1 + sy * NODE_RADIUS);
	ctx.quadratic_curve_to(cx, cy, back_x, back_y);
	ctx.stroke();

	ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
	let (px, py) = (-ey * arrow_size * 0.5, ex * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();

	Some((
		0.25 * x1 + 0.5 * cx + 0.25 * x2,
		0.25 * y1 + 0.5 * cy + 0.25 * y2,
	))
}

fn draw_loop(ctx: &CanvasRenderingContext2d, node: &SimulationNode, edge: &EdgeInfo, k: f64) -> (f64, f64) {
	let radius = LOOP_RADIUS + edge.lane.abs() as f64 * 6.0;
	let (x, cy) = (node.x as f64, node.y as f64 - NODE_RADIUS - radius + 2.0 / k);
	ctx.begin_path();
	let _ = ctx.arc(x, cy, radius, 0.0, 2.0 * PI);
	ctx.stroke();
	(x, cy - radius)
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);
	let font = format!("{}px sans-serif", 10.0 / k.max(0.5));
	ctx.set_font(&font);

	for (slot, node) in state.engine.nodes().iter().enumerate() {
		if has_highlight && state.is_highlighted(slot) {
			continue;
		}
		let (x, y) = (node.x as f64, node.y as f64);
		let (alpha, radius) = (1.0 - 0.7 * t, NODE_RADIUS * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(state.node_fill(slot));
		ctx.fill();
		ctx.set_global_alpha(1.0);
		draw_selection_ring(state, ctx, slot, x, y, radius);

		if let Some(info) = state.nodes.get(slot) {
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.8));
			let _ = ctx.fill_text(&info.label, x + radius + 3.0, y + 3.0);
		}
	}

	if !has_highlight {
		return;
	}

	for (slot, node) in state.engine.nodes().iter().enumerate() {
		if !state.is_highlighted(slot) {
			continue;
		}
		let (x, y) = (node.x as f64, node.y as f64);
		let is_focused = state.is_focused(slot);
		let is_neighbor =
			state.hover.neighbors.contains(&slot) || state.hover.prev_neighbors.contains(&slot);

		let (radius, glow_radius) = if is_focused {
			(
				NODE_RADIUS * (1.0 + 0.35 * t),
				NODE_RADIUS * (1.8 + 1.2 * t),
			)
		} else if is_neighbor {
			(NODE_RADIUS * (1.0 + 0.2 * t), NODE_RADIUS * (1.4 + 0.6 * t))
		} else {
			(NODE_RADIUS, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
				let alpha = if is_focused { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(state.node_fill(slot));
		ctx.fill();

		if is_focused && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}
		draw_selection_ring(state, ctx, slot, x, y, radius);

		if let Some(info) = state.nodes.get(slot) {
			ctx.set_fill_style_str("white");
			let _ = ctx.fill_text(&info.label, x + radius + 3.0, y + 3.0);
		}
	}
}

fn draw_selection_ring(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, slot: usize, x: f64, y: f64, radius: f64) {
	if state.selected != Some(slot) {
		return;
	}
	let k = state.transform.k;
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius + 4.0 / k, 0.0, 2.0 * PI);
	ctx.set_stroke_style_str("#ffffff");
	ctx.set_line_width(2.0 / k);
	ctx.stroke();
}
