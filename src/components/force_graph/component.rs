use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{ForceGraphState, PointerOutcome};
use crate::config::{LayoutConfig, ViewConfig};
use crate::graph::{GraphNode, MaterializedGraph};

type Shared = Rc<RefCell<Option<ForceGraphState>>>;

/// Owns the animation loop and the resize listener; dropping it stops both.
struct FrameLoop {
	window: Window,
	frame: Rc<Cell<Option<i32>>>,
	animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
	resize: Option<Closure<dyn FnMut()>>,
}

impl Drop for FrameLoop {
	fn drop(&mut self) {
		if let Some(id) = self.frame.take() {
			let _ = self.window.cancel_animation_frame(id);
		}
		if let Some(cb) = self.resize.take() {
			let _ = self
				.window
				.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
		self.animate.borrow_mut().take();
		debug!("graph canvas torn down");
	}
}

fn canvas_size(
	window: &Window,
	canvas: &HtmlCanvasElement,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> (f64, f64) {
	if fullscreen {
		let dim = |v: Result<JsValue, JsValue>, fallback| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
		return (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0));
	}
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| parent.as_ref().map(|p| p.client_width() as f64).unwrap_or(800.0)),
		height.unwrap_or_else(|| parent.as_ref().map(|p| p.client_height() as f64).unwrap_or(600.0)),
	)
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Force-directed view of a materialized graph.
///
/// `on_select` fires with the clicked node, or `None` when empty canvas is
/// clicked. The node carrying `active_guid` is filled with the highlight
/// color; `selected_id` gets a ring.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<MaterializedGraph>,
	#[prop(into)] active_guid: Signal<Option<String>>,
	#[prop(into)] selected_id: Signal<Option<String>>,
	on_select: Callback<Option<GraphNode>>,
	#[prop(optional)] layout: LayoutConfig,
	#[prop(optional)] view_config: ViewConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Shared = Rc::new(RefCell::new(None));

	let state_init = state.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			warn!("no window; graph view disabled");
			return;
		};
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("canvas has no 2d context; graph view disabled");
			return;
		};

		let (w, h) = canvas_size(&window, &canvas, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let mut initial = ForceGraphState::new(
			&data.get_untracked(),
			w,
			h,
			layout.clone(),
			view_config.clone(),
		);
		initial.set_active_guid(active_guid.get_untracked());
		initial.set_selected(selected_id.get_untracked());
		*state_init.borrow_mut() = Some(initial);

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		let resize: Closure<dyn FnMut()> = Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = canvas_size(&win, &canvas_resize, fullscreen, width, height);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(s) = state_resize.borrow_mut().as_mut() {
				s.resize(nw, nh);
			}
		});
		let _ = window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());

		let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
		let frame: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
		let (state_anim, animate_inner, frame_anim) = (state_init.clone(), animate.clone(), frame.clone());
		let mut last = js_sys::Date::now();
		*animate.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let dt = ((now - last) / 1000.0).clamp(0.0, 0.05);
			last = now;
			if let Some(s) = state_anim.borrow_mut().as_mut() {
				if s.frame(dt) {
					render::render(s, &ctx);
				}
			}
			let next = animate_inner.borrow().as_ref().and_then(|cb| {
				web_sys::window()?
					.request_animation_frame(cb.as_ref().unchecked_ref())
					.ok()
			});
			frame_anim.set(next);
		}));
		if let Some(cb) = animate.borrow().as_ref() {
			frame.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}

		let _frame_loop = StoredValue::new_local(FrameLoop {
			window,
			frame,
			animate,
			resize: Some(resize),
		});
	});

	let state_data = state.clone();
	Effect::new(move |_| {
		let graph = data.get();
		if let Some(s) = state_data.borrow_mut().as_mut() {
			s.load(&graph);
		}
	});

	let state_active = state.clone();
	Effect::new(move |_| {
		let guid = active_guid.get();
		if let Some(s) = state_active.borrow_mut().as_mut() {
			s.set_active_guid(guid);
		}
	});

	let state_selected = state.clone();
	Effect::new(move |_| {
		let id = selected_id.get();
		if let Some(s) = state_selected.borrow_mut().as_mut() {
			s.set_selected(id);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_md.borrow_mut().as_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_mm.borrow_mut().as_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		// Resolve the click before calling out so the state is not borrowed
		// while the host reacts.
		let picked = {
			let mut guard = state_mu.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			match s.pointer_up() {
				PointerOutcome::Select(slot) => {
					let node = s.graph.nodes.get(slot).cloned();
					s.set_selected(node.as_ref().map(|n| n.id.clone()));
					Some(node)
				}
				PointerOutcome::Clear => {
					s.set_selected(None);
					Some(None)
				}
				PointerOutcome::None => None,
			}
		};
		match picked {
			Some(Some(node)) => {
				ev.stop_propagation();
				on_select.run(Some(node));
			}
			Some(None) => on_select.run(None),
			None => {}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = state_ml.borrow_mut().as_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			s.wheel(x, y, ev.delta_y());
		}
	};

	let zoom_control = |apply: fn(&mut ForceGraphState)| {
		let state = state.clone();
		move |_: MouseEvent| {
			if let Some(s) = state.borrow_mut().as_mut() {
				apply(s);
			}
		}
	};

	view! {
		<div class="force-graph" style="position: relative; width: 100%; height: 100%;">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<div class="zoom-controls" style="position: absolute; top: 8px; left: 8px; display: flex; gap: 4px;">
				<button class="zoom-in" title="Zoom in" on:click=zoom_control(ForceGraphState::zoom_in)>
					"+"
				</button>
				<button class="zoom-out" title="Zoom out" on:click=zoom_control(ForceGraphState::zoom_out)>
					"−"
				</button>
				<button class="zoom-reset" title="Reset zoom" on:click=zoom_control(ForceGraphState::reset_zoom)>
					"⟲"
				</button>
			</div>
		</div>
	}
}
