//! Selection events exchanged with the 3D model viewer.
//!
//! The viewer dispatches `ifc:select` on `window` with the picked GUID (or
//! `null`) as `detail`; the graph view answers with `graph:select` in the same
//! shape.

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, Event, Window};

pub const INBOUND_EVENT: &str = "ifc:select";
pub const OUTBOUND_EVENT: &str = "graph:select";

/// A registered viewer listener. Dropping it unregisters the handler.
pub struct ViewerSubscription {
	window: Window,
	callback: Closure<dyn FnMut(Event)>,
}

impl Drop for ViewerSubscription {
	fn drop(&mut self) {
		let _ = self
			.window
			.remove_event_listener_with_callback(INBOUND_EVENT, self.callback.as_ref().unchecked_ref());
		debug!("viewer selection listener removed");
	}
}

/// `detail` as a GUID; anything but a non-empty string means "cleared".
pub fn guid_from_detail(detail: &JsValue) -> Option<String> {
	detail.as_string().filter(|g| !g.trim().is_empty())
}

/// Calls `handler` for every selection the viewer reports.
pub fn subscribe(mut handler: impl FnMut(Option<String>) + 'static) -> Option<ViewerSubscription> {
	let Some(window) = web_sys::window() else {
		warn!("no window; viewer selection events unavailable");
		return None;
	};
	let callback = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
		let guid = ev
			.dyn_ref::<CustomEvent>()
			.and_then(|custom| guid_from_detail(&custom.detail()));
		debug!("{} -> {:?}", INBOUND_EVENT, guid);
		handler(guid);
	});
	if let Err(e) = window.add_event_listener_with_callback(INBOUND_EVENT, callback.as_ref().unchecked_ref()) {
		warn!("could not listen for {}: {:?}", INBOUND_EVENT, e);
		return None;
	}
	Some(ViewerSubscription { window, callback })
}

/// Tells the viewer which element the graph view selected.
pub fn announce(guid: Option<&str>) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let init = CustomEventInit::new();
	init.set_detail(&guid.map(JsValue::from_str).unwrap_or(JsValue::NULL));
	match CustomEvent::new_with_event_init_dict(OUTBOUND_EVENT, &init) {
		Ok(event) => {
			let _ = window.dispatch_event(&event);
		}
		Err(e) => warn!("could not build {} event: {:?}", OUTBOUND_EVENT, e),
	}
}
