use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{info, warn};

use crate::components::force_graph::ForceGraphCanvas;
use crate::components::property_panel::PropertyPanel;
use crate::components::viewer_events;
use crate::gateway::http::HttpGraphSource;
use crate::graph::{GraphNode, MaterializedGraph};
use crate::selection::{
	FetchTicket, PanelEvent, Refresh, SelectionBridge, SelectionOrigin, reconcile_panel, refresh,
};

/// Split view: the 3D viewer's mount point on the left, the property graph
/// and its panel on the right. Owns the selection bridge.
#[component]
pub fn Home() -> impl IntoView {
	let graph = RwSignal::new(MaterializedGraph::default());
	let active_guid = RwSignal::new(None::<String>);
	let selected = RwSignal::new(None::<GraphNode>);
	let load_error = RwSignal::new(None::<String>);

	let bridge = StoredValue::new_local(SelectionBridge::new());
	let source = StoredValue::new_local(HttpGraphSource::from_window());

	// Mirror every accepted change into the view and echo local picks to the
	// viewer.
	bridge.update_value(|b| {
		b.subscribe(move |change| {
			active_guid.set(change.guid.clone());
			selected.update(|s| *s = reconcile_panel(s.take(), PanelEvent::Selection(change)));
			if change.origin == SelectionOrigin::Local {
				viewer_events::announce(change.guid.as_deref());
			}
		});
	});

	let load = move |ticket: FetchTicket| {
		let Some(source) = source.get_value() else {
			warn!("no page origin; graph endpoint unreachable");
			return;
		};
		spawn_local(async move {
			let is_current = |t: &FetchTicket| bridge.try_with_value(|b| b.is_current(t)).unwrap_or(false);
			match refresh(&source, &ticket, is_current).await {
				Refresh::Fresh(next) => {
					info!(
						"graph for {:?}: {} nodes, {} links",
						ticket.scope(),
						next.nodes.len(),
						next.links.len()
					);
					selected.update(|s| *s = reconcile_panel(s.take(), PanelEvent::Graph(&next)));
					load_error.set(None);
					graph.set(next);
				}
				Refresh::Stale => {}
				Refresh::Failed(e) => load_error.set(Some(e.to_string())),
			}
		});
	};

	let select = move |origin: SelectionOrigin, guid: Option<String>| {
		if let Some(ticket) = bridge.try_update_value(|b| b.select(origin, guid)).flatten() {
			load(ticket);
		}
	};

	let viewer = viewer_events::subscribe(move |guid| select(SelectionOrigin::External, guid));
	let _viewer = StoredValue::new_local(viewer);

	load(bridge.with_value(SelectionBridge::current_ticket));

	let on_select = Callback::new(move |node: Option<GraphNode>| match node {
		Some(node) => {
			let guid = node.guid().map(str::to_string);
			selected.set(Some(node));
			if guid.is_some() {
				select(SelectionOrigin::Local, guid);
			}
		}
		None => {
			selected.set(None);
			select(SelectionOrigin::Local, None);
		}
	});
	let selected_id = Signal::derive(move || selected.with(|s| s.as_ref().map(|n| n.id.clone())));

	view! {
		<div class="explorer">
			<section class="model-pane">
				<div id="ifc-viewer" class="ifc-viewer"></div>
			</section>
			<section class="graph-pane">
				<ForceGraphCanvas
					data=graph
					active_guid=active_guid
					selected_id=selected_id
					on_select=on_select
				/>
				<Show when=move || load_error.with(Option::is_some)>
					<div class="graph-error">
						"Graph unavailable: " {move || load_error.get().unwrap_or_default()}
					</div>
				</Show>
				<PropertyPanel node=selected on_close=Callback::new(move |_| selected.set(None)) />
			</section>
		</div>
	}
}
