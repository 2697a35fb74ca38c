//! Selection Bridge.
//!
//! One cell owns the active domain identifier for the whole app. The 3D viewer
//! writes to it through [`SelectionBridge::on_external_select`], the graph view
//! through [`SelectionBridge::on_local_select`]. Every real change bumps a
//! generation and returns a [`FetchTicket`]; a graph fetched for an older
//! ticket is thrown away when it arrives.

use log::{debug, error};

use crate::gateway::{FetchError, GraphSource};
use crate::graph::{GraphNode, MaterializedGraph};

/// Which side produced a selection change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOrigin {
	/// The 3D viewer.
	External,
	/// The graph view.
	Local,
}

/// Permission to publish the graph fetched for one selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
	generation: u64,
	scope: Option<String>,
}

impl FetchTicket {
	/// GUID the fetch is scoped to.
	pub fn scope(&self) -> Option<&str> {
		self.scope.as_deref()
	}

	/// Selection generation the ticket was issued for.
	pub fn generation(&self) -> u64 {
		self.generation
	}
}

/// Passed to subscribers after every accepted change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionChange {
	/// The new active GUID.
	pub guid: Option<String>,
	/// Who made the change.
	pub origin: SelectionOrigin,
	/// Ticket for the fetch this change starts.
	pub ticket: FetchTicket,
}

/// Handle returned by [`SelectionBridge::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&SelectionChange)>;

/// Single owner of the active GUID.
pub struct SelectionBridge {
	active: Option<String>,
	generation: u64,
	handlers: Vec<(SubscriptionId, Handler)>,
	next_handler: u64,
}

impl Default for SelectionBridge {
	fn default() -> Self {
		Self::new()
	}
}

impl SelectionBridge {
	/// Bridge with nothing selected.
	pub fn new() -> Self {
		Self {
			active: None,
			generation: 0,
			handlers: Vec::new(),
			next_handler: 0,
		}
	}

	/// The active GUID.
	pub fn active_guid(&self) -> Option<&str> {
		self.active.as_deref()
	}

	/// Ticket for the current selection, used for the initial load.
	pub fn current_ticket(&self) -> FetchTicket {
		FetchTicket {
			generation: self.generation,
			scope: self.active.clone(),
		}
	}

	/// Inbound slot: the 3D viewer picked or cleared an element.
	pub fn on_external_select(&mut self, guid: Option<String>) -> Option<FetchTicket> {
		self.select(SelectionOrigin::External, guid)
	}

	/// Outbound slot: the graph view picked a node or cleared its selection.
	pub fn on_local_select(&mut self, guid: Option<String>) -> Option<FetchTicket> {
		self.select(SelectionOrigin::Local, guid)
	}

	/// The one setter. Same-value writes return `None` and notify nobody;
	/// any other write wins over whatever was pending.
	///
	/// Handlers run while the bridge is mutably borrowed and must not call
	/// back into it.
	pub fn select(&mut self, origin: SelectionOrigin, guid: Option<String>) -> Option<FetchTicket> {
		let guid = guid.filter(|g| !g.is_empty());
		if guid == self.active {
			return None;
		}
		self.generation += 1;
		self.active = guid;
		let ticket = self.current_ticket();
		debug!(
			"selection -> {:?} from {:?} (generation {})",
			self.active, origin, self.generation
		);

		let change = SelectionChange {
			guid: self.active.clone(),
			origin,
			ticket: ticket.clone(),
		};
		for (_, handler) in self.handlers.iter_mut() {
			handler(&change);
		}
		Some(ticket)
	}

	/// Whether a fetch started for `ticket` may still be shown.
	pub fn is_current(&self, ticket: &FetchTicket) -> bool {
		ticket.generation == self.generation
	}

	/// Registers a handler for accepted changes.
	pub fn subscribe(&mut self, handler: impl FnMut(&SelectionChange) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_handler);
		self.next_handler += 1;
		self.handlers.push((id, Box::new(handler)));
		id
	}

	/// Removes a handler; `false` if it was already gone.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.handlers.len();
		self.handlers.retain(|(hid, _)| *hid != id);
		self.handlers.len() != before
	}
}

/// Outcome of one fetch-materialize cycle.
#[derive(Debug)]
pub enum Refresh {
	/// The graph for the still-current selection.
	Fresh(MaterializedGraph),
	/// The selection moved on while the fetch was in flight.
	Stale,
	/// The fetch failed; whatever graph is on screen stays.
	Failed(FetchError),
}

/// Runs the fetch for `ticket` and checks, once it settles, whether the
/// result may still be shown. `is_current` is consulted only after the await
/// so callers can pass a closure over shared state without holding a borrow
/// across the suspension point.
pub async fn refresh<S, F>(source: &S, ticket: &FetchTicket, is_current: F) -> Refresh
where
	S: GraphSource + ?Sized,
	F: FnOnce(&FetchTicket) -> bool,
{
	let result = source.fetch_graph(ticket.scope()).await;
	if !is_current(ticket) {
		debug!("discarding stale graph for generation {}", ticket.generation);
		return Refresh::Stale;
	}
	match result {
		Ok(graph) => Refresh::Fresh(graph),
		Err(e) => {
			error!("graph fetch for {:?} failed: {}", ticket.scope(), e);
			Refresh::Failed(e)
		}
	}
}

/// The panel's node as it exists in a newly materialized graph, or `None`
/// when the node is gone.
pub fn retain_selection(selected: Option<GraphNode>, graph: &MaterializedGraph) -> Option<GraphNode> {
	let id = selected?.id;
	graph.node(&id).cloned()
}

/// Something the property panel has to follow.
#[derive(Clone, Copy, Debug)]
pub enum PanelEvent<'a> {
	/// The bridge accepted a selection change.
	Selection(&'a SelectionChange),
	/// A fresh graph replaced the one on screen.
	Graph(&'a MaterializedGraph),
}

/// The node the panel shows after `event`. A cleared selection closes the
/// panel; a new graph keeps it only while its node is still there.
pub fn reconcile_panel(panel: Option<GraphNode>, event: PanelEvent<'_>) -> Option<GraphNode> {
	match event {
		PanelEvent::Selection(change) if change.guid.is_none() => None,
		PanelEvent::Selection(_) => panel,
		PanelEvent::Graph(graph) => retain_selection(panel, graph),
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use async_trait::async_trait;

	use super::*;
	use crate::gateway::Gateway;
	use crate::gateway::testing::building;

	/// Records which scopes were fetched.
	#[derive(Default)]
	struct Recorder {
		scopes: RefCell<Vec<Option<String>>>,
	}

	#[async_trait(?Send)]
	impl GraphSource for Recorder {
		async fn fetch_graph(&self, scope_guid: Option<&str>) -> Result<MaterializedGraph, FetchError> {
			self.scopes.borrow_mut().push(scope_guid.map(str::to_string));
			Ok(MaterializedGraph::default())
		}
	}

	async fn drive(bridge: &RefCell<SelectionBridge>, source: &Recorder, origin: SelectionOrigin, guid: Option<&str>) {
		let ticket = bridge.borrow_mut().select(origin, guid.map(str::to_string));
		if let Some(ticket) = ticket {
			refresh(source, &ticket, |t| bridge.borrow().is_current(t)).await;
		}
	}

	#[tokio::test]
	async fn redundant_selection_does_not_refetch() {
		let bridge = RefCell::new(SelectionBridge::new());
		let source = Recorder::default();
		drive(&bridge, &source, SelectionOrigin::External, Some("G2")).await;
		drive(&bridge, &source, SelectionOrigin::External, Some("G2")).await;
		drive(&bridge, &source, SelectionOrigin::Local, Some("G2")).await;
		assert_eq!(*source.scopes.borrow(), vec![Some("G2".to_string())]);
	}

	#[tokio::test]
	async fn each_change_fetches_once_with_its_scope() {
		let bridge = RefCell::new(SelectionBridge::new());
		let source = Recorder::default();
		drive(&bridge, &source, SelectionOrigin::External, Some("G1")).await;
		drive(&bridge, &source, SelectionOrigin::Local, Some("G2")).await;
		drive(&bridge, &source, SelectionOrigin::External, None).await;
		drive(&bridge, &source, SelectionOrigin::External, None).await;
		assert_eq!(
			*source.scopes.borrow(),
			vec![Some("G1".to_string()), Some("G2".to_string()), None]
		);
	}

	#[tokio::test]
	async fn slow_response_for_old_selection_is_discarded() {
		let mut bridge = SelectionBridge::new();
		let gateway = Gateway::new(building());
		let first = bridge.on_external_select(Some("G1".into())).unwrap();
		let second = bridge.on_local_select(Some("G2".into())).unwrap();

		// The second fetch settles first, then the first one limps in.
		let newer = refresh(&gateway, &second, |t| bridge.is_current(t)).await;
		let older = refresh(&gateway, &first, |t| bridge.is_current(t)).await;

		match newer {
			Refresh::Fresh(g) => assert!(g.find_by_guid("G2").is_some()),
			other => panic!("expected fresh graph, got {:?}", other),
		}
		assert!(matches!(older, Refresh::Stale));
	}

	#[test]
	fn last_write_wins_across_slots() {
		let mut bridge = SelectionBridge::new();
		bridge.on_external_select(Some("A".into()));
		bridge.on_local_select(Some("B".into()));
		assert_eq!(bridge.active_guid(), Some("B"));
		bridge.on_external_select(Some("A".into()));
		assert_eq!(bridge.active_guid(), Some("A"));
	}

	#[test]
	fn empty_guid_counts_as_clear() {
		let mut bridge = SelectionBridge::new();
		assert!(bridge.on_external_select(Some(String::new())).is_none());
		bridge.on_external_select(Some("A".into()));
		let ticket = bridge.on_external_select(Some(String::new())).unwrap();
		assert_eq!(ticket.scope(), None);
	}

	#[test]
	fn subscribers_see_changes_until_unsubscribed() {
		let mut bridge = SelectionBridge::new();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		let id = bridge.subscribe(move |c| sink.borrow_mut().push((c.guid.clone(), c.origin)));

		bridge.on_external_select(Some("G1".into()));
		bridge.on_external_select(Some("G1".into()));
		bridge.on_local_select(None);
		assert!(bridge.unsubscribe(id));
		bridge.on_external_select(Some("G3".into()));

		assert_eq!(
			*seen.borrow(),
			vec![
				(Some("G1".to_string()), SelectionOrigin::External),
				(None, SelectionOrigin::Local),
			]
		);
		assert!(!bridge.unsubscribe(id));
	}

	#[tokio::test]
	async fn failed_fetch_reports_failure_for_current_ticket() {
		let store = crate::gateway::testing::MemoryStore {
			fail_open: true,
			..building()
		};
		let gateway = Gateway::new(store);
		let mut bridge = SelectionBridge::new();
		let ticket = bridge.on_external_select(Some("G1".into())).unwrap();
		let out = refresh(&gateway, &ticket, |t| bridge.is_current(t)).await;
		assert!(matches!(out, Refresh::Failed(FetchError::Transport(_))));
	}

	#[tokio::test]
	async fn panel_follows_external_selection_then_closes_on_clear() {
		let gateway = Gateway::new(building());
		let bridge = RefCell::new(SelectionBridge::new());
		let panel = Rc::new(RefCell::new(None::<GraphNode>));
		let sink = Rc::clone(&panel);
		bridge.borrow_mut().subscribe(move |change| {
			let current = sink.borrow_mut().take();
			*sink.borrow_mut() = reconcile_panel(current, PanelEvent::Selection(change));
		});

		let ticket = bridge.borrow_mut().on_external_select(Some("G2".into())).unwrap();
		let graph = match refresh(&gateway, &ticket, |t| bridge.borrow().is_current(t)).await {
			Refresh::Fresh(g) => g,
			other => panic!("expected fresh graph, got {:?}", other),
		};
		let door = graph.find_by_guid("G2").cloned();
		let shown = reconcile_panel(door, PanelEvent::Graph(&graph));
		*panel.borrow_mut() = shown;
		assert_eq!(panel.borrow().as_ref().map(|n| n.id.as_str()), Some("2"));
		assert_eq!(
			panel.borrow().as_ref().and_then(|n| n.properties.get("GlobalId")).and_then(|v| v.as_str()),
			Some("G2")
		);

		let cleared = bridge.borrow_mut().on_external_select(None).unwrap();
		assert_eq!(cleared.scope(), None);
		assert_eq!(*panel.borrow(), None);
	}

	#[test]
	fn switching_selection_keeps_the_panel_until_the_graph_arrives() {
		let mut bridge = SelectionBridge::new();
		let node = GraphNode {
			id: "1".into(),
			labels: vec!["Wall".into()],
			properties: Default::default(),
		};
		let ticket = bridge.on_local_select(Some("G1".into())).unwrap();
		let change = SelectionChange {
			guid: Some("G1".into()),
			origin: SelectionOrigin::Local,
			ticket,
		};
		assert_eq!(
			reconcile_panel(Some(node.clone()), PanelEvent::Selection(&change)),
			Some(node.clone())
		);
		assert_eq!(
			reconcile_panel(Some(node), PanelEvent::Graph(&MaterializedGraph::default())),
			None
		);
	}

	#[tokio::test]
	async fn selection_survives_only_while_its_node_does() {
		let gateway = Gateway::new(building());
		let full = gateway.fetch_graph(None).await.unwrap();
		let space = full.find_by_guid("G4").cloned();
		assert_eq!(retain_selection(space.clone(), &full), space);

		let scoped = gateway.fetch_graph(Some("G1")).await.unwrap();
		assert_eq!(retain_selection(space, &scoped), None);
		assert_eq!(retain_selection(None, &scoped), None);
	}
}
