pub mod force_graph;
pub mod property_panel;
pub mod viewer_events;
