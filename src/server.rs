//! HTTP surface for the graph endpoint.
//!
//! - `GET /graph`
//! - `GET /api/neo4j/graph`
//!
//! Both take an optional `guid` query parameter. Other methods get `405`.

use std::sync::Arc;

use axum::{
	Json, Router,
	extract::{Query, State},
	http::StatusCode,
	routing::get,
};
use log::error;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::gateway::http::{GRAPH_ENDPOINT, GraphResponse};
use crate::gateway::{Gateway, GraphStore};

/// Query string of the graph endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
	/// Center node; omitted for the whole graph.
	pub guid: Option<String>,
}

type Reply = (StatusCode, Json<GraphResponse>);

/// Builds the router around a shared gateway.
pub fn router<S>(gateway: Arc<Gateway<S>>) -> Router
where
	S: GraphStore + 'static,
{
	Router::new()
		.route("/graph", get(graph_handler::<S>).fallback(method_not_allowed))
		.route(GRAPH_ENDPOINT, get(graph_handler::<S>).fallback(method_not_allowed))
		.layer(CorsLayer::permissive())
		.with_state(gateway)
}

async fn graph_handler<S>(State(gateway): State<Arc<Gateway<S>>>, Query(params): Query<GraphParams>) -> Reply
where
	S: GraphStore + 'static,
{
	match gateway.fetch_graph(params.guid.as_deref()).await {
		Ok(data) => (StatusCode::OK, Json(GraphResponse::ok(data))),
		Err(e) => {
			error!("Error fetching graph data: {}", e);
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				Json(GraphResponse::failure("Error fetching graph data")),
			)
		}
	}
}

async fn method_not_allowed() -> Reply {
	(
		StatusCode::METHOD_NOT_ALLOWED,
		Json(GraphResponse::failure("Method not allowed")),
	)
}
