//! JSON envelope for the graph endpoint and the browser-side client for it.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{FetchError, GraphSource};
use crate::graph::MaterializedGraph;

/// Path the browser app queries.
pub const GRAPH_ENDPOINT: &str = "/api/neo4j/graph";

/// `{ success, data }` on success, `{ success: false, message }` on failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphResponse {
	/// Whether `data` holds the graph.
	pub success: bool,
	/// Failure reason.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// The graph, on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<MaterializedGraph>,
}

impl GraphResponse {
	/// Success envelope.
	pub fn ok(data: MaterializedGraph) -> Self {
		Self {
			success: true,
			message: None,
			data: Some(data),
		}
	}

	/// Failure envelope.
	pub fn failure(message: impl Into<String>) -> Self {
		Self {
			success: false,
			message: Some(message.into()),
			data: None,
		}
	}

	/// Unwraps the envelope, treating `success: false` as a rejection.
	pub fn into_graph(self, status: u16) -> Result<MaterializedGraph, FetchError> {
		match (self.success, self.data) {
			(true, Some(data)) => Ok(data),
			(true, None) => Ok(MaterializedGraph::default()),
			(false, _) => Err(FetchError::Rejected {
				status,
				message: self.message.unwrap_or_else(|| "unknown error".to_string()),
			}),
		}
	}
}

/// Fetches graphs from the backend over HTTP.
#[derive(Clone, Debug)]
pub struct HttpGraphSource {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpGraphSource {
	/// Client for the backend at `base_url`.
	pub fn new(base_url: &str) -> Self {
		Self {
			client: reqwest::Client::new(),
			endpoint: format!("{}{}", base_url.trim_end_matches('/'), GRAPH_ENDPOINT),
		}
	}

	/// Targets the origin the page was served from.
	pub fn from_window() -> Option<Self> {
		let origin = web_sys::window()?.location().origin().ok()?;
		Some(Self::new(&origin))
	}

	/// Full URL queried.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[async_trait(?Send)]
impl GraphSource for HttpGraphSource {
	async fn fetch_graph(&self, scope_guid: Option<&str>) -> Result<MaterializedGraph, FetchError> {
		let mut request = self.client.get(&self.endpoint);
		if let Some(guid) = scope_guid {
			request = request.query(&[("guid", guid)]);
		}
		debug!("GET {} guid={:?}", self.endpoint, scope_guid);

		let response = request
			.send()
			.await
			.map_err(|e| FetchError::Transport(e.to_string()))?;
		let status = response.status().as_u16();
		let body: GraphResponse = response
			.json()
			.await
			.map_err(|e| FetchError::Decode(e.to_string()))?;
		body.into_graph(status)
	}
}
