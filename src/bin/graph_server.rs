//! Backend process: serves the graph endpoint over a Neo4j store.

use std::sync::Arc;

use anyhow::Context;
use log::info;

use ifc_graph_bridge::config::ServerConfig;
use ifc_graph_bridge::gateway::Gateway;
use ifc_graph_bridge::gateway::neo4j::Neo4jStore;
use ifc_graph_bridge::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_env();
	info!("graph store at {} as {}", config.store.uri, config.store.user);

	let gateway = Arc::new(Gateway::new(Neo4jStore::new(config.store.clone())));
	let app = server::router(gateway);

	let listener = tokio::net::TcpListener::bind(config.addr)
		.await
		.with_context(|| format!("binding {}", config.addr))?;
	info!("graph server listening on http://{}", config.addr);
	axum::serve(listener, app).await.context("serving")?;
	Ok(())
}
