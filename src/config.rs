//! Runtime configuration.
//!
//! Store and server settings come from the environment with local-development
//! defaults; layout and view tuning are plain structs with `Default`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Connection settings for the property-graph store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
	/// Bolt URI, `bolt://localhost:7687` by default.
	pub uri: String,
	/// Login name.
	pub user: String,
	/// Sent as-is; an empty password is allowed.
	pub password: String,
	/// Database name; the server default when unset.
	pub database: Option<String>,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			uri: "bolt://localhost:7687".to_string(),
			user: "neo4j".to_string(),
			password: "password".to_string(),
			database: None,
		}
	}
}

impl StoreConfig {
	/// Reads `NEO4J_URI`, `NEO4J_USER` (or `NEO4J_USERNAME`), `NEO4J_PASSWORD`
	/// and `NEO4J_DATABASE`.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let defaults = Self::default();
		let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
		Self {
			uri: non_empty("NEO4J_URI").unwrap_or(defaults.uri),
			user: non_empty("NEO4J_USER")
				.or_else(|| non_empty("NEO4J_USERNAME"))
				.unwrap_or(defaults.user),
			password: lookup("NEO4J_PASSWORD").unwrap_or(defaults.password),
			database: non_empty("NEO4J_DATABASE"),
		}
	}
}

/// Backend process settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
	/// Listen address.
	pub addr: SocketAddr,
	/// Store the backend queries.
	pub store: StoreConfig,
}

impl ServerConfig {
	/// Port used when `PORT` is unset or unparseable.
	pub const DEFAULT_PORT: u16 = 4000;

	/// Reads `HOST` and `PORT` plus the store variables. Unparseable values
	/// fall back to the defaults.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let host = lookup("HOST")
			.and_then(|h| h.parse::<IpAddr>().ok())
			.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
		let port = lookup("PORT")
			.and_then(|p| p.parse::<u16>().ok())
			.unwrap_or(Self::DEFAULT_PORT);
		Self {
			addr: SocketAddr::new(host, port),
			store: StoreConfig::from_lookup(lookup),
		}
	}
}

/// Force simulation tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
	/// Target length of a link at rest, in model units.
	pub rest_length: f32,
	/// Share of the rest-length error corrected per tick at full alpha.
	pub link_strength: f32,
	/// Pull toward the viewport center.
	pub center_strength: f32,
	/// Node repulsion.
	pub charge: f32,
	/// Spring constant handed to the integrator.
	pub spring: f32,
	/// Cap on the force applied to one node per step.
	pub max_force: f32,
	/// Cap on node velocity.
	pub node_speed: f32,
	/// Velocity retained per step.
	pub damping: f32,
	/// Mass of every node.
	pub node_mass: f32,
	/// Fraction of the remaining activity lost per tick.
	pub alpha_decay: f32,
	/// Below this activity the layout is idle.
	pub alpha_min: f32,
	/// Activity held while a node is dragged.
	pub drag_alpha_target: f32,
	/// Radius of the ring new nodes are seeded on.
	pub seed_radius: f32,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			rest_length: 100.0,
			link_strength: 0.3,
			center_strength: 1.0,
			charge: 300.0,
			spring: 0.02,
			max_force: 100.0,
			node_speed: 3000.0,
			damping: 0.9,
			node_mass: 10.0,
			alpha_decay: 0.0228,
			alpha_min: 0.001,
			drag_alpha_target: 0.3,
			seed_radius: 100.0,
		}
	}
}

/// Canvas view tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewConfig {
	/// Smallest zoom factor.
	pub min_scale: f64,
	/// Largest zoom factor.
	pub max_scale: f64,
	/// Multiplier applied by the zoom-in/zoom-out controls.
	pub zoom_step: f64,
	/// Multiplier applied per wheel notch.
	pub wheel_factor: f64,
	/// Duration of animated zoom transitions, in seconds.
	pub zoom_duration: f64,
	/// Node labels longer than this many characters are cut with an ellipsis.
	pub label_budget: usize,
	/// Pointer travel, in screen pixels, that turns a press into a drag.
	pub click_slop: f64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.1,
			max_scale: 2.0,
			zoom_step: 1.25,
			wheel_factor: 1.1,
			zoom_duration: 0.3,
			label_budget: 18,
			click_slop: 4.0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn empty_environment_uses_defaults() {
		let cfg = ServerConfig::from_lookup(env(&[]));
		assert_eq!(cfg.addr.port(), 4000);
		assert_eq!(cfg.store, StoreConfig::default());
	}

	#[test]
	fn overrides_are_applied() {
		let cfg = ServerConfig::from_lookup(env(&[
			("NEO4J_URI", "bolt://db:7687"),
			("NEO4J_USERNAME", "reader"),
			("NEO4J_PASSWORD", "s3cret"),
			("PORT", "8081"),
			("HOST", "0.0.0.0"),
		]));
		assert_eq!(cfg.store.uri, "bolt://db:7687");
		assert_eq!(cfg.store.user, "reader");
		assert_eq!(cfg.store.password, "s3cret");
		assert_eq!(cfg.addr.to_string(), "0.0.0.0:8081");
	}

	#[test]
	fn bad_port_falls_back() {
		let cfg = ServerConfig::from_lookup(env(&[("PORT", "eighty")]));
		assert_eq!(cfg.addr.port(), ServerConfig::DEFAULT_PORT);
	}
}
