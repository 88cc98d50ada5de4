use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	pub api_key: String,
	#[serde(default = "default_embedding_path")]
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	#[serde(default = "default_embedding_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Worker {
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	#[serde(default = "default_max_attempts")]
	pub max_attempts: i32,
	#[serde(default = "default_claim_lease_seconds")]
	pub claim_lease_seconds: i64,
}

fn default_embedding_path() -> String {
	"/v1/embeddings".to_string()
}

fn default_embedding_timeout_ms() -> u64 {
	30_000
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_batch_size() -> u32 {
	16
}

fn default_max_attempts() -> i32 {
	3
}

fn default_claim_lease_seconds() -> i64 {
	30
}
