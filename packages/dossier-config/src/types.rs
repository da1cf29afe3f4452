use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub research: Research,
	#[serde(default)]
	pub presets: Presets,
	pub collections: Vec<CollectionProfile>,
	#[serde(default)]
	pub system_collections: Vec<SystemCollectionProfile>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub vector_dim: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub web_search: WebSearchProviderConfig,
	pub embedding: EmbeddingProviderConfig,
	pub completion: CompletionProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct WebSearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Research {
	/// Upper bound on planned questions per deep run.
	pub max_questions: u32,
	/// Process-wide cap on simultaneous external calls.
	pub max_concurrent_calls: u32,
	pub web_max_results: u32,
	pub vector_max_results: u32,
	/// Default minimum similarity for vector hits; system collections override it.
	pub min_score: f32,
	pub default_language: String,
	/// Collection names or system-collection ids queried when a request names none.
	#[serde(default)]
	pub default_collections: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Presets {
	pub optimizer: HashMap<String, OptimizerPreset>,
	pub index: HashMap<String, IndexPreset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptimizerPreset {
	pub default_segment_number: u64,
	pub indexing_threshold: u64,
	pub memmap_threshold: u64,
	pub flush_interval_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexPreset {
	pub m: u64,
	pub ef_construct: u64,
	pub full_scan_threshold: u64,
	pub on_disk: bool,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProfile {
	pub name: String,
	pub label: Option<String>,
	pub optimizer: String,
	pub index: String,
	#[serde(default)]
	pub fields: Vec<FieldSpec>,
	pub tenant_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
	pub name: String,
	pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
	Keyword,
	TenantKeyword,
	Text,
}

#[derive(Debug, Deserialize)]
pub struct SystemCollectionProfile {
	pub id: String,
	pub collection: String,
	pub label: String,
	#[serde(default)]
	pub description: String,
	pub min_score: f32,
	pub recall_limit: u32,
}
