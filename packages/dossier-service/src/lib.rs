pub mod catalog;
pub mod research;
pub mod time_serde;

mod gather;
mod plan;
mod synthesize;

use std::{future::Future, pin::Pin, sync::Arc};

use qdrant_client::qdrant::{Filter, PointId, ScoredPoint, point_id::PointIdOptions, value::Kind};
use serde_json::Value;
use tokio::sync::Semaphore;

pub use catalog::{CatalogCollection, CatalogField, CatalogSystem, CollectionCatalog};
pub use research::{
	DegradedStage, ResearchEnvelope, ResearchMetadata, ResearchMode, ResearchRequest,
	ResearchStatus, Stage, StageCounts,
};

use dossier_config::{
	CompletionProviderConfig, Config, EmbeddingProviderConfig, Registry, WebSearchProviderConfig,
};
use dossier_providers::{completion, embedding, web_search, web_search::WebHit};
use dossier_storage::store::VectorStore;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait WebSearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a WebSearchProviderConfig,
		question: &'a str,
		max_results: u32,
		language: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<WebHit>>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed_query<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete_text<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>>;

	fn complete_json<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>>;
}

pub trait VectorSearchProvider
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		collection: &'a str,
		vector: Vec<f32>,
		filter: Option<Filter>,
		limit: u32,
		min_score: f32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorHit>>>;
}

/// One hit returned by the vector search boundary, payload decoded to JSON.
#[derive(Clone, Debug)]
pub struct VectorHit {
	pub id: String,
	pub score: f32,
	pub payload: serde_json::Map<String, Value>,
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

#[derive(Clone)]
pub struct Providers {
	pub web_search: Arc<dyn WebSearchProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
	pub vector_search: Arc<dyn VectorSearchProvider>,
}
impl Providers {
	pub fn new(
		web_search: Arc<dyn WebSearchProvider>,
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
		vector_search: Arc<dyn VectorSearchProvider>,
	) -> Self {
		Self { web_search, embedding, completion, vector_search }
	}

	/// Default wiring: HTTP providers plus the given vector store.
	pub fn with_store(store: Arc<VectorStore>) -> Self {
		let http = Arc::new(DefaultProviders);

		Self {
			web_search: http.clone(),
			embedding: http.clone(),
			completion: http,
			vector_search: Arc::new(StoreVectorSearch { store }),
		}
	}
}

pub struct DossierService {
	pub cfg: Config,
	pub registry: Arc<Registry>,
	pub providers: Providers,
	limiter: Arc<Semaphore>,
}
impl DossierService {
	pub fn new(cfg: Config, registry: Arc<Registry>, store: Arc<VectorStore>) -> Self {
		let providers = Providers::with_store(store);

		Self::with_providers(cfg, registry, providers)
	}

	pub fn with_providers(cfg: Config, registry: Arc<Registry>, providers: Providers) -> Self {
		let limiter = Arc::new(Semaphore::new(cfg.research.max_concurrent_calls as usize));

		Self { cfg, registry, providers, limiter }
	}

	pub(crate) fn limiter(&self) -> &Arc<Semaphore> {
		&self.limiter
	}
}

struct DefaultProviders;

impl WebSearchProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a WebSearchProviderConfig,
		question: &'a str,
		max_results: u32,
		language: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<WebHit>>> {
		Box::pin(web_search::search(cfg, question, max_results, language))
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed_query<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(embedding::embed_query(cfg, text))
	}
}

impl CompletionProvider for DefaultProviders {
	fn complete_text<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(completion::complete_text(cfg, messages))
	}

	fn complete_json<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(completion::complete_json(cfg, messages))
	}
}

struct StoreVectorSearch {
	store: Arc<VectorStore>,
}
impl VectorSearchProvider for StoreVectorSearch {
	fn query<'a>(
		&'a self,
		collection: &'a str,
		vector: Vec<f32>,
		filter: Option<Filter>,
		limit: u32,
		min_score: f32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<VectorHit>>> {
		Box::pin(async move {
			let points = self.store.query(collection, vector, filter, limit, min_score).await?;

			Ok(points.into_iter().filter_map(vector_hit_from_point).collect())
		})
	}
}

fn vector_hit_from_point(point: ScoredPoint) -> Option<VectorHit> {
	let id = point_id_string(point.id.as_ref())?;
	let payload =
		point.payload.into_iter().map(|(key, value)| (key, json_from_qdrant(value))).collect();

	Some(VectorHit { id, score: point.score, payload })
}

fn point_id_string(id: Option<&PointId>) -> Option<String> {
	match id?.point_id_options.as_ref()? {
		PointIdOptions::Num(num) => Some(num.to_string()),
		PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
	}
}

fn json_from_qdrant(value: qdrant_client::qdrant::Value) -> Value {
	match value.kind {
		Some(Kind::BoolValue(flag)) => Value::Bool(flag),
		Some(Kind::IntegerValue(number)) => Value::Number(number.into()),
		Some(Kind::DoubleValue(number)) => {
			serde_json::Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null)
		},
		Some(Kind::StringValue(text)) => Value::String(text),
		Some(Kind::ListValue(list)) => {
			Value::Array(list.values.into_iter().map(json_from_qdrant).collect())
		},
		Some(Kind::StructValue(object)) => Value::Object(
			object.fields.into_iter().map(|(key, value)| (key, json_from_qdrant(value))).collect(),
		),
		Some(Kind::NullValue(_)) | None => Value::Null,
	}
}
