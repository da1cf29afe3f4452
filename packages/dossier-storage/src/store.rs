use std::time::Duration;

use qdrant_client::{
	Qdrant,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, FieldType, Filter, Query,
		QueryPointsBuilder, ScoredPoint, VectorParamsBuilder,
	},
};

use dossier_config::{FieldKind, FieldSpec};

use crate::{Error, Result, collection::IndexConfig};

pub struct VectorStore {
	pub client: Qdrant,
	vector_dim: u32,
}
impl VectorStore {
	pub fn new(cfg: &dossier_config::Qdrant) -> Result<Self> {
		let client =
			Qdrant::from_url(&cfg.url).timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, vector_dim: cfg.vector_dim })
	}

	pub fn vector_dim(&self) -> u32 {
		self.vector_dim
	}

	pub async fn collection_exists(&self, name: &str) -> Result<bool> {
		Ok(self.client.collection_exists(name).await?)
	}

	pub async fn create_collection(&self, name: &str, index: &IndexConfig) -> Result<()> {
		let vectors = VectorParamsBuilder::new(index.vector_dim, index.distance)
			.hnsw_config(index.hnsw.clone());
		let request = CreateCollectionBuilder::new(name)
			.vectors_config(vectors)
			.optimizers_config(index.optimizers.clone());

		self.client.create_collection(request).await?;

		Ok(())
	}

	pub async fn create_field_indexes(&self, name: &str, fields: &[FieldSpec]) -> Result<()> {
		for field in fields {
			let field_type = match field.kind {
				FieldKind::Keyword | FieldKind::TenantKeyword => FieldType::Keyword,
				FieldKind::Text => FieldType::Text,
			};
			let request = CreateFieldIndexCollectionBuilder::new(name, &field.name, field_type);

			self.client.create_field_index(request).await?;
		}

		Ok(())
	}

	/// Similarity query with a server-side score floor and recall cap.
	pub async fn query(
		&self,
		collection: &str,
		vector: Vec<f32>,
		filter: Option<Filter>,
		limit: u32,
		min_score: f32,
	) -> Result<Vec<ScoredPoint>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Query vector has {} dimensions, collections expect {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let mut search = QueryPointsBuilder::new(collection)
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(u64::from(limit))
			.score_threshold(min_score);

		if let Some(filter) = filter {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;

		Ok(response.result)
	}
}
