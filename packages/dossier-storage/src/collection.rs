use qdrant_client::qdrant::{Distance, HnswConfigDiff, OptimizersConfigDiff};

use dossier_config::{Profile, Registry};

use crate::{Result, store::VectorStore};

/// Index configuration for one collection: the profile's optimizer and HNSW
/// presets merged with the vector geometry. Pure with respect to its inputs,
/// so the same profile and dimension always produce the same value.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexConfig {
	pub vector_dim: u64,
	pub distance: Distance,
	pub hnsw: HnswConfigDiff,
	pub optimizers: OptimizersConfigDiff,
}

pub fn index_config(vector_dim: u32, profile: &Profile) -> IndexConfig {
	IndexConfig {
		vector_dim: u64::from(vector_dim),
		distance: Distance::Cosine,
		hnsw: HnswConfigDiff {
			m: Some(profile.index.m),
			ef_construct: Some(profile.index.ef_construct),
			full_scan_threshold: Some(profile.index.full_scan_threshold),
			on_disk: Some(profile.index.on_disk),
			..Default::default()
		},
		optimizers: OptimizersConfigDiff {
			default_segment_number: Some(profile.optimizer.default_segment_number),
			memmap_threshold: Some(profile.optimizer.memmap_threshold),
			indexing_threshold: Some(profile.optimizer.indexing_threshold),
			flush_interval_sec: Some(profile.optimizer.flush_interval_sec),
			..Default::default()
		},
	}
}

/// Creates every registry collection that does not exist yet, including its
/// payload field indexes. Returns the names that were created.
pub async fn ensure_collections(store: &VectorStore, registry: &Registry) -> Result<Vec<String>> {
	let mut created = Vec::new();

	for profile in registry.profiles() {
		if store.collection_exists(&profile.name).await? {
			continue;
		}

		store.create_collection(&profile.name, &index_config(store.vector_dim(), profile)).await?;
		store.create_field_indexes(&profile.name, &profile.fields).await?;
		created.push(profile.name.clone());
	}

	Ok(created)
}
