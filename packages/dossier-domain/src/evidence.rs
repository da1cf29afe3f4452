use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
	Web,
	Vector,
}

/// One piece of gathered evidence, ready for citation and synthesis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceSource {
	pub id: String,
	pub origin: Origin,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub collection: Option<String>,
	pub title: String,
	pub snippet: String,
	pub score: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub document_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tenant: Option<String>,
}
impl EvidenceSource {
	/// Stable identity used for citation tracking and merge de-duplication.
	/// Web sources pass their URL as locator, vector sources their
	/// collection-qualified point id.
	pub fn identity(origin: Origin, locator: &str) -> String {
		let tag = match origin {
			Origin::Web => "web",
			Origin::Vector => "vector",
		};
		let hash = blake3::hash(format!("{tag}:{locator}").as_bytes()).to_hex();

		hash[..16].to_string()
	}
}

/// Combines per-gatherer batches into one ranked list: stable descending sort
/// on score, so equal scores keep their per-batch rank order, then duplicate
/// identities collapse onto the best-ranked occurrence.
pub fn merge_ranked(batches: Vec<Vec<EvidenceSource>>) -> Vec<EvidenceSource> {
	let mut merged: Vec<EvidenceSource> = batches.into_iter().flatten().collect();

	merged.sort_by(|a, b| b.score.total_cmp(&a.score));

	let mut seen = HashSet::with_capacity(merged.len());

	merged.retain(|source| seen.insert(source.id.clone()));

	merged
}
