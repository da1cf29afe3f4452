use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceSource;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Citation {
	pub index: u32,
	pub source_id: String,
	pub title: String,
	pub cited_text: String,
	pub score: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub document_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Allocates stable 1-based citation indices over gathered evidence. Lives
/// for exactly one envelope; indices never change once handed out.
#[derive(Debug, Default)]
pub struct CitationTracker {
	indices: HashMap<String, u32>,
	citations: Vec<Citation>,
}
impl CitationTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the source's citation index, allocating the next sequential
	/// one on first use.
	pub fn cite(&mut self, source: &EvidenceSource) -> u32 {
		if let Some(&index) = self.indices.get(&source.id) {
			return index;
		}

		let index = self.citations.len() as u32 + 1;

		self.indices.insert(source.id.clone(), index);
		self.citations.push(Citation {
			index,
			source_id: source.id.clone(),
			title: source.title.clone(),
			cited_text: source.snippet.clone(),
			score: source.score,
			document_id: source.document_id.clone(),
			url: source.url.clone(),
		});

		index
	}

	pub fn resolve(&self, index: u32) -> Option<&Citation> {
		index.checked_sub(1).and_then(|idx| self.citations.get(idx as usize))
	}

	pub fn len(&self) -> usize {
		self.citations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.citations.is_empty()
	}

	pub fn into_citations(self) -> Vec<Citation> {
		self.citations
	}
}

/// Extracts `[n]` citation markers in order of appearance.
pub fn extract_markers(text: &str) -> Vec<u32> {
	let Ok(re) = Regex::new(r"\[(\d{1,4})\]") else {
		return Vec::new();
	};

	re.captures_iter(text)
		.filter_map(|caps| caps.get(1).and_then(|digits| digits.as_str().parse().ok()))
		.collect()
}

/// Markers in the text that do not resolve to an allocated citation index.
pub fn unknown_markers(text: &str, citation_count: usize) -> Vec<u32> {
	let mut unknown: Vec<u32> = extract_markers(text)
		.into_iter()
		.filter(|&marker| marker == 0 || marker as usize > citation_count)
		.collect();

	unknown.sort_unstable();
	unknown.dedup();

	unknown
}
