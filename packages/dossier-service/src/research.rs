//! Research run orchestration.
//!
//! A run walks an explicit stage machine: plan, gather, merge, categorize,
//! synthesize. Stage failures degrade the envelope instead of aborting the
//! run; the only terminal error is a run that ends with no sources and no
//! synthesized text.

use std::{
	collections::{BTreeMap, BTreeSet},
	mem,
	time::Instant,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use dossier_config::Registry;
use dossier_domain::{
	Citation, CitationTracker, EvidenceSource, categorize, detect_language, merge_ranked,
};
use dossier_storage::filter::FilterRequest;

use crate::{
	DossierService, ServiceError, ServiceResult,
	gather::{gather_evidence, target_plans},
	plan::plan_questions,
	synthesize::synthesize,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
	#[default]
	Normal,
	Deep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStatus {
	Success,
	Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchRequest {
	pub query: String,
	pub tenant_id: String,
	#[serde(default)]
	pub mode: ResearchMode,
	#[serde(default)]
	pub collections: Vec<String>,
	#[serde(default)]
	pub filters: Option<FilterRequest>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub max_results: Option<u32>,
	#[serde(default = "default_include_summary")]
	pub include_summary: bool,
	#[serde(default)]
	pub trace_id: Option<String>,
}

fn default_include_summary() -> bool {
	true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchEnvelope {
	pub status: ResearchStatus,
	pub query: String,
	pub sources: Vec<EvidenceSource>,
	pub citations: Vec<Citation>,
	pub categories: BTreeMap<String, Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dossier: Option<String>,
	pub metadata: ResearchMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchMetadata {
	pub trace_id: String,
	pub mode: ResearchMode,
	pub language: String,
	pub duration_ms: u64,
	#[serde(with = "crate::time_serde")]
	pub generated_at: OffsetDateTime,
	pub questions: Vec<String>,
	pub counts: StageCounts,
	pub degraded_stages: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct StageCounts {
	pub planned: u32,
	pub web: u32,
	pub vector: u32,
	pub merged: u32,
	pub cited: u32,
}

/// Stages a run can degrade in. Ordered like the pipeline so the rendered
/// list reads in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DegradedStage {
	Plan,
	Web,
	Vector,
	Synthesis,
}
impl DegradedStage {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Plan => "plan",
			Self::Web => "web",
			Self::Vector => "vector",
			Self::Synthesis => "synthesis",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	Start,
	Plan,
	Gather,
	Merge,
	Categorize,
	Synthesize,
	Done,
	Error,
}
impl Stage {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Done | Self::Error)
	}
}

/// The full transition table. Only the synthesize transition branches: a run
/// that ends with neither sources nor synthesized text is an error, anything
/// else is done. Terminal stages absorb.
pub fn advance(stage: Stage, has_sources: bool, has_synthesis: bool) -> Stage {
	match stage {
		Stage::Start => Stage::Plan,
		Stage::Plan => Stage::Gather,
		Stage::Gather => Stage::Merge,
		Stage::Merge => Stage::Categorize,
		Stage::Categorize => Stage::Synthesize,
		Stage::Synthesize => {
			if !has_sources && !has_synthesis {
				Stage::Error
			} else {
				Stage::Done
			}
		},
		Stage::Done => Stage::Done,
		Stage::Error => Stage::Error,
	}
}

#[derive(Default)]
struct RunState {
	questions: Vec<String>,
	batches: Vec<Vec<EvidenceSource>>,
	sources: Vec<EvidenceSource>,
	categories: BTreeMap<String, Vec<String>>,
	tracker: CitationTracker,
	text: Option<String>,
	counts: StageCounts,
	degraded: BTreeSet<DegradedStage>,
}

impl DossierService {
	/// Runs one research request to a terminal stage. Fails only on malformed
	/// requests; every provider failure degrades the returned envelope
	/// instead.
	pub async fn run_research(&self, request: ResearchRequest) -> ServiceResult<ResearchEnvelope> {
		validate(&request)?;

		let started = Instant::now();
		let mode = request.mode;
		let language = request
			.language
			.clone()
			.filter(|lang| !lang.trim().is_empty())
			.or_else(|| detect_language(&request.query).map(str::to_string))
			.unwrap_or_else(|| self.cfg.research.default_language.clone());
		let trace_id = request
			.trace_id
			.clone()
			.filter(|id| !id.trim().is_empty())
			.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
		let mut stage = Stage::Start;
		let mut state = RunState::default();

		while !stage.is_terminal() {
			match stage {
				Stage::Plan => {
					let (questions, degraded) =
						plan_questions(self, &request.query, mode, &language).await;

					if degraded {
						state.degraded.insert(DegradedStage::Plan);
					}

					state.counts.planned = questions.len() as u32;
					state.questions = questions;
				},
				Stage::Gather => {
					let (plans, dropped) = target_plans(
						&self.registry,
						&self.cfg.research,
						&request.tenant_id,
						&request.collections,
						request.filters.as_ref(),
						request.max_results,
					);
					let web_limit = match request.max_results {
						Some(cap) => cap.min(self.cfg.research.web_max_results),
						None => self.cfg.research.web_max_results,
					};
					let outcome =
						gather_evidence(self, &state.questions, &language, &plans, web_limit).await;

					if outcome.web_degraded {
						state.degraded.insert(DegradedStage::Web);
					}
					if outcome.vector_degraded || dropped {
						state.degraded.insert(DegradedStage::Vector);
					}

					state.counts.web = outcome.web_hits;
					state.counts.vector = outcome.vector_hits;
					state.batches = outcome.batches;
				},
				Stage::Merge => {
					let mut sources = merge_ranked(mem::take(&mut state.batches));

					if let Some(cap) = request.max_results {
						sources.truncate(cap as usize);
					}

					state.counts.merged = sources.len() as u32;
					state.sources = sources;
				},
				Stage::Categorize => {
					state.categories = match mode {
						ResearchMode::Normal => categorize(&state.sources, |_| "all".to_string()),
						ResearchMode::Deep => categorize(&state.sources, |source| {
							category_label(&self.registry, source)
						}),
					};
				},
				Stage::Synthesize => {
					if request.include_summary {
						let outcome = synthesize(
							self,
							&request.query,
							&language,
							mode,
							&state.sources,
							&mut state.tracker,
						)
						.await;

						if outcome.degraded {
							state.degraded.insert(DegradedStage::Synthesis);
						}

						state.text = outcome.text;
						state.counts.cited = state.tracker.len() as u32;
					}
				},
				Stage::Start | Stage::Done | Stage::Error => {},
			}

			stage = advance(stage, !state.sources.is_empty(), state.text.is_some());
		}

		let status =
			if stage == Stage::Error { ResearchStatus::Error } else { ResearchStatus::Success };
		let (summary, dossier) = match mode {
			ResearchMode::Normal => (state.text, None),
			ResearchMode::Deep => (None, state.text),
		};
		let metadata = ResearchMetadata {
			trace_id,
			mode,
			language,
			duration_ms: started.elapsed().as_millis() as u64,
			generated_at: OffsetDateTime::now_utc(),
			questions: state.questions,
			counts: state.counts,
			degraded_stages: state.degraded.iter().map(|stage| stage.as_str().to_string()).collect(),
		};

		tracing::info!(
			trace_id = %metadata.trace_id,
			status = ?status,
			mode = ?mode,
			planned = metadata.counts.planned,
			merged = metadata.counts.merged,
			degraded = metadata.degraded_stages.len(),
			duration_ms = metadata.duration_ms,
			"Research run finished."
		);

		Ok(ResearchEnvelope {
			status,
			query: request.query,
			sources: state.sources,
			citations: state.tracker.into_citations(),
			categories: state.categories,
			summary,
			dossier,
			metadata,
		})
	}
}

fn validate(request: &ResearchRequest) -> ServiceResult<()> {
	if request.query.trim().is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "query must not be empty.".to_string(),
		});
	}
	if request.tenant_id.trim().is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "tenant_id must not be empty.".to_string(),
		});
	}
	if request.max_results == Some(0) {
		return Err(ServiceError::InvalidRequest {
			message: "max_results must be at least 1.".to_string(),
		});
	}

	Ok(())
}

/// Category for one source in deep mode: web hits bucket together, stored
/// hits bucket by their collection's label.
fn category_label(registry: &Registry, source: &EvidenceSource) -> String {
	match &source.collection {
		Some(collection) => registry
			.target(collection)
			.map(|target| target.label().to_string())
			.unwrap_or_else(|| collection.clone()),
		None => "web".to_string(),
	}
}
