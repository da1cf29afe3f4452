use futures::future::join_all;
use qdrant_client::qdrant::Filter;
use serde_json::{Map, Value};
use tracing::warn;

use dossier_config::{Registry, Research};
use dossier_domain::{EvidenceSource, Origin, clean_snippet};
use dossier_providers::web_search::WebHit;
use dossier_storage::filter::{FilterRequest, build_filter, conditions_for, owner_condition};

use crate::{DossierService, VectorHit};

/// Snippets are clipped to this many grapheme clusters before they enter the
/// evidence pool.
const MAX_SNIPPET_GRAPHEMES: usize = 480;

/// One vector query target, resolved and scoped before any task starts.
#[derive(Clone, Debug)]
pub(crate) struct TargetPlan {
	pub collection: String,
	pub owner: Option<String>,
	pub filter: Option<Filter>,
	pub min_score: f32,
	pub recall_limit: u32,
}

/// Resolves request collection references into concrete query plans. Unknown
/// references are dropped with a warning; the second value reports whether
/// any were dropped.
pub(crate) fn target_plans(
	registry: &Registry,
	research: &Research,
	tenant_id: &str,
	requested: &[String],
	filters: Option<&FilterRequest>,
	max_results: Option<u32>,
) -> (Vec<TargetPlan>, bool) {
	let mut dropped = false;
	let targets = if requested.is_empty() {
		registry.default_targets()
	} else {
		let mut targets = Vec::with_capacity(requested.len());

		for reference in requested {
			match registry.target(reference) {
				Some(target) => targets.push(target),
				None => {
					warn!(reference = %reference, "Unknown collection reference dropped from the request.");

					dropped = true;
				},
			}
		}

		targets
	};
	let plans = targets
		.into_iter()
		.map(|target| {
			let profile = target.profile();
			let owner = target.owner(tenant_id);
			let conditions =
				filters.map(|request| conditions_for(request, profile)).unwrap_or_default();
			let filter = build_filter(conditions, owner_condition(profile, owner));
			let recall = match max_results {
				Some(cap) => target.recall_limit(research.vector_max_results).min(cap),
				None => target.recall_limit(research.vector_max_results),
			};

			TargetPlan {
				collection: target.collection().to_string(),
				owner: profile.tenant_field.as_ref().map(|_| owner.to_string()),
				filter,
				min_score: target.min_score(research.min_score),
				recall_limit: recall,
			}
		})
		.collect();

	(plans, dropped)
}

/// What the gather stage produced, reduced from the joined task outcomes.
/// Batches keep their per-task ranking for the merge stage.
pub(crate) struct GatherOutcome {
	pub batches: Vec<Vec<EvidenceSource>>,
	pub web_hits: u32,
	pub vector_hits: u32,
	pub web_degraded: bool,
	pub vector_degraded: bool,
}

/// Fans out one web and one vector task per question, bounded by the service
/// call limiter, and reduces the outcomes after every task has finished. A
/// failed task degrades its stage without touching sibling results.
pub(crate) async fn gather_evidence(
	service: &DossierService,
	questions: &[String],
	language: &str,
	plans: &[TargetPlan],
	web_limit: u32,
) -> GatherOutcome {
	let mut specs = Vec::with_capacity(questions.len() * 2);

	for question in questions {
		specs.push(TaskSpec::Web { question });

		if !plans.is_empty() {
			specs.push(TaskSpec::Vector { question });
		}
	}

	let outcomes =
		join_all(specs.into_iter().map(|spec| run_task(service, spec, language, plans, web_limit)))
			.await;
	let mut gathered = GatherOutcome {
		batches: Vec::with_capacity(outcomes.len()),
		web_hits: 0,
		vector_hits: 0,
		web_degraded: false,
		vector_degraded: false,
	};

	for outcome in outcomes {
		match outcome.origin {
			Origin::Web => {
				gathered.web_hits += outcome.sources.len() as u32;
				gathered.web_degraded |= outcome.failed;
			},
			Origin::Vector => {
				gathered.vector_hits += outcome.sources.len() as u32;
				gathered.vector_degraded |= outcome.failed;
			},
		}

		gathered.batches.push(outcome.sources);
	}

	gathered
}

enum TaskSpec<'a> {
	Web { question: &'a str },
	Vector { question: &'a str },
}
impl TaskSpec<'_> {
	fn origin(&self) -> Origin {
		match self {
			Self::Web { .. } => Origin::Web,
			Self::Vector { .. } => Origin::Vector,
		}
	}
}

struct TaskOutcome {
	origin: Origin,
	sources: Vec<EvidenceSource>,
	failed: bool,
}

async fn run_task(
	service: &DossierService,
	spec: TaskSpec<'_>,
	language: &str,
	plans: &[TargetPlan],
	web_limit: u32,
) -> TaskOutcome {
	let origin = spec.origin();
	let Ok(_permit) = service.limiter().acquire().await else {
		return TaskOutcome { origin, sources: Vec::new(), failed: true };
	};

	match spec {
		TaskSpec::Web { question } => web_task(service, question, language, web_limit).await,
		TaskSpec::Vector { question } => vector_task(service, question, plans).await,
	}
}

async fn web_task(
	service: &DossierService,
	question: &str,
	language: &str,
	web_limit: u32,
) -> TaskOutcome {
	let result = service
		.providers
		.web_search
		.search(&service.cfg.providers.web_search, question, web_limit, language)
		.await;

	match result {
		Ok(hits) => TaskOutcome { origin: Origin::Web, sources: web_sources(hits), failed: false },
		Err(err) => {
			warn!(error = %err, question = %question, "Web search failed; continuing without its results.");

			TaskOutcome { origin: Origin::Web, sources: Vec::new(), failed: true }
		},
	}
}

async fn vector_task(service: &DossierService, question: &str, plans: &[TargetPlan]) -> TaskOutcome {
	let vector = match service
		.providers
		.embedding
		.embed_query(&service.cfg.providers.embedding, question)
		.await
	{
		Ok(vector) => vector,
		Err(err) => {
			warn!(error = %err, question = %question, "Query embedding failed; skipping vector search for this question.");

			return TaskOutcome { origin: Origin::Vector, sources: Vec::new(), failed: true };
		},
	};
	let mut sources = Vec::new();
	let mut failed = false;

	for plan in plans {
		let result = service
			.providers
			.vector_search
			.query(
				&plan.collection,
				vector.clone(),
				plan.filter.clone(),
				plan.recall_limit,
				plan.min_score,
			)
			.await;

		match result {
			Ok(hits) => sources.extend(
				hits.into_iter()
					.map(|hit| vector_source(hit, &plan.collection, plan.owner.as_deref())),
			),
			Err(err) => {
				warn!(
					error = %err,
					collection = %plan.collection,
					"Vector search failed; continuing with the remaining collections."
				);

				failed = true;
			},
		}
	}

	TaskOutcome { origin: Origin::Vector, sources, failed }
}

/// Web hits arrive ranked by the provider. Hits without a score get a
/// harmonic rank fallback so they merge behind explicitly scored ones.
fn web_sources(hits: Vec<WebHit>) -> Vec<EvidenceSource> {
	hits.into_iter()
		.enumerate()
		.map(|(rank, hit)| {
			let id = EvidenceSource::identity(Origin::Web, &hit.url);
			let score = hit.score.unwrap_or_else(|| 1.0 / (rank as f32 + 2.0));
			let title = if hit.title.trim().is_empty() { hit.url.clone() } else { hit.title };

			EvidenceSource {
				id,
				origin: Origin::Web,
				collection: None,
				title,
				snippet: clean_snippet(&hit.snippet, MAX_SNIPPET_GRAPHEMES),
				score,
				url: Some(hit.url),
				document_id: None,
				tenant: None,
			}
		})
		.collect()
}

fn vector_source(hit: VectorHit, collection: &str, owner: Option<&str>) -> EvidenceSource {
	let locator = format!("{collection}/{}", hit.id);
	let title = payload_str(&hit.payload, &["title", "document_title", "source"])
		.unwrap_or_else(|| format!("{collection} #{}", hit.id));
	let snippet = payload_str(&hit.payload, &["text", "chunk", "content", "snippet"])
		.map(|text| clean_snippet(&text, MAX_SNIPPET_GRAPHEMES))
		.unwrap_or_default();

	EvidenceSource {
		id: EvidenceSource::identity(Origin::Vector, &locator),
		origin: Origin::Vector,
		collection: Some(collection.to_string()),
		title,
		snippet,
		score: hit.score,
		url: payload_str(&hit.payload, &["url", "source_url"]),
		document_id: payload_str(&hit.payload, &["document_id", "doc_id"]),
		tenant: owner.map(str::to_string),
	}
}

/// First non-empty string under any of the given payload keys.
fn payload_str(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
	keys.iter()
		.filter_map(|key| payload.get(*key))
		.filter_map(Value::as_str)
		.map(str::trim)
		.find(|text| !text.is_empty())
		.map(str::to_string)
}
