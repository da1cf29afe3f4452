use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use crate::acceptance::{
	FailingEmbedding, FailingWebSearch, FlakyWebSearch, StubCompletion, StubEmbedding,
	StubVectorSearch, StubWebSearch, build_service, default_vector_hits, research_request, web_hit,
};
use dossier_domain::Origin;
use dossier_service::{Providers, ResearchMode, ResearchStatus};

#[tokio::test]
async fn failed_planning_falls_back_to_the_original_query() {
	let mut completion = StubCompletion::new(json!({}), "Befund [1].");

	completion.fail_plan = true;

	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.7))])),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(completion),
		Arc::new(StubVectorSearch::new(default_vector_hits())),
	));
	let mut request = research_request("Mietpreisbremse", "user-123");

	request.mode = ResearchMode::Deep;

	let envelope = service.run_research(request).await.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(envelope.metadata.questions, vec!["Mietpreisbremse".to_string()]);
	assert_eq!(envelope.metadata.degraded_stages, vec!["plan".to_string()]);
	assert!(envelope.dossier.is_some());
	assert!(!envelope.sources.is_empty());
}

#[tokio::test]
async fn unusable_plan_payloads_also_fall_back() {
	let completion = StubCompletion::new(json!({"research_questions": "keine Liste"}), "Befund [1].");
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.7))])),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(completion),
		Arc::new(StubVectorSearch::new(default_vector_hits())),
	));
	let mut request = research_request("Mietpreisbremse", "user-123");

	request.mode = ResearchMode::Deep;

	let envelope = service.run_research(request).await.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(envelope.metadata.questions, vec!["Mietpreisbremse".to_string()]);
	assert!(envelope.metadata.degraded_stages.contains(&"plan".to_string()));
}

#[tokio::test]
async fn failed_web_search_keeps_vector_results() {
	let service = build_service(Providers::new(
		Arc::new(FailingWebSearch),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(StubVectorSearch::new(default_vector_hits())),
	));
	let envelope = service
		.run_research(research_request("Mietpreisbremse wirkt?", "user-123"))
		.await
		.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(envelope.metadata.counts.web, 0);
	assert_eq!(envelope.metadata.counts.vector, 2);
	assert!(envelope.sources.iter().all(|source| source.origin == Origin::Vector));
	assert_eq!(envelope.metadata.degraded_stages, vec!["web".to_string()]);
	assert!(envelope.summary.is_some());
}

#[tokio::test]
async fn one_question_failure_does_not_poison_siblings() {
	let plan = json!({"research_questions": [
		"Wie reagieren Vermieter?",
		"Was sagt die Opposition?",
		"Welche Ausnahmen gelten?",
	]});
	let web = FlakyWebSearch {
		succeed_on: "Mietpreisbremse".to_string(),
		hits: vec![web_hit("Bericht", "https://example.org/a", Some(0.7))],
		calls: Arc::new(AtomicUsize::new(0)),
	};
	let web_calls = web.calls.clone();
	let service = build_service(Providers::new(
		Arc::new(web),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(plan, "Befund [1].")),
		Arc::new(StubVectorSearch::empty()),
	));
	let mut request = research_request("Mietpreisbremse", "user-123");

	request.mode = ResearchMode::Deep;

	let envelope = service.run_research(request).await.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(web_calls.load(Ordering::SeqCst), 4);
	assert_eq!(envelope.metadata.counts.web, 1);
	assert_eq!(envelope.sources.len(), 1);
	assert_eq!(envelope.sources[0].title, "Bericht");
	assert!(envelope.metadata.degraded_stages.contains(&"web".to_string()));
}

#[tokio::test]
async fn failed_embedding_degrades_the_vector_stage() {
	let vector = StubVectorSearch::new(default_vector_hits());
	let queries = vector.queries.clone();
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.7))])),
		Arc::new(FailingEmbedding),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(vector),
	));
	let envelope = service
		.run_research(research_request("Mietpreisbremse wirkt?", "user-123"))
		.await
		.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(envelope.metadata.counts.vector, 0);
	assert!(queries.lock().expect("Lock poisoned.").is_empty());
	assert_eq!(envelope.metadata.degraded_stages, vec!["vector".to_string()]);
	assert!(envelope.sources.iter().all(|source| source.origin == Origin::Web));
}

#[tokio::test]
async fn partial_vector_failure_keeps_other_collections() {
	let mut vector = StubVectorSearch::new(default_vector_hits());

	vector.fail_collections = vec!["user-documents".to_string()];

	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(Vec::new())),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(vector),
	));
	let envelope = service
		.run_research(research_request("Mietpreisbremse wirkt?", "user-123"))
		.await
		.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(envelope.sources.len(), 1);
	assert_eq!(envelope.sources[0].collection.as_deref(), Some("grundsatz-program"));
	assert!(envelope.metadata.degraded_stages.contains(&"vector".to_string()));
}

#[tokio::test]
async fn failed_synthesis_returns_sources_with_citations() {
	let mut completion = StubCompletion::new(json!({}), "Unbenutzt.");

	completion.fail_text = true;

	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.7))])),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(completion),
		Arc::new(StubVectorSearch::new(default_vector_hits())),
	));
	let envelope = service
		.run_research(research_request("Mietpreisbremse wirkt?", "user-123"))
		.await
		.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert!(envelope.summary.is_none());
	assert_eq!(envelope.citations.len(), 3);
	assert_eq!(envelope.metadata.counts.cited, 3);
	assert_eq!(envelope.metadata.degraded_stages, vec!["synthesis".to_string()]);
}

#[tokio::test]
async fn empty_run_with_failed_synthesis_is_an_error() {
	let mut completion = StubCompletion::new(json!({}), "Unbenutzt.");

	completion.fail_text = true;

	let service = build_service(Providers::new(
		Arc::new(FailingWebSearch),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(completion),
		Arc::new(StubVectorSearch::empty()),
	));
	let envelope = service
		.run_research(research_request("Mietpreisbremse wirkt?", "user-123"))
		.await
		.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Error);
	assert!(envelope.sources.is_empty());
	assert!(envelope.citations.is_empty());
	assert!(envelope.summary.is_none());
	assert!(envelope.metadata.degraded_stages.contains(&"web".to_string()));
	assert!(envelope.metadata.degraded_stages.contains(&"synthesis".to_string()));
}

#[tokio::test]
async fn zero_evidence_with_an_answer_still_succeeds() {
	let completion = StubCompletion::new(json!({}), "Dazu wurden keine Belege gefunden.");
	let text_calls = completion.text_calls.clone();
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(Vec::new())),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(completion),
		Arc::new(StubVectorSearch::empty()),
	));
	let envelope = service
		.run_research(research_request("Mietpreisbremse wirkt?", "user-123"))
		.await
		.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(text_calls.load(Ordering::SeqCst), 1);
	assert!(envelope.sources.is_empty());
	assert!(envelope.citations.is_empty());
	assert_eq!(envelope.summary.as_deref(), Some("Dazu wurden keine Belege gefunden."));
	assert!(envelope.metadata.degraded_stages.is_empty());
}

#[tokio::test]
async fn unknown_collection_references_are_dropped() {
	let vector = StubVectorSearch::new(default_vector_hits());
	let queries = vector.queries.clone();
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.7))])),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(vector),
	));
	let mut request = research_request("Mietpreisbremse wirkt?", "user-123");

	request.collections = vec!["user-documents".to_string(), "nope".to_string()];

	let envelope = service.run_research(request).await.expect("run_research failed.");
	let queried: Vec<_> = queries
		.lock()
		.expect("Lock poisoned.")
		.iter()
		.map(|query| query.collection.clone())
		.collect();

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(queried, vec!["user-documents".to_string()]);
	assert!(envelope.metadata.degraded_stages.contains(&"vector".to_string()));
}
