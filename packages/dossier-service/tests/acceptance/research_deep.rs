use std::sync::{Arc, atomic::Ordering};

use serde_json::json;

use crate::acceptance::{
	StubCompletion, StubEmbedding, StubVectorSearch, StubWebSearch, build_service,
	default_vector_hits, research_request, web_hit,
};
use dossier_domain::Origin;
use dossier_service::{Providers, ResearchMode, ResearchStatus};

const DOSSIER_TEXT: &str = "## Executive Summary\nBefund [1].\n\n## Official Position\nPosition [2].\n\n## Factual Analysis\nAnalyse [3].";

#[tokio::test]
async fn deep_mode_fans_out_planned_questions() {
	let plan = json!({"research_questions": [
		"Welche Städte verlängern die Mietpreisbremse?",
		"Wie bewerten Ökonomen die Wirkung?",
		"Was plant die Bundesregierung?",
	]});
	let web = StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.6))]);
	let embedding = StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4]);
	let vector = StubVectorSearch::new(default_vector_hits());
	let completion = StubCompletion::new(plan, DOSSIER_TEXT);
	let web_calls = web.calls.clone();
	let web_questions = web.questions.clone();
	let embed_calls = embedding.calls.clone();
	let queries = vector.queries.clone();
	let json_calls = completion.json_calls.clone();
	let service = build_service(Providers::new(
		Arc::new(web),
		Arc::new(embedding),
		Arc::new(completion),
		Arc::new(vector),
	));
	let mut request = research_request("Mietpreisbremse", "user-123");

	request.mode = ResearchMode::Deep;

	let envelope = service.run_research(request).await.expect("run_research failed.");

	assert_eq!(envelope.status, ResearchStatus::Success);
	assert_eq!(envelope.metadata.mode, ResearchMode::Deep);
	assert_eq!(envelope.metadata.questions.len(), 4);
	assert_eq!(envelope.metadata.questions[0], "Mietpreisbremse");
	assert_eq!(envelope.metadata.counts.planned, 4);
	assert_eq!(json_calls.load(Ordering::SeqCst), 1);
	assert_eq!(web_calls.load(Ordering::SeqCst), 4);
	assert_eq!(embed_calls.load(Ordering::SeqCst), 4);
	assert_eq!(queries.lock().expect("Lock poisoned.").len(), 8);
	assert!(envelope.dossier.is_some());
	assert!(envelope.summary.is_none());
	assert!(envelope.metadata.degraded_stages.is_empty());

	let mut asked = web_questions.lock().expect("Lock poisoned.").clone();

	asked.sort();

	let mut expected = envelope.metadata.questions.clone();

	expected.sort();

	assert_eq!(asked, expected);
}

#[tokio::test]
async fn deep_runs_bucket_sources_by_collection_label() {
	let plan = json!({"research_questions": ["Wie reagieren Vermieter?"]});
	let web = StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.6))]);
	let service = build_service(Providers::new(
		Arc::new(web),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(plan, DOSSIER_TEXT)),
		Arc::new(StubVectorSearch::new(default_vector_hits())),
	));
	let mut request = research_request("Mietpreisbremse", "user-123");

	request.mode = ResearchMode::Deep;

	let envelope = service.run_research(request).await.expect("run_research failed.");
	let keys: Vec<_> = envelope.categories.keys().map(String::as_str).collect();

	assert_eq!(keys, ["Eigene Dokumente", "Grundsatzprogramm", "web"]);

	let web_ids = &envelope.categories["web"];

	for source in envelope.sources.iter().filter(|source| source.origin == Origin::Web) {
		assert!(web_ids.contains(&source.id));
	}

	let program_ids = &envelope.categories["Grundsatzprogramm"];

	for source in envelope
		.sources
		.iter()
		.filter(|source| source.collection.as_deref() == Some("grundsatz-program"))
	{
		assert!(program_ids.contains(&source.id));
	}
}

#[tokio::test]
async fn planning_respects_the_question_cap() {
	let questions: Vec<String> = (0..10).map(|i| format!("Frage {i}?")).collect();
	let plan = json!({ "research_questions": questions });
	let web = StubWebSearch::new(vec![web_hit("Bericht", "https://example.org/a", Some(0.6))]);
	let web_calls = web.calls.clone();
	let service = build_service(Providers::new(
		Arc::new(web),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(plan, DOSSIER_TEXT)),
		Arc::new(StubVectorSearch::empty()),
	));
	let mut request = research_request("Mietpreisbremse", "user-123");

	request.mode = ResearchMode::Deep;

	let envelope = service.run_research(request).await.expect("run_research failed.");

	assert_eq!(envelope.metadata.questions.len(), 4);
	assert_eq!(web_calls.load(Ordering::SeqCst), 4);
}
