use std::sync::Arc;

use serde_json::{Value, json};

use crate::acceptance::{
	StubCompletion, StubEmbedding, StubVectorSearch, StubWebSearch, build_service,
	default_vector_hits, filter_keyword_clauses, research_request,
};
use dossier_service::Providers;
use dossier_storage::filter::FilterRequest;

#[tokio::test]
async fn tenant_queries_carry_the_owner_clause() {
	let vector = StubVectorSearch::new(default_vector_hits());
	let queries = vector.queries.clone();
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(Vec::new())),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(vector),
	));
	let mut request = research_request("Mietpreisbremse wirkt?", "user-123");

	request.collections = vec!["user-documents".to_string()];

	service.run_research(request).await.expect("run_research failed.");

	let recorded = queries.lock().expect("Lock poisoned.").clone();

	assert_eq!(recorded.len(), 1);
	assert_eq!(recorded[0].collection, "user-documents");
	assert_eq!(
		filter_keyword_clauses(recorded[0].filter.as_ref()),
		vec![("owner_id".to_string(), "user-123".to_string())]
	);
	assert_eq!(recorded[0].limit, 10);
	assert_eq!(recorded[0].min_score, 0.2);
}

#[tokio::test]
async fn system_references_substitute_the_system_owner() {
	let vector = StubVectorSearch::new(default_vector_hits());
	let queries = vector.queries.clone();
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(Vec::new())),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(vector),
	));
	let mut request = research_request("Was steht im Programm zur Miete?", "user-123");

	request.collections = vec!["grundsatz".to_string()];

	let envelope = service.run_research(request).await.expect("run_research failed.");
	let recorded = queries.lock().expect("Lock poisoned.").clone();

	assert_eq!(recorded.len(), 1);
	assert_eq!(recorded[0].collection, "grundsatz-program");
	assert_eq!(
		filter_keyword_clauses(recorded[0].filter.as_ref()),
		vec![("owner_id".to_string(), "SYSTEM".to_string())]
	);
	assert_eq!(recorded[0].limit, 12);
	assert_eq!(recorded[0].min_score, 0.35);

	for source in &envelope.sources {
		assert_eq!(source.tenant.as_deref(), Some("SYSTEM"));
	}
}

#[tokio::test]
async fn request_filters_are_validated_against_declared_fields() {
	let vector = StubVectorSearch::new(default_vector_hits());
	let queries = vector.queries.clone();
	let service = build_service(Providers::new(
		Arc::new(StubWebSearch::new(Vec::new())),
		Arc::new(StubEmbedding::new(vec![0.1, 0.2, 0.3, 0.4])),
		Arc::new(StubCompletion::new(json!({}), "Befund [1].")),
		Arc::new(vector),
	));
	let Value::Object(map) = json!({
		"country": "DE",
		"platform": "instagram",
		"secret": "x",
	}) else {
		panic!("Expected an object.");
	};
	let mut request = research_request("Mietpreisbremse wirkt?", "user-123");

	request.collections = vec!["user-documents".to_string()];
	request.filters = Some(FilterRequest::Flat(map));

	service.run_research(request).await.expect("run_research failed.");

	let recorded = queries.lock().expect("Lock poisoned.").clone();
	let clauses = filter_keyword_clauses(recorded[0].filter.as_ref());

	assert_eq!(
		clauses,
		vec![
			("platform".to_string(), "instagram".to_string()),
			("country".to_string(), "DE".to_string()),
			("owner_id".to_string(), "user-123".to_string()),
		]
	);
}

#[tokio::test]
async fn default_collections_apply_when_none_are_requested() {
	let vector = StubVectorSearch::new(default_vector_hits());
	let queries = vector.queries.clone();
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
	let recorded = queries.lock().expect("Lock poisoned.").clone();

	assert_eq!(recorded.len(), 2);
	assert_eq!(recorded[0].collection, "user-documents");
	assert_eq!(recorded[1].collection, "grundsatz-program");
	assert_eq!(
		filter_keyword_clauses(recorded[0].filter.as_ref()),
		vec![("owner_id".to_string(), "user-123".to_string())]
	);
	assert_eq!(
		filter_keyword_clauses(recorded[1].filter.as_ref()),
		vec![("owner_id".to_string(), "SYSTEM".to_string())]
	);

	let tenants: Vec<_> =
		envelope.sources.iter().filter_map(|source| source.tenant.as_deref()).collect();

	assert!(tenants.contains(&"user-123"));
	assert!(tenants.contains(&"SYSTEM"));
}
