use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::{DossierService, research::ResearchMode};

#[derive(Debug, Deserialize)]
struct PlanOutput {
	#[serde(default)]
	research_questions: Vec<String>,
}

/// Builds the research question list for one run.
///
/// Normal mode never calls the model. Deep mode asks the completion provider
/// for sub-questions and falls back to the original query when the call fails
/// or its payload is unusable; the second value reports that fallback.
pub(crate) async fn plan_questions(
	service: &DossierService,
	query: &str,
	mode: ResearchMode,
	language: &str,
) -> (Vec<String>, bool) {
	if mode == ResearchMode::Normal {
		return (vec![query.to_string()], false);
	}

	let cap = service.cfg.research.max_questions.max(1) as usize;
	let messages = build_plan_messages(query, language, cap);
	let raw = match service
		.providers
		.completion
		.complete_json(&service.cfg.providers.completion, &messages)
		.await
	{
		Ok(value) => value,
		Err(err) => {
			warn!(error = %err, "Question planning failed; falling back to the original query.");

			return (vec![query.to_string()], true);
		},
	};
	let output = match serde_json::from_value::<PlanOutput>(raw) {
		Ok(output) => output,
		Err(err) => {
			warn!(
				error = %err,
				"Question plan did not match the expected shape; falling back to the original query."
			);

			return (vec![query.to_string()], true);
		},
	};
	let questions = normalize_questions(query, output.research_questions, cap);

	if questions.len() == 1 {
		warn!("Question plan contained no usable questions beyond the original query.");

		return (questions, true);
	}

	(questions, false)
}

fn build_plan_messages(query: &str, language: &str, cap: usize) -> Vec<Value> {
	let schema = json!({
		"type": "object",
		"properties": {
			"research_questions": {
				"type": "array",
				"items": {"type": "string"},
			},
		},
		"required": ["research_questions"],
	});
	let schema_text = serde_json::to_string_pretty(&schema)
		.unwrap_or_else(|_| r#"{"research_questions": []}"#.to_string());
	let system_prompt = format!(
		"You are a research planner for a political communication team. Break the topic \
		 into focused research questions that can each be answered by a single web or \
		 document search. Respond with JSON only, matching this schema:\n{schema_text}"
	);
	let user_prompt = format!(
		"Topic: {query}\n\nWrite at most {cap} research questions covering the official \
		 position, the factual background and the current public debate around this topic. \
		 Keep every question in the language of the topic ({language})."
	);

	vec![
		json!({"role": "system", "content": system_prompt}),
		json!({"role": "user", "content": user_prompt}),
	]
}

fn normalize_questions(query: &str, raw: Vec<String>, cap: usize) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut questions = Vec::new();

	push_question(&mut questions, &mut seen, query);

	for question in raw {
		push_question(&mut questions, &mut seen, &question);
	}

	questions.truncate(cap);

	questions
}

fn push_question(questions: &mut Vec<String>, seen: &mut HashSet<String>, candidate: &str) {
	let trimmed = candidate.trim();

	if trimmed.is_empty() {
		return;
	}
	if !seen.insert(trimmed.to_lowercase()) {
		return;
	}

	questions.push(trimmed.to_string());
}
