use serde_json::{Value, json};
use tracing::warn;

use dossier_config::SYSTEM_OWNER;
use dossier_domain::{CitationTracker, EvidenceSource, unknown_markers};

use crate::{DossierService, research::ResearchMode};

/// At most this many top-ranked sources are numbered and offered to the
/// model.
pub(crate) const MAX_CITED_SOURCES: usize = 20;

pub(crate) struct SynthesisOutcome {
	pub text: Option<String>,
	pub degraded: bool,
}

/// Writes the summary or dossier over the ranked evidence. Citation indices
/// are allocated into the tracker before the model call, so a failed call
/// still leaves the envelope with resolvable citations.
pub(crate) async fn synthesize(
	service: &DossierService,
	query: &str,
	language: &str,
	mode: ResearchMode,
	sources: &[EvidenceSource],
	tracker: &mut CitationTracker,
) -> SynthesisOutcome {
	let evidence = evidence_block(sources, tracker);
	let messages = match mode {
		ResearchMode::Normal => build_summary_messages(query, language, &evidence),
		ResearchMode::Deep => build_dossier_messages(query, language, &evidence),
	};
	let text = match service
		.providers
		.completion
		.complete_text(&service.cfg.providers.completion, &messages)
		.await
	{
		Ok(text) => text,
		Err(err) => {
			warn!(error = %err, "Synthesis failed; returning gathered evidence without a write-up.");

			return SynthesisOutcome { text: None, degraded: true };
		},
	};
	let unknown = unknown_markers(&text, tracker.len());

	if !unknown.is_empty() {
		warn!(markers = ?unknown, "Synthesis cited markers that resolve to no gathered source.");
	}

	SynthesisOutcome { text: Some(text), degraded: false }
}

/// Numbers the top sources through the tracker and renders one evidence line
/// per source. System-owned sources are tagged as official so the model can
/// separate positions from reporting.
fn evidence_block(sources: &[EvidenceSource], tracker: &mut CitationTracker) -> String {
	if sources.is_empty() {
		return "No evidence was gathered for this question.".to_string();
	}

	let mut lines = Vec::with_capacity(sources.len().min(MAX_CITED_SOURCES));

	for source in sources.iter().take(MAX_CITED_SOURCES) {
		let index = tracker.cite(source);
		let tag = if source.tenant.as_deref() == Some(SYSTEM_OWNER) { " (official)" } else { "" };

		lines.push(format!("[{index}] {}{tag}: {}", source.title, source.snippet));
	}

	lines.join("\n")
}

fn build_summary_messages(query: &str, language: &str, evidence: &str) -> Vec<Value> {
	let system_prompt = format!(
		"You are a research assistant for a political communication team. Answer using \
		 only the numbered evidence below. Cite evidence with bracketed markers such as \
		 [1] right after the claim they support. When the evidence does not cover a \
		 point, say so instead of filling the gap. Answer in the language {language}."
	);
	let user_prompt = format!(
		"Question: {query}\n\nEvidence:\n{evidence}\n\nWrite a summary of at most 200 \
		 words that answers the question."
	);

	vec![
		json!({"role": "system", "content": system_prompt}),
		json!({"role": "user", "content": user_prompt}),
	]
}

fn build_dossier_messages(query: &str, language: &str, evidence: &str) -> Vec<Value> {
	let system_prompt = format!(
		"You are a research assistant for a political communication team. Write using \
		 only the numbered evidence below and cite it with bracketed markers such as \
		 [1]. Sources tagged (official) carry the organization's own position; prefer \
		 them for the Official Position section. Write in the language {language}."
	);
	let user_prompt = format!(
		"Topic: {query}\n\nEvidence:\n{evidence}\n\nWrite a Markdown dossier with \
		 exactly these sections:\n## Executive Summary\n## Official Position\n## Factual Analysis"
	);

	vec![
		json!({"role": "system", "content": system_prompt}),
		json!({"role": "user", "content": user_prompt}),
	]
}
