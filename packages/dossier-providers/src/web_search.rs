use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct WebHit {
	pub title: String,
	pub url: String,
	pub snippet: String,
	/// Backend relevance score when the provider reports one.
	pub score: Option<f32>,
}

pub async fn search(
	cfg: &dossier_config::WebSearchProviderConfig,
	question: &str,
	max_results: u32,
	language: &str,
) -> Result<Vec<WebHit>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query": question,
		"max_results": max_results,
		"search_lang": language,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json)
}

fn parse_search_response(json: Value) -> Result<Vec<WebHit>> {
	let results = json
		.get("results")
		.or_else(|| json.get("web").and_then(|web| web.get("results")))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Search response is missing results array."))?;

	let mut hits = Vec::with_capacity(results.len());
	for item in results {
		// Hits without a URL cannot be cited; skip them.
		let Some(url) = item.get("url").and_then(|v| v.as_str()) else {
			continue;
		};
		let title = item.get("title").and_then(|v| v.as_str()).unwrap_or(url).to_string();
		let snippet = item
			.get("content")
			.or_else(|| item.get("description"))
			.or_else(|| item.get("snippet"))
			.and_then(|v| v.as_str())
			.unwrap_or_default()
			.to_string();
		let score = item.get("score").and_then(|v| v.as_f64()).map(|v| v as f32);
		hits.push(WebHit { title, url: url.to_string(), snippet, score });
	}

	Ok(hits)
}
