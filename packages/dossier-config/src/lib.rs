mod error;
mod registry;
mod types;

pub use error::{Error, Result};
pub use registry::{Profile, Registry, SYSTEM_OWNER, SystemProfile, Target};
pub use types::{
	CollectionProfile, CompletionProviderConfig, Config, EmbeddingProviderConfig, FieldKind,
	FieldSpec, IndexPreset, OptimizerPreset, Presets, Providers, Qdrant, Research, Service,
	Storage, SystemCollectionProfile, WebSearchProviderConfig,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in [
		("web_search", &cfg.providers.web_search.api_key),
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.research.max_questions == 0 {
		return Err(Error::Validation {
			message: "research.max_questions must be greater than zero.".to_string(),
		});
	}
	if cfg.research.max_concurrent_calls == 0 {
		return Err(Error::Validation {
			message: "research.max_concurrent_calls must be greater than zero.".to_string(),
		});
	}
	if cfg.research.web_max_results == 0 {
		return Err(Error::Validation {
			message: "research.web_max_results must be greater than zero.".to_string(),
		});
	}
	if cfg.research.vector_max_results == 0 {
		return Err(Error::Validation {
			message: "research.vector_max_results must be greater than zero.".to_string(),
		});
	}
	if !cfg.research.min_score.is_finite() || !(0.0..=1.0).contains(&cfg.research.min_score) {
		return Err(Error::Validation {
			message: "research.min_score must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.research.default_language.trim().is_empty() {
		return Err(Error::Validation {
			message: "research.default_language must be non-empty.".to_string(),
		});
	}
	if cfg.collections.is_empty() {
		return Err(Error::Validation { message: "collections must be non-empty.".to_string() });
	}

	for system in &cfg.system_collections {
		if !system.min_score.is_finite() || !(0.0..=1.0).contains(&system.min_score) {
			return Err(Error::Validation {
				message: format!(
					"System collection {} min_score must be in the range 0.0-1.0.",
					system.id
				),
			});
		}
		if system.recall_limit == 0 {
			return Err(Error::Validation {
				message: format!(
					"System collection {} recall_limit must be greater than zero.",
					system.id
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for collection in &mut cfg.collections {
		if collection.tenant_field.as_deref().map(|field| field.trim().is_empty()).unwrap_or(false)
		{
			collection.tenant_field = None;
		}
		if collection.label.as_deref().map(|label| label.trim().is_empty()).unwrap_or(false) {
			collection.label = None;
		}
	}
}
