use std::collections::{HashMap, HashSet};

use crate::{
	Error, Result,
	types::{Config, FieldKind, FieldSpec, IndexPreset, OptimizerPreset},
};

/// Owner sentinel recorded on shared system-collection rows and substituted
/// for the caller's tenant id when querying them.
pub const SYSTEM_OWNER: &str = "SYSTEM";

/// Immutable view over every collection the engine may query. Built once at
/// startup from the validated config and shared by reference afterwards.
#[derive(Debug)]
pub struct Registry {
	profiles: Vec<Profile>,
	profile_index: HashMap<String, usize>,
	systems: Vec<SystemProfile>,
	system_index: HashMap<String, usize>,
	default_targets: Vec<String>,
}
impl Registry {
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let mut optimizers = builtin_optimizers();
		let mut indexes = builtin_indexes();

		optimizers.extend(cfg.presets.optimizer.iter().map(|(name, p)| (name.clone(), p.clone())));
		indexes.extend(cfg.presets.index.iter().map(|(name, p)| (name.clone(), p.clone())));

		let mut profiles = Vec::with_capacity(cfg.collections.len());
		let mut profile_index = HashMap::with_capacity(cfg.collections.len());

		for collection in &cfg.collections {
			let optimizer = optimizers.get(&collection.optimizer).cloned().ok_or_else(|| {
				Error::Validation {
					message: format!(
						"Collection {} references unknown optimizer preset {}.",
						collection.name, collection.optimizer
					),
				}
			})?;
			let index = indexes.get(&collection.index).cloned().ok_or_else(|| {
				Error::Validation {
					message: format!(
						"Collection {} references unknown index preset {}.",
						collection.name, collection.index
					),
				}
			})?;
			let mut seen = HashSet::with_capacity(collection.fields.len());

			for field in &collection.fields {
				if !seen.insert(field.name.as_str()) {
					return Err(Error::Validation {
						message: format!(
							"Collection {} declares field {} more than once.",
							collection.name, field.name
						),
					});
				}
			}

			if let Some(tenant_field) = &collection.tenant_field {
				match collection.fields.iter().find(|field| &field.name == tenant_field) {
					Some(field) if field.kind == FieldKind::TenantKeyword => {},
					Some(_) => {
						return Err(Error::Validation {
							message: format!(
								"Collection {} tenant_field {} must be declared as tenant-keyword.",
								collection.name, tenant_field
							),
						});
					},
					None => {
						return Err(Error::Validation {
							message: format!(
								"Collection {} tenant_field {} is not a declared field.",
								collection.name, tenant_field
							),
						});
					},
				}
			}
			if profile_index.insert(collection.name.clone(), profiles.len()).is_some() {
				return Err(Error::Validation {
					message: format!(
						"Collection name {} is declared more than once.",
						collection.name
					),
				});
			}

			profiles.push(Profile {
				name: collection.name.clone(),
				label: collection.label.clone(),
				optimizer,
				index,
				fields: collection.fields.clone(),
				tenant_field: collection.tenant_field.clone(),
			});
		}

		let mut systems = Vec::with_capacity(cfg.system_collections.len());
		let mut system_index = HashMap::with_capacity(cfg.system_collections.len());

		for system in &cfg.system_collections {
			if !profile_index.contains_key(&system.collection) {
				return Err(Error::Validation {
					message: format!(
						"System collection {} references unknown collection {}.",
						system.id, system.collection
					),
				});
			}
			if profile_index.contains_key(&system.id) {
				return Err(Error::Validation {
					message: format!(
						"System collection id {} collides with a collection name.",
						system.id
					),
				});
			}
			if system_index.insert(system.id.clone(), systems.len()).is_some() {
				return Err(Error::Validation {
					message: format!(
						"System collection id {} is declared more than once.",
						system.id
					),
				});
			}

			systems.push(SystemProfile {
				id: system.id.clone(),
				collection: system.collection.clone(),
				label: system.label.clone(),
				description: system.description.clone(),
				min_score: system.min_score,
				recall_limit: system.recall_limit,
			});
		}

		for reference in &cfg.research.default_collections {
			if !system_index.contains_key(reference) && !profile_index.contains_key(reference) {
				return Err(Error::Validation {
					message: format!(
						"research.default_collections entry {reference} does not resolve to a collection or system collection."
					),
				});
			}
		}

		Ok(Self {
			profiles,
			profile_index,
			systems,
			system_index,
			default_targets: cfg.research.default_collections.clone(),
		})
	}

	pub fn profile(&self, name: &str) -> Option<&Profile> {
		self.profile_index.get(name).map(|&idx| &self.profiles[idx])
	}

	pub fn system(&self, id: &str) -> Option<&SystemProfile> {
		self.system_index.get(id).map(|&idx| &self.systems[idx])
	}

	pub fn profiles(&self) -> &[Profile] {
		&self.profiles
	}

	pub fn systems(&self) -> &[SystemProfile] {
		&self.systems
	}

	/// Resolves a request-supplied collection reference. System ids take
	/// precedence over plain collection names; construction guarantees the two
	/// namespaces are disjoint.
	pub fn target(&self, reference: &str) -> Option<Target<'_>> {
		if let Some(system) = self.system(reference) {
			let profile = self.profile(&system.collection)?;

			return Some(Target::System { system, profile });
		}

		self.profile(reference).map(Target::Tenant)
	}

	/// Targets queried when a request names no collections.
	pub fn default_targets(&self) -> Vec<Target<'_>> {
		self.default_targets.iter().filter_map(|reference| self.target(reference)).collect()
	}
}

/// A collection profile with preset names resolved to concrete values.
#[derive(Debug, Clone)]
pub struct Profile {
	pub name: String,
	pub label: Option<String>,
	pub optimizer: OptimizerPreset,
	pub index: IndexPreset,
	pub fields: Vec<FieldSpec>,
	pub tenant_field: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SystemProfile {
	pub id: String,
	pub collection: String,
	pub label: String,
	pub description: String,
	pub min_score: f32,
	pub recall_limit: u32,
}

/// One resolvable query target: a tenant-scoped profile, or a system
/// collection together with its underlying profile.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
	Tenant(&'a Profile),
	System { system: &'a SystemProfile, profile: &'a Profile },
}
impl Target<'_> {
	pub fn collection(&self) -> &str {
		match self {
			Self::Tenant(profile) => &profile.name,
			Self::System { profile, .. } => &profile.name,
		}
	}

	pub fn profile(&self) -> &Profile {
		match self {
			Self::Tenant(profile) => profile,
			Self::System { profile, .. } => profile,
		}
	}

	pub fn is_system(&self) -> bool {
		matches!(self, Self::System { .. })
	}

	/// Owner applied to tenant filtering; system collections substitute the
	/// sentinel regardless of the caller.
	pub fn owner<'t>(&self, tenant_id: &'t str) -> &'t str {
		match self {
			Self::Tenant(_) => tenant_id,
			Self::System { .. } => SYSTEM_OWNER,
		}
	}

	pub fn label(&self) -> &str {
		match self {
			Self::Tenant(profile) => profile.label.as_deref().unwrap_or(&profile.name),
			Self::System { system, .. } => &system.label,
		}
	}

	pub fn min_score(&self, default: f32) -> f32 {
		match self {
			Self::Tenant(_) => default,
			Self::System { system, .. } => system.min_score,
		}
	}

	pub fn recall_limit(&self, default: u32) -> u32 {
		match self {
			Self::Tenant(_) => default,
			Self::System { system, .. } => system.recall_limit,
		}
	}
}

fn builtin_optimizers() -> HashMap<String, OptimizerPreset> {
	HashMap::from([
		("small".to_string(), OptimizerPreset {
			default_segment_number: 2,
			indexing_threshold: 10_000,
			memmap_threshold: 50_000,
			flush_interval_sec: 5,
		}),
		("large".to_string(), OptimizerPreset {
			default_segment_number: 4,
			indexing_threshold: 50_000,
			memmap_threshold: 200_000,
			flush_interval_sec: 10,
		}),
	])
}

fn builtin_indexes() -> HashMap<String, IndexPreset> {
	HashMap::from([
		("dense-hnsw".to_string(), IndexPreset {
			m: 16,
			ef_construct: 128,
			full_scan_threshold: 10_000,
			on_disk: false,
		}),
		("on-disk-hnsw".to_string(), IndexPreset {
			m: 32,
			ef_construct: 256,
			full_scan_threshold: 20_000,
			on_disk: true,
		}),
	])
}
