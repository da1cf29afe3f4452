use serde::Serialize;

use dossier_config::FieldKind;

use crate::DossierService;

#[derive(Clone, Debug, Serialize)]
pub struct CollectionCatalog {
	pub collections: Vec<CatalogCollection>,
	pub system_collections: Vec<CatalogSystem>,
	pub default_collections: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogCollection {
	pub name: String,
	pub label: String,
	pub tenant_scoped: bool,
	pub fields: Vec<CatalogField>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogField {
	pub name: String,
	pub kind: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogSystem {
	pub id: String,
	pub collection: String,
	pub label: String,
	pub description: String,
}

impl DossierService {
	/// Catalog of queryable collections and their filterable fields, for
	/// request building.
	pub fn catalog(&self) -> CollectionCatalog {
		let collections = self
			.registry
			.profiles()
			.iter()
			.map(|profile| CatalogCollection {
				name: profile.name.clone(),
				label: profile.label.clone().unwrap_or_else(|| profile.name.clone()),
				tenant_scoped: profile.tenant_field.is_some(),
				fields: profile
					.fields
					.iter()
					.map(|field| CatalogField {
						name: field.name.clone(),
						kind: field_kind_str(field.kind),
					})
					.collect(),
			})
			.collect();
		let system_collections = self
			.registry
			.systems()
			.iter()
			.map(|system| CatalogSystem {
				id: system.id.clone(),
				collection: system.collection.clone(),
				label: system.label.clone(),
				description: system.description.clone(),
			})
			.collect();

		CollectionCatalog {
			collections,
			system_collections,
			default_collections: self.cfg.research.default_collections.clone(),
		}
	}
}

fn field_kind_str(kind: FieldKind) -> &'static str {
	match kind {
		FieldKind::Keyword => "keyword",
		FieldKind::TenantKeyword => "tenant-keyword",
		FieldKind::Text => "text",
	}
}
