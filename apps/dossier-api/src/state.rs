use std::sync::Arc;

use dossier_config::Registry;
use dossier_service::DossierService;
use dossier_storage::{collection, store::VectorStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DossierService>,
}
impl AppState {
	pub async fn new(config: dossier_config::Config) -> color_eyre::Result<Self> {
		let store = Arc::new(VectorStore::new(&config.storage.qdrant)?);
		let registry = Arc::new(Registry::from_config(&config)?);

		let created = collection::ensure_collections(&store, &registry).await?;
		if !created.is_empty() {
			tracing::info!(collections = ?created, "Created missing vector collections.");
		}

		let service = DossierService::new(config, registry, store);

		Ok(Self { service: Arc::new(service) })
	}
}
