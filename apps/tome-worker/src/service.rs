use async_trait::async_trait;
use uuid::Uuid;

use tome_jobs::{EmbeddingService, Error, Result};
use tome_storage::{db::Db, embeddings};

/// Generates an embedding for a target resource and persists it.
///
/// Idempotent under at-least-once redelivery: the vector write is an upsert
/// keyed by the target id, and a target deleted since the job was enqueued is
/// treated as done rather than retried into a terminal failure.
pub struct PersistedEmbedder {
	db: Db,
	cfg: tome_config::EmbeddingProviderConfig,
}
impl PersistedEmbedder {
	pub fn new(db: Db, cfg: tome_config::EmbeddingProviderConfig) -> Self {
		Self { db, cfg }
	}

	async fn embed_one(&self, text: String) -> Result<Vec<f32>> {
		let vectors = tome_providers::embedding::embed(&self.cfg, &[text])
			.await
			.map_err(|err| Error::Embedding { message: err.to_string() })?;

		vectors
			.into_iter()
			.next()
			.ok_or_else(|| Error::Embedding { message: "provider returned no vector".to_string() })
	}
}

#[async_trait]
impl EmbeddingService for PersistedEmbedder {
	async fn generate_for_knowledge(&self, knowledge_id: Uuid) -> Result<()> {
		let item = embeddings::fetch_knowledge_item(&self.db, knowledge_id)
			.await
			.map_err(storage_error)?;
		let Some(item) = item else {
			tracing::info!(knowledge_id = %knowledge_id, "Knowledge item missing for job. Marking done.");

			return Ok(());
		};
		let text = if item.title.is_empty() {
			item.content
		} else {
			format!("{}\n\n{}", item.title, item.content)
		};
		let vector = self.embed_one(text).await?;

		embeddings::upsert_knowledge_embedding(&self.db, knowledge_id, &vector)
			.await
			.map_err(storage_error)
	}

	async fn generate_for_asset(&self, asset_id: Uuid) -> Result<()> {
		let asset = embeddings::fetch_asset(&self.db, asset_id).await.map_err(storage_error)?;
		let Some(asset) = asset else {
			tracing::info!(asset_id = %asset_id, "Asset missing for job. Marking done.");

			return Ok(());
		};
		// Assets without extracted text cannot be embedded yet; failing the
		// attempt keeps the job in the retry loop until extraction lands or
		// the ceiling is hit.
		let text = asset.extracted_text.filter(|text| !text.trim().is_empty()).ok_or_else(
			|| Error::Embedding { message: "asset has no extracted text".to_string() },
		)?;
		let vector = self.embed_one(text).await?;

		embeddings::upsert_asset_embedding(&self.db, asset_id, &vector)
			.await
			.map_err(storage_error)
	}
}

fn storage_error(err: tome_storage::Error) -> Error {
	Error::Embedding { message: err.to_string() }
}
