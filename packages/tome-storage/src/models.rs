use time::OffsetDateTime;
use uuid::Uuid;

use tome_jobs::JobTarget;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KnowledgeItem {
	pub knowledge_id: Uuid,
	pub tenant_id: String,
	pub title: String,
	pub content: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Asset {
	pub asset_id: Uuid,
	pub tenant_id: String,
	pub file_name: String,
	pub extracted_text: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Raw `embedding_jobs` row. Unlike the domain type, the target reference is
/// two nullable columns; [`target`](Self::target) decides whether they form a
/// valid job.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmbeddingJobRow {
	pub job_id: Uuid,
	pub tenant_id: String,
	pub knowledge_id: Option<Uuid>,
	pub asset_id: Option<Uuid>,
	pub status: String,
	pub retries: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl EmbeddingJobRow {
	/// `None` when the row has no target or an ambiguous one.
	pub fn target(&self) -> Option<JobTarget> {
		match (self.knowledge_id, self.asset_id) {
			(Some(knowledge_id), None) => Some(JobTarget::Knowledge(knowledge_id)),
			(None, Some(asset_id)) => Some(JobTarget::Asset(asset_id)),
			_ => None,
		}
	}
}
