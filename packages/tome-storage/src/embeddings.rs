use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{Asset, KnowledgeItem},
};

pub async fn fetch_knowledge_item(db: &Db, knowledge_id: Uuid) -> Result<Option<KnowledgeItem>> {
	let item = sqlx::query_as(
		"SELECT knowledge_id, tenant_id, title, content, created_at, updated_at \
		 FROM knowledge_items WHERE knowledge_id = $1",
	)
	.bind(knowledge_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(item)
}

pub async fn fetch_asset(db: &Db, asset_id: Uuid) -> Result<Option<Asset>> {
	let asset = sqlx::query_as(
		"SELECT asset_id, tenant_id, file_name, extracted_text, created_at, updated_at \
		 FROM assets WHERE asset_id = $1",
	)
	.bind(asset_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(asset)
}

/// Upserts keep the write idempotent: a redelivered job overwrites the same
/// row instead of duplicating it.
pub async fn upsert_knowledge_embedding(db: &Db, knowledge_id: Uuid, vec: &[f32]) -> Result<()> {
	let vec_text = format_vector_text(vec);

	sqlx::query(
		"\
INSERT INTO knowledge_embeddings (knowledge_id, embedding_dim, vec)
VALUES ($1, $2, $3::text::vector)
ON CONFLICT (knowledge_id) DO UPDATE
SET
	embedding_dim = EXCLUDED.embedding_dim,
	vec = EXCLUDED.vec,
	created_at = now()",
	)
	.bind(knowledge_id)
	.bind(vec.len() as i32)
	.bind(vec_text.as_str())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn upsert_asset_embedding(db: &Db, asset_id: Uuid, vec: &[f32]) -> Result<()> {
	let vec_text = format_vector_text(vec);

	sqlx::query(
		"\
INSERT INTO asset_embeddings (asset_id, embedding_dim, vec)
VALUES ($1, $2, $3::text::vector)
ON CONFLICT (asset_id) DO UPDATE
SET
	embedding_dim = EXCLUDED.embedding_dim,
	vec = EXCLUDED.vec,
	created_at = now()",
	)
	.bind(asset_id)
	.bind(vec.len() as i32)
	.bind(vec_text.as_str())
	.execute(&db.pool)
	.await?;

	Ok(())
}

fn format_vector_text(vec: &[f32]) -> String {
	let mut out = String::from("[");

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}
		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}
