use tome_jobs::JobStatus;

use crate::{Error, Result, db::Db, models::EmbeddingJobRow};

#[derive(Debug, Clone)]
pub struct ListJobsRequest {
	pub tenant_id: String,
	pub status: Option<JobStatus>,
	pub limit: u32,
	/// Token from a previous page's `next_cursor`, or `None` for the first
	/// page.
	pub cursor: Option<String>,
}

#[derive(Debug)]
pub struct JobPage {
	pub jobs: Vec<EmbeddingJobRow>,
	/// Empty when this was the last page.
	pub next_cursor: String,
}

/// Lists a tenant's embedding jobs in `(created_at, job_id)` order, resuming
/// strictly after the cursor boundary. Keyset pagination keeps pages stable
/// while the write path keeps inserting jobs.
pub async fn list_jobs(db: &Db, req: &ListJobsRequest) -> Result<JobPage> {
	if req.limit == 0 {
		return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
	}

	let boundary = match req.cursor.as_deref() {
		None | Some("") => None,
		Some(token) => tome_cursor::decode_cursor(token)
			.map_err(|_| Error::InvalidArgument("Invalid pagination cursor.".to_string()))?,
	};

	let mut builder = sqlx::QueryBuilder::new(
		"SELECT job_id, tenant_id, knowledge_id, asset_id, status, retries, last_error, \
		 available_at, created_at, updated_at \
		 FROM embedding_jobs WHERE tenant_id = ",
	);

	builder.push_bind(req.tenant_id.as_str());

	if let Some(status) = req.status {
		builder.push(" AND status = ");
		builder.push_bind(status.as_str());
	}
	if let Some(boundary) = &boundary {
		let job_id: uuid::Uuid = boundary
			.last_id
			.parse()
			.map_err(|_| Error::InvalidArgument("Invalid pagination cursor.".to_string()))?;

		builder.push(" AND (created_at, job_id) > (");
		builder.push_bind(boundary.timestamp);
		builder.push(", ");
		builder.push_bind(job_id);
		builder.push(")");
	}

	builder.push(" ORDER BY created_at ASC, job_id ASC LIMIT ");
	builder.push_bind(i64::from(req.limit));

	let jobs: Vec<EmbeddingJobRow> = builder.build_query_as().fetch_all(&db.pool).await?;
	let next_cursor = tome_cursor::next_cursor(
		&jobs,
		req.limit as usize,
		|row| row.job_id.to_string(),
		|row| row.created_at,
	);

	Ok(JobPage { jobs, next_cursor })
}
