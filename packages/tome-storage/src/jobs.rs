use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use tome_jobs::{EmbeddingJob, JobRepository, JobStatus, JobTarget};

use crate::{Result, db::Db, models::EmbeddingJobRow};

/// Inserts a pending job for a knowledge item or asset write.
pub async fn enqueue_job(db: &Db, tenant_id: &str, target: JobTarget) -> Result<Uuid> {
	let job_id = Uuid::new_v4();
	let (knowledge_id, asset_id) = match target {
		JobTarget::Knowledge(id) => (Some(id), None),
		JobTarget::Asset(id) => (None, Some(id)),
	};

	sqlx::query(
		"INSERT INTO embedding_jobs (job_id, tenant_id, knowledge_id, asset_id, status) \
		 VALUES ($1, $2, $3, $4, 'PENDING')",
	)
	.bind(job_id)
	.bind(tenant_id)
	.bind(knowledge_id)
	.bind(asset_id)
	.execute(&db.pool)
	.await?;

	Ok(job_id)
}

/// Durable job store backed by Postgres.
///
/// The claim is a `FOR UPDATE SKIP LOCKED` read that flips the selected rows
/// to `PROCESSING` in the same transaction, so two worker instances can never
/// claim the same row. Claimed rows carry a lease (`available_at` pushed into
/// the future); if the worker dies before writing a transition, the rows
/// become claimable again once the lease expires.
pub struct PgJobRepository {
	db: Db,
	batch_size: i64,
	claim_lease: Duration,
}
impl PgJobRepository {
	pub fn new(db: Db, batch_size: u32, claim_lease: Duration) -> Self {
		Self { db, batch_size: i64::from(batch_size.max(1)), claim_lease }
	}

	async fn claim_batch(&self) -> Result<Vec<EmbeddingJob>> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		// PROCESSING rows only match once their lease has lapsed.
		let rows: Vec<EmbeddingJobRow> = sqlx::query_as(
			"\
SELECT job_id, tenant_id, knowledge_id, asset_id, status, retries, last_error, available_at, created_at, updated_at
FROM embedding_jobs
WHERE status IN ('PENDING', 'PROCESSING') AND available_at <= $1
ORDER BY available_at ASC, created_at ASC
LIMIT $2
FOR UPDATE SKIP LOCKED",
		)
		.bind(now)
		.bind(self.batch_size)
		.fetch_all(&mut *tx)
		.await?;

		let mut jobs = Vec::with_capacity(rows.len());
		let mut claimed_ids = Vec::with_capacity(rows.len());

		for row in rows {
			let Some(target) = row.target() else {
				// A job that references neither or both targets can never
				// make progress; fail it now instead of refetching forever.
				tracing::warn!(job_id = %row.job_id, "Failing embedding job without a valid target.");
				sqlx::query(
					"UPDATE embedding_jobs \
					 SET status = 'FAILED', last_error = $1, updated_at = $2 \
					 WHERE job_id = $3",
				)
				.bind("job references neither exactly one knowledge item nor one asset")
				.bind(now)
				.bind(row.job_id)
				.execute(&mut *tx)
				.await?;

				continue;
			};

			claimed_ids.push(row.job_id);
			jobs.push(EmbeddingJob {
				job_id: row.job_id,
				target,
				status: JobStatus::Processing,
				retries: row.retries,
				last_error: row.last_error,
				created_at: row.created_at,
				updated_at: now,
			});
		}

		if !claimed_ids.is_empty() {
			let lease_until = now + self.claim_lease;

			sqlx::query(
				"UPDATE embedding_jobs \
				 SET status = 'PROCESSING', available_at = $1, updated_at = $2 \
				 WHERE job_id = ANY($3)",
			)
			.bind(lease_until)
			.bind(now)
			.bind(&claimed_ids)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		Ok(jobs)
	}

	async fn write_status(
		&self,
		job_id: Uuid,
		status: JobStatus,
		last_error: Option<&str>,
	) -> Result<()> {
		let now = OffsetDateTime::now_utc();

		// available_at is reset so a PENDING retry is eligible on the very
		// next tick; there is no backoff between attempts.
		sqlx::query(
			"UPDATE embedding_jobs \
			 SET status = $1, last_error = $2, available_at = $3, updated_at = $3 \
			 WHERE job_id = $4",
		)
		.bind(status.as_str())
		.bind(last_error)
		.bind(now)
		.bind(job_id)
		.execute(&self.db.pool)
		.await?;

		Ok(())
	}

	async fn bump_retries(&self, job_id: Uuid) -> Result<()> {
		sqlx::query(
			"UPDATE embedding_jobs SET retries = retries + 1, updated_at = $1 WHERE job_id = $2",
		)
		.bind(OffsetDateTime::now_utc())
		.bind(job_id)
		.execute(&self.db.pool)
		.await?;

		Ok(())
	}
}

#[async_trait]
impl JobRepository for PgJobRepository {
	async fn fetch_claimed_pending(&self) -> tome_jobs::Result<Vec<EmbeddingJob>> {
		self.claim_batch().await.map_err(into_jobs_error)
	}

	async fn set_status(
		&self,
		job_id: Uuid,
		status: JobStatus,
		last_error: Option<&str>,
	) -> tome_jobs::Result<()> {
		self.write_status(job_id, status, last_error).await.map_err(into_jobs_error)
	}

	async fn increment_retry_count(&self, job_id: Uuid) -> tome_jobs::Result<()> {
		self.bump_retries(job_id).await.map_err(into_jobs_error)
	}
}

fn into_jobs_error(err: crate::Error) -> tome_jobs::Error {
	tome_jobs::Error::Repository { message: err.to_string() }
}
