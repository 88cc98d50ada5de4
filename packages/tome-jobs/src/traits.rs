use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{EmbeddingJob, JobStatus, Result};

/// One unit of background work driven by the [`Scheduler`](crate::Scheduler).
///
/// A returned error marks the whole tick as failed; the scheduler logs it and
/// keeps ticking.
#[async_trait]
pub trait JobProcessor: Send + Sync {
	async fn process_jobs(&self, ctx: &CancellationToken) -> Result<()>;
}

/// Durable storage of embedding job rows.
#[async_trait]
pub trait JobRepository: Send + Sync {
	/// Fetches a batch of pending jobs and claims them in the same operation.
	///
	/// Precondition on implementations: the fetch must atomically mark the
	/// returned rows so that no concurrent caller, in this process or
	/// another, can also claim them (for Postgres, a
	/// `FOR UPDATE SKIP LOCKED` read that flips the rows to `PROCESSING`).
	/// A non-atomic implementation silently double-processes jobs once more
	/// than one worker instance runs.
	async fn fetch_claimed_pending(&self) -> Result<Vec<EmbeddingJob>>;

	/// Records a state transition. `last_error` replaces the stored message;
	/// `None` clears it.
	async fn set_status(
		&self,
		job_id: Uuid,
		status: JobStatus,
		last_error: Option<&str>,
	) -> Result<()>;

	async fn increment_retry_count(&self, job_id: Uuid) -> Result<()>;
}

/// Generates and persists the embedding for one target resource.
///
/// Claims are at-least-once: a crashed worker's jobs are redelivered after
/// the claim lease expires, so both calls must be idempotent at the target
/// resource level.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
	async fn generate_for_knowledge(&self, knowledge_id: Uuid) -> Result<()>;

	async fn generate_for_asset(&self, asset_id: Uuid) -> Result<()>;
}
