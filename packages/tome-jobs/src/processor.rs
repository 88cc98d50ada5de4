use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
	EmbeddingJob, EmbeddingService, Error, JobProcessor, JobRepository, JobStatus, JobTarget,
	Result, sanitize_job_error,
};

/// Total attempts before a job is terminally failed: the first try plus two
/// retries.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Claims a bounded batch of pending embedding jobs per tick and drives each
/// one through the retry policy.
///
/// Jobs are processed independently: one job's failure, including a failed
/// status write, never prevents the rest of the batch from being attempted.
/// Only a failed batch fetch aborts the tick, since no jobs were claimed yet.
pub struct EmbeddingJobProcessor {
	repo: Arc<dyn JobRepository>,
	embedder: Arc<dyn EmbeddingService>,
	max_attempts: i32,
}
impl EmbeddingJobProcessor {
	pub fn new(
		repo: Arc<dyn JobRepository>,
		embedder: Arc<dyn EmbeddingService>,
		max_attempts: i32,
	) -> Self {
		Self { repo, embedder, max_attempts: max_attempts.max(1) }
	}

	async fn process_one(&self, job: &EmbeddingJob) -> Result<()> {
		let outcome = match job.target {
			JobTarget::Knowledge(knowledge_id) =>
				self.embedder.generate_for_knowledge(knowledge_id).await,
			JobTarget::Asset(asset_id) => self.embedder.generate_for_asset(asset_id).await,
		};

		match outcome {
			Ok(()) => self.repo.set_status(job.job_id, JobStatus::Completed, None).await,
			Err(err) => self.record_failure(job, &err).await,
		}
	}

	/// Applies the retry transition after a failed generation attempt.
	///
	/// The retry count is incremented first so the row reflects the attempt
	/// even if the subsequent status write fails.
	async fn record_failure(&self, job: &EmbeddingJob, cause: &Error) -> Result<()> {
		let attempts = job.retries.saturating_add(1);

		self.repo.increment_retry_count(job.job_id).await?;

		if attempts < self.max_attempts {
			let message = sanitize_job_error(&format!(
				"attempt {attempts}/{}: {cause}",
				self.max_attempts
			));

			self.repo.set_status(job.job_id, JobStatus::Pending, Some(&message)).await
		} else {
			let message = sanitize_job_error(&format!(
				"giving up after {attempts} attempts: {cause}",
			));

			tracing::warn!(job_id = %job.job_id, attempts, "Embedding job terminally failed.");

			self.repo.set_status(job.job_id, JobStatus::Failed, Some(&message)).await
		}
	}
}

#[async_trait]
impl JobProcessor for EmbeddingJobProcessor {
	async fn process_jobs(&self, ctx: &CancellationToken) -> Result<()> {
		let jobs = self.repo.fetch_claimed_pending().await?;

		if jobs.is_empty() {
			return Ok(());
		}

		tracing::debug!(count = jobs.len(), "Claimed embedding jobs.");

		let mut tick_error = None;

		for job in &jobs {
			// Cooperative: unprocessed claims stay PROCESSING and become
			// reclaimable once their lease expires.
			if ctx.is_cancelled() {
				break;
			}

			if let Err(err) = self.process_one(job).await {
				tracing::error!(error = %err, job_id = %job.job_id, "Embedding job state write failed.");

				tick_error.get_or_insert(err);
			}
		}

		match tick_error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}
