use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle state of an embedding job.
///
/// `Pending` rows are eligible for a claim. `Processing` marks a live claim
/// by one worker instance. `Completed` and `Failed` are terminal; the row is
/// kept for audit and never deleted by this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
	Pending,
	Processing,
	Completed,
	Failed,
}
impl JobStatus {
	/// Stable text form used in storage.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Processing => "PROCESSING",
			Self::Completed => "COMPLETED",
			Self::Failed => "FAILED",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"PENDING" => Some(Self::Pending),
			"PROCESSING" => Some(Self::Processing),
			"COMPLETED" => Some(Self::Completed),
			"FAILED" => Some(Self::Failed),
			_ => None,
		}
	}
}

/// What the job embeds. Exactly one target per job, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTarget {
	Knowledge(Uuid),
	Asset(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingJob {
	pub job_id: Uuid,
	pub target: JobTarget,
	pub status: JobStatus,
	/// Failed attempts so far. Never decremented.
	pub retries: i32,
	pub last_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
