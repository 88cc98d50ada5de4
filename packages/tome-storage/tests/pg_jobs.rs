//! Postgres-backed repository tests. Each test bootstraps its own throwaway
//! database, so they are `#[ignore]`d unless `TOME_PG_DSN` points at a server
//! with the pgvector extension available.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{ConnectOptions, Connection, Executor, postgres::PgConnectOptions};
use time::Duration;
use uuid::Uuid;

use tome_jobs::{
	DEFAULT_MAX_ATTEMPTS, EmbeddingJobProcessor, EmbeddingService, JobProcessor, JobRepository,
	JobStatus, JobTarget,
};
use tome_storage::{
	db::Db,
	jobs::{PgJobRepository, enqueue_job},
	list::{ListJobsRequest, list_jobs},
};

fn env_dsn() -> Option<String> {
	std::env::var("TOME_PG_DSN").ok().filter(|dsn| !dsn.trim().is_empty())
}

async fn fresh_db(base_dsn: &str) -> Db {
	let base_options =
		PgConnectOptions::from_str(base_dsn).expect("Failed to parse TOME_PG_DSN.");
	let name = format!("tome_test_{}", Uuid::new_v4().simple());
	let mut admin = base_options
		.clone()
		.database("postgres")
		.connect()
		.await
		.expect("Failed to connect to admin database.");

	admin
		.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
		.await
		.expect("Failed to create test database.");
	admin.close().await.expect("Failed to close admin connection.");

	let dsn = base_options.database(&name).to_url_lossy().to_string();
	let db = Db::connect(&tome_config::Postgres { dsn, pool_max_conns: 4 })
		.await
		.expect("Failed to connect to test database.");

	db.ensure_schema(4).await.expect("Failed to ensure schema.");

	db
}

async fn insert_knowledge(db: &Db, tenant_id: &str) -> Uuid {
	let knowledge_id = Uuid::new_v4();

	sqlx::query(
		"INSERT INTO knowledge_items (knowledge_id, tenant_id, title, content) \
		 VALUES ($1, $2, 'title', 'content')",
	)
	.bind(knowledge_id)
	.bind(tenant_id)
	.execute(&db.pool)
	.await
	.expect("Failed to insert knowledge item.");

	knowledge_id
}

async fn job_row(db: &Db, job_id: Uuid) -> (String, i32, Option<String>) {
	sqlx::query_as(
		"SELECT status, retries, last_error FROM embedding_jobs WHERE job_id = $1",
	)
	.bind(job_id)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to fetch job row.")
}

struct StubEmbedder {
	fail: bool,
}

#[async_trait]
impl EmbeddingService for StubEmbedder {
	async fn generate_for_knowledge(&self, _knowledge_id: Uuid) -> tome_jobs::Result<()> {
		if self.fail {
			return Err(tome_jobs::Error::Embedding { message: "boom".to_string() });
		}

		Ok(())
	}

	async fn generate_for_asset(&self, _asset_id: Uuid) -> tome_jobs::Result<()> {
		if self.fail {
			return Err(tome_jobs::Error::Embedding { message: "boom".to_string() });
		}

		Ok(())
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn schema_bootstrap_creates_job_tables() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping schema_bootstrap_creates_job_tables; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;

	for table in ["knowledge_items", "assets", "embedding_jobs", "knowledge_embeddings"] {
		let count: i64 = sqlx::query_scalar(
			"SELECT count(*) FROM information_schema.tables WHERE table_name = $1",
		)
		.bind(table)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to query schema tables.");

		assert_eq!(count, 1, "missing table {table}");
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn claim_is_exclusive_until_lease_expires() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping claim_is_exclusive_until_lease_expires; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;
	let knowledge_id = insert_knowledge(&db, "acme").await;

	enqueue_job(&db, "acme", JobTarget::Knowledge(knowledge_id))
		.await
		.expect("Failed to enqueue job.");

	let repo = PgJobRepository::new(db.clone(), 16, Duration::seconds(30));
	let first = repo.fetch_claimed_pending().await.expect("First claim failed.");

	assert_eq!(first.len(), 1);
	assert_eq!(first[0].status, JobStatus::Processing);

	// Lease still live: a second claimer must come up empty.
	let second = repo.fetch_claimed_pending().await.expect("Second claim failed.");

	assert!(second.is_empty());
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn expired_lease_is_reclaimable() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping expired_lease_is_reclaimable; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;
	let knowledge_id = insert_knowledge(&db, "acme").await;

	enqueue_job(&db, "acme", JobTarget::Knowledge(knowledge_id))
		.await
		.expect("Failed to enqueue job.");

	// Zero lease simulates a worker that died right after claiming.
	let repo = PgJobRepository::new(db.clone(), 16, Duration::seconds(0));

	assert_eq!(repo.fetch_claimed_pending().await.expect("First claim failed.").len(), 1);
	assert_eq!(repo.fetch_claimed_pending().await.expect("Reclaim failed.").len(), 1);
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn malformed_row_is_failed_at_claim_time() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping malformed_row_is_failed_at_claim_time; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;
	let job_id = Uuid::new_v4();

	sqlx::query(
		"INSERT INTO embedding_jobs (job_id, tenant_id, status) VALUES ($1, 'acme', 'PENDING')",
	)
	.bind(job_id)
	.execute(&db.pool)
	.await
	.expect("Failed to insert malformed job.");

	let repo = PgJobRepository::new(db.clone(), 16, Duration::seconds(30));
	let claimed = repo.fetch_claimed_pending().await.expect("Claim failed.");

	assert!(claimed.is_empty());

	let (status, _, last_error) = job_row(&db, job_id).await;

	assert_eq!(status, "FAILED");
	assert!(last_error.expect("Malformed job must carry a diagnostic.").contains("target"));
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn processor_retries_then_terminally_fails_against_postgres() {
	let Some(dsn) = env_dsn() else {
		eprintln!(
			"Skipping processor_retries_then_terminally_fails_against_postgres; set TOME_PG_DSN to run."
		);

		return;
	};
	let db = fresh_db(&dsn).await;
	let knowledge_id = insert_knowledge(&db, "acme").await;
	let job_id = enqueue_job(&db, "acme", JobTarget::Knowledge(knowledge_id))
		.await
		.expect("Failed to enqueue job.");
	let repo = std::sync::Arc::new(PgJobRepository::new(db.clone(), 16, Duration::seconds(0)));
	let processor = EmbeddingJobProcessor::new(
		repo,
		std::sync::Arc::new(StubEmbedder { fail: true }),
		DEFAULT_MAX_ATTEMPTS,
	);
	let ctx = tokio_util::sync::CancellationToken::new();

	for _ in 0..3 {
		processor.process_jobs(&ctx).await.expect("Tick failed.");
	}

	let (status, retries, last_error) = job_row(&db, job_id).await;

	assert_eq!(status, "FAILED");
	assert_eq!(retries, 3);
	assert!(last_error.expect("Failed job must carry a diagnostic.").contains("boom"));
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn processor_completes_job_against_postgres() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping processor_completes_job_against_postgres; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;
	let knowledge_id = insert_knowledge(&db, "acme").await;
	let job_id = enqueue_job(&db, "acme", JobTarget::Knowledge(knowledge_id))
		.await
		.expect("Failed to enqueue job.");
	let repo = std::sync::Arc::new(PgJobRepository::new(db.clone(), 16, Duration::seconds(30)));
	let processor = EmbeddingJobProcessor::new(
		repo,
		std::sync::Arc::new(StubEmbedder { fail: false }),
		DEFAULT_MAX_ATTEMPTS,
	);

	processor
		.process_jobs(&tokio_util::sync::CancellationToken::new())
		.await
		.expect("Tick failed.");

	let (status, retries, last_error) = job_row(&db, job_id).await;

	assert_eq!(status, "COMPLETED");
	assert_eq!(retries, 0);
	assert_eq!(last_error, None);
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn paged_listing_covers_all_jobs_without_duplicates() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping paged_listing_covers_all_jobs_without_duplicates; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;
	let mut expected = Vec::new();

	for _ in 0..25 {
		let knowledge_id = insert_knowledge(&db, "acme").await;
		let job_id = enqueue_job(&db, "acme", JobTarget::Knowledge(knowledge_id))
			.await
			.expect("Failed to enqueue job.");

		expected.push(job_id);
	}

	// A different tenant's jobs must never appear in the pages.
	let other = insert_knowledge(&db, "globex").await;

	enqueue_job(&db, "globex", JobTarget::Knowledge(other))
		.await
		.expect("Failed to enqueue job.");

	let mut seen = Vec::new();
	let mut cursor = None;

	loop {
		let page = list_jobs(
			&db,
			&ListJobsRequest {
				tenant_id: "acme".to_string(),
				status: None,
				limit: 10,
				cursor: cursor.clone(),
			},
		)
		.await
		.expect("Listing failed.");

		seen.extend(page.jobs.iter().map(|row| row.job_id));

		if page.next_cursor.is_empty() {
			break;
		}

		cursor = Some(page.next_cursor);
	}

	seen.sort();
	expected.sort();

	assert_eq!(seen, expected);
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TOME_PG_DSN to run."]
async fn listing_rejects_garbage_cursor() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping listing_rejects_garbage_cursor; set TOME_PG_DSN to run.");

		return;
	};
	let db = fresh_db(&dsn).await;
	let result = list_jobs(
		&db,
		&ListJobsRequest {
			tenant_id: "acme".to_string(),
			status: None,
			limit: 10,
			cursor: Some("not-a-cursor!!".to_string()),
		},
	)
	.await;

	assert!(matches!(result, Err(tome_storage::Error::InvalidArgument(_))));
}
