use std::{sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod service;
pub mod shutdown;

use tome_jobs::{EmbeddingJobProcessor, Scheduler};
use tome_storage::{db::Db, jobs::PgJobRepository};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = tome_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.providers.embedding.dimensions).await?;

	let repo = Arc::new(PgJobRepository::new(
		db.clone(),
		config.worker.batch_size,
		time::Duration::seconds(config.worker.claim_lease_seconds),
	));
	let embedder = Arc::new(service::PersistedEmbedder::new(db, config.providers.embedding));
	let processor =
		Arc::new(EmbeddingJobProcessor::new(repo, embedder, config.worker.max_attempts));
	let scheduler =
		Scheduler::new(processor, Duration::from_millis(config.worker.poll_interval_ms));
	let ctx = shutdown::install_shutdown_handler();

	tracing::info!(
		poll_interval_ms = config.worker.poll_interval_ms,
		batch_size = config.worker.batch_size,
		max_attempts = config.worker.max_attempts,
		"Starting embedding worker."
	);

	scheduler.start(ctx).await;

	tracing::info!("Embedding worker stopped.");

	Ok(())
}
