//! Asynchronous embedding job pipeline.
//!
//! Writes to knowledge items and assets enqueue a pending job row; a
//! [`Scheduler`] drives a [`JobProcessor`] on a fixed interval, and the
//! [`EmbeddingJobProcessor`] claims batches of pending jobs, dispatches
//! embedding generation, and applies the retry and terminal-failure policy.
//! Durable storage and the embedding call itself live behind the
//! [`JobRepository`] and [`EmbeddingService`] traits.

mod error;
mod model;
mod processor;
mod sanitize;
mod scheduler;
mod traits;

pub use error::{Error, Result};
pub use model::{EmbeddingJob, JobStatus, JobTarget};
pub use processor::{DEFAULT_MAX_ATTEMPTS, EmbeddingJobProcessor};
pub use sanitize::sanitize_job_error;
pub use scheduler::Scheduler;
pub use traits::{EmbeddingService, JobProcessor, JobRepository};
