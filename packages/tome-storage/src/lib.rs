pub mod db;
pub mod embeddings;
pub mod jobs;
pub mod list;
pub mod models;
pub mod schema;

mod error;

pub use error::{Error, Result};
