pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Repository error: {message}")]
	Repository { message: String },
	#[error("Embedding generation failed: {message}")]
	Embedding { message: String },
}
