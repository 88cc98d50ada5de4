pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The token was not produced by the encoder. Callers map this to a bad
	/// request, never to a server error.
	#[error("Invalid pagination cursor.")]
	InvalidCursor,
}
