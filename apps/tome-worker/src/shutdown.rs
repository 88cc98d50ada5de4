use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

/// Installs a handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received; the scheduler drains its in-flight tick and exits.
pub fn install_shutdown_handler() -> CancellationToken {
	let token = CancellationToken::new();
	let handler_token = token.clone();

	tokio::spawn(async move {
		let mut sigterm = match signal(SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(err) => {
				tracing::error!(error = %err, "Failed to install SIGTERM handler.");

				return;
			},
		};
		let mut sigint = match signal(SignalKind::interrupt()) {
			Ok(stream) => stream,
			Err(err) => {
				tracing::error!(error = %err, "Failed to install SIGINT handler.");

				return;
			},
		};

		tokio::select! {
			_ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down."),
			_ = sigint.recv() => tracing::info!("Received SIGINT, shutting down."),
		}

		handler_token.cancel();
	});

	token
}
