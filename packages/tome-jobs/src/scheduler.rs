use std::{sync::Arc, time::Duration};

use tokio::{
	sync::watch,
	time::{self as tokio_time, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::JobProcessor;

/// Drives a [`JobProcessor`] on a fixed wall-clock interval.
///
/// Ticks are strictly sequential: the next tick never starts before the
/// previous `process_jobs` call has returned, and a missed tick is delayed
/// rather than burst. Processor errors are logged and never halt the loop;
/// retry policy belongs to the processor, not here.
pub struct Scheduler {
	processor: Arc<dyn JobProcessor>,
	interval: Duration,
	shutdown: CancellationToken,
	exited: watch::Sender<bool>,
}
impl Scheduler {
	pub fn new(processor: Arc<dyn JobProcessor>, interval: Duration) -> Self {
		let (exited, _) = watch::channel(false);

		Self { processor, interval, shutdown: CancellationToken::new(), exited }
	}

	/// Runs the tick loop until `ctx` is cancelled or [`stop`](Self::stop) is
	/// invoked. The first tick fires immediately.
	///
	/// Cancellation is observed at the top of every wait; a tick already in
	/// flight is drained, not preempted.
	pub async fn start(&self, ctx: CancellationToken) {
		let mut ticker = tokio_time::interval(self.interval);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = ctx.cancelled() => break,
				_ = self.shutdown.cancelled() => break,
				_ = ticker.tick() => {
					if let Err(err) = self.processor.process_jobs(&ctx).await {
						tracing::error!(error = %err, "Job processing tick failed.");
					}
				},
			}
		}

		self.exited.send_replace(true);
	}

	/// Requests shutdown and blocks until the in-flight tick (if any) has
	/// returned and the loop has exited.
	///
	/// Must be called at most once, and only while [`start`](Self::start) is
	/// running or after it has returned; calling it on a scheduler that was
	/// never started waits forever. Racing `start`'s exit through external
	/// cancellation is safe.
	pub async fn stop(&self) {
		self.shutdown.cancel();

		let mut exited = self.exited.subscribe();

		// The sender lives in self, so wait_for can only fail if the
		// scheduler itself is dropped mid-wait.
		let _ = exited.wait_for(|done| *done).await;
	}
}
