//! A spinner that animates on its own thread while a long action runs.
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a running spinner task.
///
/// The task waits on its cancellation channel for one tick interval at a
/// time, so it notices a stop within one interval and never ticks after it.
/// Stopping twice, or dropping without stopping, is fine.
pub struct BusyIndicator {
    cancel: Option<Sender<()>>,
    task: Option<JoinHandle<u64>>,
}

impl BusyIndicator {
    /// Start a spinner drawn to stderr.
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        Self::with_bar(bar, TICK_INTERVAL)
    }

    /// Start ticking `bar` every `interval`.
    pub fn with_bar(bar: ProgressBar, interval: Duration) -> Self {
        let (cancel, stopped) = mpsc::channel::<()>();
        let task = thread::spawn(move || {
            let mut ticks: u64 = 0;
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        bar.tick();
                        ticks += 1;
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            bar.finish_and_clear();
            ticks
        });
        Self {
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    /// Cancel the task and wait for it to exit. Returns the number of ticks
    /// it made.
    pub fn stop(&mut self) -> u64 {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.task
            .take()
            .and_then(|task| task.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for BusyIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_stop_is_prompt() {
        let mut busy = BusyIndicator::with_bar(ProgressBar::hidden(), Duration::from_secs(60));
        let started = Instant::now();
        assert_eq!(busy.stop(), 0);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_ticks_until_stopped() {
        let mut busy = BusyIndicator::with_bar(ProgressBar::hidden(), Duration::from_millis(5));
        thread::sleep(Duration::from_millis(100));
        let ticks = busy.stop();
        assert!(ticks > 0);
        // A late second stop is a no-op.
        assert_eq!(busy.stop(), 0);
    }

    #[test]
    fn test_drop_cancels() {
        let busy = BusyIndicator::with_bar(ProgressBar::hidden(), Duration::from_secs(60));
        let started = Instant::now();
        drop(busy);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
