//! Optional background sweep.
//!
//! Rotation normally happens only when a group is read, so a group nobody
//! polls never advances. The sweeper refreshes every group on a fixed
//! interval from a background thread.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::registry::GroupRegistry;

/// Message sent to the sweep thread.
#[derive(Debug)]
enum SweepMessage {
    /// Request to stop sweeping.
    Shutdown,
}

/// Background thread that periodically refreshes all groups.
pub struct Sweeper {
    /// Channel to signal the sweep thread.
    sender: Sender<SweepMessage>,
    /// Handle to the sweep thread.
    thread_handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Starts sweeping `registry` every `interval`.
    pub fn spawn(registry: Arc<GroupRegistry>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (sender, receiver) = mpsc::channel::<SweepMessage>();

        let thread_handle = thread::spawn(move || {
            info!(interval_secs = interval.as_secs(), "Sweeper started");
            loop {
                match receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let rotated = registry.refresh_all(clock.now());
                        debug!(rotated, groups = registry.len(), "Sweep complete");
                    }
                    Ok(SweepMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("Sweeper stopped");
        });

        Self {
            sender,
            thread_handle: Some(thread_handle),
        }
    }

    /// Stops the sweep thread and waits for it to exit.
    pub fn shutdown(&mut self) {
        self.sender.send(SweepMessage::Shutdown).ok();
        if let Some(handle) = self.thread_handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
