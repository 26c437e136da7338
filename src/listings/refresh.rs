//! Periodic directory refresh on a background thread.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::client::{HttpClient, ListingsClient};
use super::directory::DirectoryHandle;

/// Background thread that re-runs [`ListingsClient::refresh`] every
/// `interval` until stopped or dropped.
///
/// Only the directory handle is written; device state is never touched,
/// so refreshes cannot race with commands.
pub struct Refresher {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Refresher {
    pub fn spawn<H>(client: Arc<ListingsClient<H>>, handle: DirectoryHandle, interval: Duration) -> io::Result<Self>
    where
        H: HttpClient + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new().name("listings-refresh".into()).spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = client.refresh(&handle) {
                            warn!(error = %e, "program guide refresh failed; keeping previous directory");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("listings refresher stopped");
        })?;

        Ok(Self { stop: Some(stop_tx), thread: Some(thread) })
    }

    /// Stop the thread and wait for an in-flight refresh to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
