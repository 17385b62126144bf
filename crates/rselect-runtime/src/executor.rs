#![forbid(unsafe_code)]

//! Background execution of fetch tickets.
//!
//! [`FetchExecutor`] runs each [`FetchTicket`] on its own named thread and
//! sends the [`FetchResponse`] back over a channel. The host drains the
//! channel with [`poll`](FetchExecutor::poll) (or blocks briefly with
//! [`recv_timeout`](FetchExecutor::recv_timeout)) and hands every response
//! to the controller, which drops superseded ones by token.
//!
//! A panic inside the fetcher is caught and reported as a network error so
//! the field never stays in `loading`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use rselect_core::error::FetchError;
use tracing::{debug, trace, warn};

use crate::fetch::{FetchResponse, FetchTicket, PageFetcher};

/// Runs fetch tickets off the caller's thread.
pub struct FetchExecutor<T> {
    fetcher: Arc<dyn PageFetcher<T>>,
    sender: mpsc::Sender<FetchResponse<T>>,
    receiver: mpsc::Receiver<FetchResponse<T>>,
    pending: Arc<AtomicUsize>,
}

impl<T> std::fmt::Debug for FetchExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("pending", &self.pending.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> FetchExecutor<T> {
    /// Executor over any fetcher.
    pub fn new<P>(fetcher: P) -> Self
    where
        P: PageFetcher<T> + 'static,
    {
        Self::from_arc(Arc::new(fetcher))
    }

    /// Executor over a shared fetcher.
    pub fn from_arc(fetcher: Arc<dyn PageFetcher<T>>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            fetcher,
            sender,
            receiver,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run a ticket on a background thread.
    ///
    /// A ticket already cancelled when the thread starts is dropped without
    /// calling the fetcher and without a response.
    pub fn spawn(&self, ticket: FetchTicket) {
        let token = ticket.token();
        let fetcher = Arc::clone(&self.fetcher);
        let sender = self.sender.clone();
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::AcqRel);

        // Keep a copy so a spawn failure can still be answered.
        let fallback = ticket.clone();
        let spawned = thread::Builder::new()
            .name(format!("rselect-fetch-{}", token.get()))
            .spawn(move || {
                if ticket.is_cancelled() {
                    trace!(
                        target: "rselect.executor",
                        token = token.get(),
                        "ticket cancelled before start"
                    );
                    pending.fetch_sub(1, Ordering::AcqRel);
                    return;
                }
                let response = run_guarded(ticket, fetcher.as_ref());
                pending.fetch_sub(1, Ordering::AcqRel);
                // The receiver is gone once the executor is dropped.
                let _ = sender.send(response);
            });

        match spawned {
            Ok(_) => {
                debug!(target: "rselect.executor", token = token.get(), "fetch spawned");
            }
            Err(err) => {
                warn!(
                    target: "rselect.executor",
                    token = token.get(),
                    error = %err,
                    "failed to spawn fetch thread"
                );
                self.pending.fetch_sub(1, Ordering::AcqRel);
                let response =
                    fallback.respond(Err(FetchError::network(format!("spawn failed: {err}"))));
                let _ = self.sender.send(response);
            }
        }
    }

    /// Run a ticket on the current thread, bypassing the channel.
    pub fn run_inline(&self, ticket: FetchTicket) -> FetchResponse<T> {
        run_guarded(ticket, self.fetcher.as_ref())
    }

    /// Drain every response that has arrived.
    pub fn poll(&self) -> Vec<FetchResponse<T>> {
        self.receiver.try_iter().collect()
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchResponse<T>> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Fetches started but not yet finished.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// The fetcher in use.
    pub fn fetcher(&self) -> &Arc<dyn PageFetcher<T>> {
        &self.fetcher
    }
}

fn run_guarded<T>(ticket: FetchTicket, fetcher: &dyn PageFetcher<T>) -> FetchResponse<T> {
    let query = ticket.query().clone();
    match panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch_page(&query))) {
        Ok(result) => ticket.respond(result),
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(
                target: "rselect.executor",
                token = ticket.token().get(),
                panic = %msg,
                "fetcher panicked"
            );
            ticket.respond(Err(FetchError::network(format!("fetcher panicked: {msg}"))))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
