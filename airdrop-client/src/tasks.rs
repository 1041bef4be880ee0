//! Completion queue for spawned daemon calls.
//!
//! Components never await a daemon call inside the session loop. They spawn
//! it here and pick the result up later from [`Completions::next`]. Every
//! result is tagged with the generation it was spawned in; [`cancel_all`]
//! aborts outstanding work and bumps the generation, so a result that
//! slipped through before the abort is still discarded.
//!
//! [`cancel_all`]: Completions::cancel_all

use std::future::{pending, Future};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) struct Completions<I> {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, I)>,
    rx: mpsc::UnboundedReceiver<(u64, I)>,
    handles: Vec<JoinHandle<()>>,
}

impl<I: Send + 'static> Completions<I> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generation: 0,
            tx,
            rx,
            handles: Vec::new(),
        }
    }

    /// Run `work` in the background, queueing its output.
    pub(crate) fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = I> + Send + 'static,
    {
        let tx = self.tx.clone();
        let generation = self.generation;
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(async move {
            let output = work.await;
            // Receiver only goes away with the owner
            let _ = tx.send((generation, output));
        }));
    }

    /// Abort outstanding work and invalidate anything already queued.
    pub(crate) fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        self.generation += 1;
    }

    /// Number of spawned tasks not yet finished.
    pub(crate) fn in_flight(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Next output from the current generation. Cancel safe.
    pub(crate) async fn next(&mut self) -> I {
        while let Some((generation, output)) = self.rx.recv().await {
            if generation == self.generation {
                return output;
            }
            tracing::debug!(
                generation,
                current = self.generation,
                "Discarding stale completion"
            );
        }
        pending().await
    }
}
