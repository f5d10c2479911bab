//! Active run tracking.
//!
//! The registry is the single source of truth for which agent sessions have
//! a run in flight. `begin` replaces any prior entry for the session (a new
//! run supersedes an old one); that replacement is the only conflict rule at
//! this layer. A second inbound message for a busy session does not race the
//! active run: tasks are chained per session in FIFO order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::Future;
use tokio::sync::oneshot;

use crate::channels::ChannelName;

/// State of one in-flight agent run.
#[derive(Debug)]
pub struct RunState {
    pub session_id: String,
    pub channel: ChannelName,
    pub peer_id: String,
    streaming_suppressed: AtomicBool,
}

impl RunState {
    pub fn new(session_id: &str, channel: ChannelName, peer_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            channel,
            peer_id: peer_id.to_string(),
            streaming_suppressed: AtomicBool::new(false),
        }
    }

    /// Whether live-edit streaming has been opted out for this run.
    pub fn streaming_suppressed(&self) -> bool {
        self.streaming_suppressed.load(Ordering::SeqCst)
    }

    pub fn suppress_streaming(&self) {
        self.streaming_suppressed.store(true, Ordering::SeqCst);
    }
}

type QueueMap = Arc<Mutex<HashMap<String, QueueTail>>>;

#[derive(Clone)]
struct QueueTail {
    generation: u64,
    done: Shared<BoxFuture<'static, ()>>,
}

/// Maps `session_id → RunState` and serializes run execution per session.
#[derive(Default)]
pub struct SessionRunRegistry {
    active: RwLock<HashMap<String, Arc<RunState>>>,
    queues: QueueMap,
    generation: AtomicU64,
}

impl SessionRunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register the run state for a starting run, replacing any
    /// prior entry for the session.
    pub fn begin(&self, session_id: &str, channel: ChannelName, peer_id: &str) -> Arc<RunState> {
        let run = Arc::new(RunState::new(session_id, channel, peer_id));
        self.active
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), Arc::clone(&run));
        run
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<RunState>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
    }

    pub fn end(&self, session_id: &str) {
        self.active
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
    }

    pub fn active_count(&self) -> usize {
        self.active.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Append `task` to the session's FIFO queue. The task starts once every
    /// previously enqueued task for the same session has finished.
    pub fn enqueue<F>(&self, session_id: &str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let done: Shared<BoxFuture<'static, ()>> = async move {
            // Completes on send or on drop, so a panicking task still
            // unblocks its successors.
            let _ = done_rx.await;
        }
        .boxed()
        .shared();

        let previous = {
            let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
            let previous = queues.get(session_id).map(|tail| tail.done.clone());
            queues.insert(
                session_id.to_string(),
                QueueTail {
                    generation,
                    done: done.clone(),
                },
            );
            previous
        };

        let queues = Arc::clone(&self.queues);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Some(previous) = previous {
                previous.await;
            }
            task.await;
            let _ = done_tx.send(());

            let mut queues = queues.lock().unwrap_or_else(|e| e.into_inner());
            let current = queues
                .get(&session_id)
                .is_some_and(|tail| tail.generation == generation);
            if current {
                queues.remove(&session_id);
            }
        });
    }

    /// Wait for the currently enqueued tasks of a session to drain. Used by
    /// callers that need synchronous dispatch semantics.
    pub async fn wait_idle(&self, session_id: &str) {
        let tail = {
            let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
            queues.get(session_id).map(|tail| tail.done.clone())
        };
        if let Some(tail) = tail {
            tail.await;
        }
    }
}
