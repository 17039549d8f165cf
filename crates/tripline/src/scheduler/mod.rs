//! Concurrent, dependency-ordered dispatch over a [`DependencyGraph`].
//!
//! The scheduler loop waits on a single-permit [`Notify`], claims every node
//! whose dependencies are gone, and spawns one task per claimed node. When a
//! task finishes, its node is removed from the graph and the loop is woken.
//! Dependencies only order the nodes; a failed dependency does not stop its
//! dependents from running.

pub mod graph;

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info_span, Instrument};

pub use graph::{DependencyGraph, GraphError, NodeId};

/// Mutable scheduling state, always accessed under one lock.
struct SchedulerState<T> {
    graph: DependencyGraph<T>,
    scheduled: HashSet<NodeId>,
}

struct Shared<T> {
    state: Mutex<SchedulerState<T>>,
    signal: Notify,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, SchedulerState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its node and wakes the scheduler when dropped, including when the
/// dispatch future panics.
struct CompletionGuard<T> {
    id: NodeId,
    shared: Arc<Shared<T>>,
}

impl<T> Drop for CompletionGuard<T> {
    fn drop(&mut self) {
        self.shared.lock().graph.remove(self.id);
        self.shared.signal.notify_one();
    }
}

pub struct DependencyScheduler<T> {
    shared: Arc<Shared<T>>,
}

impl<T> DependencyScheduler<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(graph: DependencyGraph<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    graph,
                    scheduled: HashSet::new(),
                }),
                signal: Notify::new(),
            }),
        }
    }

    /// Dispatches every node once, each only after its dependencies finished,
    /// and returns when all dispatched tasks are done.
    pub async fn run<F, Fut>(self, dispatch: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let dispatch = Arc::new(dispatch);
        let mut tasks = JoinSet::new();

        self.shared.signal.notify_one();
        loop {
            if self.shared.lock().graph.is_empty() {
                break;
            }
            self.shared.signal.notified().await;

            for (id, name, payload) in self.claim_ready() {
                debug!("Dispatching {}", name);
                let guard = CompletionGuard {
                    id,
                    shared: Arc::clone(&self.shared),
                };
                let dispatch = Arc::clone(&dispatch);
                tasks.spawn(
                    async move {
                        let _guard = guard;
                        dispatch(payload).await;
                    }
                    .instrument(info_span!("node", name = %name)),
                );
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Scheduled task failed: {}", e);
            }
        }
    }

    /// Marks and returns every ready, unscheduled node in one critical section.
    fn claim_ready(&self) -> Vec<(NodeId, String, T)> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;

        let ready: Vec<NodeId> = state
            .graph
            .ready()
            .filter(|id| !state.scheduled.contains(id))
            .collect();

        let mut claimed = Vec::with_capacity(ready.len());
        for id in ready {
            state.scheduled.insert(id);
            let name = state.graph.name(id).unwrap_or_default().to_string();
            if let Some(payload) = state.graph.payload(id) {
                claimed.push((id, name, payload.clone()));
            }
        }
        claimed
    }
}
