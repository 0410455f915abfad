use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use crate::core::error::{Error, Result};
use crate::query::cache::ResultCache;
use crate::query::engine::QueryEngine;
use crate::query::types::{Query, QueryOutput};

pub type SharedCache = ResultCache<Arc<QueryOutput>>;

/// Jobs queued but not finished.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Bounded background pool that fills the result cache ahead of requests.
///
/// `submit` never blocks: a job that does not fit in the queue is dropped
/// and counted. Job failures only move the cache's prewarm counters.
pub struct PrewarmPool {
    sender: Option<Sender<Query>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<Pending>,
    cache: Arc<SharedCache>,
}

impl PrewarmPool {
    pub fn start(
        engine: Arc<QueryEngine>,
        cache: Arc<SharedCache>,
        workers: usize,
        queue_size: usize,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(Error::invalid("prewarm pool needs at least one worker"));
        }
        let (sender, receiver) = bounded(queue_size.max(1));
        let pending = Arc::new(Pending::default());

        let workers = (0..workers)
            .map(|id| {
                let receiver = receiver.clone();
                let engine = engine.clone();
                let cache = cache.clone();
                let pending = pending.clone();
                thread::Builder::new()
                    .name(format!("trendlens-prewarm-{}", id))
                    .spawn(move || Self::worker(receiver, engine, cache, pending))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(PrewarmPool {
            sender: Some(sender),
            workers,
            pending,
            cache,
        })
    }

    fn worker(
        receiver: Receiver<Query>,
        engine: Arc<QueryEngine>,
        cache: Arc<SharedCache>,
        pending: Arc<Pending>,
    ) {
        while let Ok(query) = receiver.recv() {
            prewarm(&engine, &cache, &query);
            pending.done();
        }
    }

    /// Queue `query`; returns false when it was dropped.
    pub fn submit(&self, query: Query) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        self.pending.add();
        match sender.try_send(query) {
            Ok(()) => true,
            Err(TrySendError::Full(query)) | Err(TrySendError::Disconnected(query)) => {
                self.pending.done();
                self.cache.record_prewarm_dropped();
                tracing::debug!(op = query.op(), "prewarm queue full, job dropped");
                false
            }
        }
    }

    /// Block until every queued job has finished or `timeout` passes.
    /// Returns true when the pool is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.pending.count.lock();
        while *count > 0 {
            if self.pending.idle.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Stop accepting jobs, drain the queue and join the workers.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("prewarm worker panicked");
            }
        }
    }
}

impl Drop for PrewarmPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Compute `query` unless it is already cached. The cache lock is never
/// held while the engine runs.
fn prewarm(engine: &QueryEngine, cache: &SharedCache, query: &Query) {
    let key = match query.cache_key() {
        Ok(key) => key,
        Err(e) => {
            cache.record_prewarm_failure();
            tracing::info!(op = query.op(), error = %e, "prewarm failure");
            return;
        }
    };
    if cache.peek(&key).is_some() {
        return;
    }

    match engine.execute(query) {
        Ok(output) => {
            cache.set(key.clone(), Arc::new(output));
            cache.record_prewarm_success();
            tracing::info!(key = %key, "prewarm success");
        }
        Err(e) => {
            cache.record_prewarm_failure();
            tracing::info!(key = %key, error = %e, "prewarm failure");
        }
    }
}
