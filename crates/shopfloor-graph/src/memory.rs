use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::{GraphError, GraphSession, GraphStore, Params, Record};

type Responder = dyn Fn(&str, &Params) -> Result<Vec<Record>, GraphError> + Send + Sync;

/// A statement observed by [`MemoryGraphStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub session_id: String,
    pub statement: String,
    pub params: Params,
}

/// In-process graph store that answers through a closure and records every
/// statement it receives along with the session that ran it.
#[derive(Clone)]
pub struct MemoryGraphStore {
    inner: Arc<Inner>,
}

struct Inner {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
    latency_ms: AtomicU64,
    next_session: AtomicU64,
    open: AtomicUsize,
    peak_open: AtomicUsize,
}

impl MemoryGraphStore {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Params) -> Result<Vec<Record>, GraphError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                responder: Box::new(responder),
                calls: Mutex::new(Vec::new()),
                latency_ms: AtomicU64::new(0),
                next_session: AtomicU64::new(1),
                open: AtomicUsize::new(0),
                peak_open: AtomicUsize::new(0),
            }),
        }
    }

    /// Answer every statement with the same rows.
    pub fn with_rows(rows: Vec<Record>) -> Self {
        Self::new(move |_, _| Ok(rows.clone()))
    }

    /// Fail every statement with `err`.
    pub fn failing(err: GraphError) -> Self {
        Self::new(move |_, _| Err(err.clone()))
    }

    /// Delay each statement, which makes concurrent sessions overlap.
    pub fn set_latency(&self, latency: Duration) {
        self.inner
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        match self.inner.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sessions currently held by callers.
    pub fn open_sessions(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Highest number of sessions held at the same time.
    pub fn peak_open_sessions(&self) -> usize {
        self.inner.peak_open.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> u64 {
        self.inner.next_session.load(Ordering::SeqCst) - 1
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        let seq = self.inner.next_session.fetch_add(1, Ordering::SeqCst);
        let now_open = self.inner.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_open.fetch_max(now_open, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            id: format!("mem-{seq}"),
            inner: Arc::clone(&self.inner),
        }))
    }

    fn label(&self) -> String {
        "memory".to_string()
    }
}

struct MemorySession {
    id: String,
    inner: Arc<Inner>,
}

#[async_trait]
impl GraphSession for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&mut self, statement: &str, params: &Params) -> Result<Vec<Record>, GraphError> {
        let latency = self.inner.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let call = RecordedCall {
            session_id: self.id.clone(),
            statement: statement.to_string(),
            params: params.clone(),
        };
        match self.inner.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
        (self.inner.responder)(statement, params)
    }

    async fn close(self: Box<Self>) {}
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}
