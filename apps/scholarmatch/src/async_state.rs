//! Async state container: adapts one operation contract into observable
//! `{data, loading, error}` lifecycle state.
//!
//! Overlapping `execute` calls are all started. Each call takes a fresh token
//! and only the holder of the latest token may write its completion, so a
//! slow early call can never overwrite the result of a later one. `reset`
//! also retires the outstanding token, which drops late completions of calls
//! that were in flight when it ran. Nothing is cancelled, retried or timed
//! out here.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::OperationResult;

/// Lifecycle state of one operation slot.
///
/// `loading == true` implies `error == None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsyncState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        AsyncState {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// How one `execute` call ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    Succeeded(T),
    Failed(String),
    /// A newer call or a `reset` took over; the result was discarded.
    Superseded,
}

impl<T> Completion<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            Completion::Succeeded(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Completion::Superseded)
    }
}

type Operation<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, OperationResult<T>> + Send + Sync>;

pub struct AsyncOperation<A, T> {
    name: &'static str,
    operation: Operation<A, T>,
    state: watch::Sender<AsyncState<T>>,
    latest: AtomicU64,
}

impl<A, T> AsyncOperation<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(name: &'static str, operation: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = OperationResult<T>> + Send + 'static,
    {
        let (state, _) = watch::channel(AsyncState::default());
        Self {
            name,
            operation: Arc::new(move |args| operation(args).boxed()),
            state,
            latest: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the wrapped operation and records its outcome.
    ///
    /// Failures never escape: they become `error` on the state and
    /// `Completion::Failed` for the caller.
    pub async fn execute(&self, args: A) -> Completion<T> {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let outcome = (self.operation)(args).await;

        let mut completion = Completion::Superseded;
        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != token {
                return false;
            }
            match outcome {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.loading = false;
                    state.error = None;
                    completion = Completion::Succeeded(data);
                }
                Err(err) => {
                    let message = err.to_string();
                    state.loading = false;
                    state.error = Some(message.clone());
                    completion = Completion::Failed(message);
                }
            }
            true
        });

        if completion.is_superseded() {
            debug!("{}: discarded stale completion of call #{token}", self.name);
        }
        completion
    }

    /// Back to `{None, false, None}`. In-flight calls keep running but their
    /// results are dropped.
    pub fn reset(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(AsyncState::default());
    }

    pub fn snapshot(&self) -> AsyncState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T>> {
        self.state.subscribe()
    }
}
