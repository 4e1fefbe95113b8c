//! Boxed future wrapper used at trait seams that must stay dyn-compatible

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A pinned, boxed, `Send` future.
///
/// Traits such as [`ProcessRunner`](crate::install::launcher::ProcessRunner) return this instead of
/// `impl Future` so they can be stored as `Arc<dyn Trait>`.
pub struct AsyncTask<T> {
    inner: Pin<Box<dyn Future<Output = T> + Send + 'static>>,
}

impl<T> AsyncTask<T> {
    /// Box an arbitrary future
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: Box::pin(fut),
        }
    }

    /// A task that resolves immediately with `value`
    pub fn ready(value: T) -> Self
    where
        T: Send + 'static,
    {
        Self::from_future(std::future::ready(value))
    }
}

impl<T> Future for AsyncTask<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T, E> AsyncTask<Result<T, E>> {
    /// Map the error value once the task completes
    pub fn map_err<F, G>(self, f: F) -> AsyncTask<Result<T, G>>
    where
        F: FnOnce(E) -> G + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        G: Send + 'static,
    {
        AsyncTask::from_future(async move { self.await.map_err(f) })
    }
}
