use std::future::Future;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Spawns a tokio task that runs inside `span`, so its log output carries the
/// span's fields (e.g. the channel a worker belongs to).
#[inline]
pub fn spawn_task<T>(span: tracing::Span, future: T) -> JoinHandle<T::Output>
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    tokio::spawn(future.instrument(span))
}
