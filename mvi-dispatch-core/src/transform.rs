//! Stream transforms applied ahead of a handler's dispatch loop
//!
//! Transforms are chained via `HandlerBuilder::transform` and compose in
//! call order: each wraps the output of the previous one, and the strategy
//! loop consumes the final stream. Error items injected into the pipeline
//! pass through every built-in transform untouched so they reach the
//! handler's `catch` callback.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Sleep;
use tokio_stream::{Stream, StreamExt};

use crate::error::HandlerError;

/// The item stream flowing into a handler's strategy loop.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = Result<T, HandlerError>> + Send>>;

/// A stream-level transformation chained via `HandlerBuilder::transform`.
pub type Transform<T> = Box<dyn FnOnce(EventStream<T>) -> EventStream<T> + Send>;

/// Keep only items matching the predicate.
pub fn filter<T, P>(mut predicate: P) -> Transform<T>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    Box::new(move |stream| {
        Box::pin(stream.filter(move |item| match item {
            Ok(value) => predicate(value),
            Err(_) => true,
        }))
    })
}

/// Suppress consecutive duplicate items.
pub fn distinct<T>() -> Transform<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    Box::new(|stream| {
        let mut last: Option<T> = None;
        Box::pin(stream.filter(move |item| match item {
            Ok(value) => {
                if last.as_ref() == Some(value) {
                    false
                } else {
                    last = Some(value.clone());
                    true
                }
            }
            Err(_) => true,
        }))
    })
}

/// Emit only the latest item once no new item has arrived for `quiet`.
///
/// A pending item is flushed immediately when the upstream closes.
pub fn debounce<T>(quiet: Duration) -> Transform<T>
where
    T: Send + Unpin + 'static,
{
    Box::new(move |stream| {
        Box::pin(Debounce {
            inner: stream,
            quiet,
            pending: None,
            sleep: None,
            closed: false,
        })
    })
}

struct Debounce<T> {
    inner: EventStream<T>,
    quiet: Duration,
    pending: Option<T>,
    sleep: Option<Pin<Box<Sleep>>>,
    closed: bool,
}

// `pending` holds a bare `T`, so `poll_next`'s `get_mut` needs `T: Unpin`.
impl<T: Send + Unpin> Stream for Debounce<T> {
    type Item = Result<T, HandlerError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Drain everything the upstream has ready; each new item resets the
        // quiet window.
        while !this.closed {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(Some(Ok(value))) => {
                    this.pending = Some(value);
                    this.sleep = Some(Box::pin(tokio::time::sleep(this.quiet)));
                }
                Poll::Ready(None) => this.closed = true,
                Poll::Pending => break,
            }
        }

        if this.closed {
            return Poll::Ready(this.pending.take().map(Ok));
        }

        if this.pending.is_some() {
            if let Some(sleep) = this.sleep.as_mut() {
                if sleep.as_mut().poll(cx).is_ready() {
                    this.sleep = None;
                    return Poll::Ready(this.pending.take().map(Ok));
                }
            }
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    fn ok_stream(values: Vec<i32>) -> EventStream<i32> {
        Box::pin(tokio_stream::iter(values).map(Ok))
    }

    async fn collect(mut stream: EventStream<i32>) -> Vec<i32> {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("unexpected error item"));
        }
        out
    }

    #[tokio::test]
    async fn test_filter_drops_non_matching() {
        let stream = (filter(|n: &i32| n % 2 == 0))(ok_stream(vec![1, 2, 3, 4, 5, 6]));
        assert_eq!(collect(stream).await, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_filter_passes_errors_through() {
        let items: Vec<Result<i32, HandlerError>> = vec![Ok(1), Err("boom".into()), Ok(2)];
        let stream: EventStream<i32> = Box::pin(tokio_stream::iter(items));
        let mut stream = (filter(|_: &i32| false))(stream);

        let item = stream.next().await.expect("stream ended early");
        assert!(item.is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_distinct_suppresses_consecutive_duplicates() {
        let stream = (distinct())(ok_stream(vec![1, 1, 2, 2, 2, 3, 1]));
        assert_eq!(collect(stream).await, vec![1, 2, 3, 1]);
    }

    #[tokio::test]
    async fn test_debounce_emits_last_of_burst() {
        let stream = (debounce(Duration::from_millis(30)))(ok_stream(vec![1, 2, 3]));
        // The whole burst arrives before the quiet window elapses, then the
        // upstream closes and the pending item is flushed.
        assert_eq!(collect(stream).await, vec![3]);
    }

    #[tokio::test]
    async fn test_debounce_quiet_window_separates_items() {
        let (tx, rx) = mpsc::unbounded_channel::<i32>();
        let source: EventStream<i32> =
            Box::pin(UnboundedReceiverStream::new(rx).map(Ok));
        let mut stream = (debounce(Duration::from_millis(40)))(source);

        tx.send(1).expect("send");
        tx.send(2).expect("send");

        let first = tokio::time::timeout(Duration::from_millis(500), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended early")
            .expect("unexpected error item");
        assert_eq!(first, 2);

        tx.send(3).expect("send");
        drop(tx);

        let second = tokio::time::timeout(Duration::from_millis(500), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended early")
            .expect("unexpected error item");
        assert_eq!(second, 3);

        assert!(stream.next().await.is_none());
    }
}
