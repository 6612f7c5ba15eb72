//! Stream duplication for non-destructive body inspection.
//!
//! # Responsibilities
//! - Fork one byte stream into a peek branch and a forward branch
//! - Deliver every byte, in order, to the forward branch
//! - Deliver the first `peek_limit` bytes, in order, to the peek branch
//!
//! # Data Flow
//! ```text
//!                    ┌──▶ peek queue (≤ peek_limit bytes) ──▶ PeekBranch
//! source ──▶ pump ───┤
//!                    └──▶ forward queue (bounded chunks) ───▶ ForwardBranch
//! ```
//!
//! # Design Decisions
//! - A single pump task reads the source; branches never read it directly
//! - While the peek branch is filling, the pump never blocks on the forward
//!   queue; overflow goes to a backlog bounded by the peek limit
//! - Empty chunks are dropped, so every backlog entry advances the peek
//! - Once the peek branch is complete the pump awaits forward capacity, which
//!   pauses the source read instead of buffering
//! - Dropping the forward branch stops the pump

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

type ForwardItem = Result<Bytes, io::Error>;

/// Branch carrying at most `peek_limit` bytes of the source prefix.
#[derive(Debug)]
pub struct PeekBranch {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl Stream for PeekBranch {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Branch carrying the complete source, suitable as a request body stream.
#[derive(Debug)]
pub struct ForwardBranch {
    rx: mpsc::Receiver<ForwardItem>,
}

impl Stream for ForwardBranch {
    type Item = ForwardItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sending half of the peek branch with byte accounting.
struct PeekSender {
    tx: mpsc::UnboundedSender<Bytes>,
    remaining: usize,
}

impl PeekSender {
    /// Offer a chunk. Returns `false` once the branch wants no more data.
    fn offer(&mut self, chunk: &Bytes) -> bool {
        let take = chunk.len().min(self.remaining);
        if take > 0 && self.tx.send(chunk.slice(..take)).is_err() {
            return false;
        }
        self.remaining -= take;
        self.remaining > 0
    }
}

/// Fork `source` into a peek branch and a forward branch.
///
/// `forward_capacity` is the forward queue depth in chunks. Must be called
/// inside a tokio runtime.
pub fn fork<S, E>(source: S, peek_limit: usize, forward_capacity: usize) -> (PeekBranch, ForwardBranch)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (peek_tx, peek_rx) = mpsc::unbounded_channel();
    let (forward_tx, forward_rx) = mpsc::channel(forward_capacity.max(1));

    let peek = (peek_limit > 0).then(|| PeekSender {
        tx: peek_tx,
        remaining: peek_limit,
    });

    tokio::spawn(pump(Box::pin(source), peek, forward_tx));

    (PeekBranch { rx: peek_rx }, ForwardBranch { rx: forward_rx })
}

async fn pump<S, E>(mut source: Pin<Box<S>>, mut peek: Option<PeekSender>, forward: mpsc::Sender<ForwardItem>)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let mut backlog: VecDeque<Bytes> = VecDeque::new();

    loop {
        let next = tokio::select! {
            next = source.next() => next,
            _ = forward.closed() => {
                tracing::trace!("Forward branch dropped, stopping body pump");
                return;
            }
        };

        match next {
            // Empty chunks carry nothing and would pile up in the backlog.
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => {
                if let Some(sender) = peek.as_mut() {
                    if !sender.offer(&chunk) {
                        peek = None;
                    }
                }
                backlog.push_back(chunk);

                if peek.is_some() {
                    if !try_drain(&mut backlog, &forward) {
                        return;
                    }
                } else if !drain(&mut backlog, &forward).await {
                    return;
                }
            }
            Some(Err(e)) => {
                peek = None;
                tracing::debug!(error = %e, "Body source failed");
                if drain(&mut backlog, &forward).await {
                    let _ = forward.send(Err(io::Error::other(e.to_string()))).await;
                }
                return;
            }
            None => {
                drop(peek);
                drain(&mut backlog, &forward).await;
                return;
            }
        }
    }
}

/// Push backlog chunks without waiting. Returns `false` if the receiver is gone.
fn try_drain(backlog: &mut VecDeque<Bytes>, forward: &mpsc::Sender<ForwardItem>) -> bool {
    while let Some(chunk) = backlog.pop_front() {
        match forward.try_send(Ok(chunk)) {
            Ok(()) => {}
            Err(TrySendError::Full(Ok(chunk))) => {
                backlog.push_front(chunk);
                return true;
            }
            Err(TrySendError::Full(Err(_))) => return true,
            Err(TrySendError::Closed(_)) => return false,
        }
    }
    true
}

/// Push all backlog chunks, waiting for capacity. Returns `false` if the receiver is gone.
async fn drain(backlog: &mut VecDeque<Bytes>, forward: &mpsc::Sender<ForwardItem>) -> bool {
    while let Some(chunk) = backlog.pop_front() {
        if forward.send(Ok(chunk)).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn chunked(data: &[u8], size: usize) -> Vec<Result<Bytes, Infallible>> {
        data.chunks(size).map(|c| Ok(Bytes::copy_from_slice(c))).collect()
    }

    async fn collect_forward(forward: ForwardBranch) -> Vec<u8> {
        let mut out = Vec::new();
        let mut forward = forward;
        while let Some(item) = forward.next().await {
            out.extend_from_slice(&item.unwrap());
        }
        out
    }

    async fn collect_peek(peek: PeekBranch) -> Vec<u8> {
        peek.fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            acc
        })
        .await
    }

    #[tokio::test]
    async fn test_forward_round_trip() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        for chunk_size in [1, 7, 1024, 4096, 20_000] {
            let source = stream::iter(chunked(&data, chunk_size));
            let (peek, forward) = fork(source, 1024, 4);
            let peeked = collect_peek(peek).await;
            assert_eq!(peeked, data[..1024].to_vec(), "chunk size {}", chunk_size);
            assert_eq!(collect_forward(forward).await, data, "chunk size {}", chunk_size);
        }
    }

    #[tokio::test]
    async fn test_peek_dropped_early() {
        let data = vec![b'x'; 5000];
        let (peek, forward) = fork(stream::iter(chunked(&data, 100)), 1024, 2);
        drop(peek);
        assert_eq!(collect_forward(forward).await, data);
    }

    #[tokio::test]
    async fn test_forward_consumed_before_peek() {
        let data = b"{\"method\":\"initialize\"}".to_vec();
        let (peek, forward) = fork(stream::iter(chunked(&data, 3)), 1024, 1);
        assert_eq!(collect_forward(forward).await, data);
        assert_eq!(collect_peek(peek).await, data);
    }

    #[tokio::test]
    async fn test_short_body_ends_peek() {
        let data = b"short".to_vec();
        let (peek, forward) = fork(stream::iter(chunked(&data, 2)), 1024, 4);
        assert_eq!(collect_peek(peek).await, data);
        assert_eq!(collect_forward(forward).await, data);
    }

    #[tokio::test]
    async fn test_tiny_chunks_do_not_stall_peek() {
        // More single-byte chunks than the forward queue holds, nobody reading forward yet.
        let data = vec![b'a'; 2048];
        let (peek, forward) = fork(stream::iter(chunked(&data, 1)), 1024, 2);
        let peeked = tokio::time::timeout(std::time::Duration::from_secs(5), collect_peek(peek))
            .await
            .expect("peek branch must complete without forward consumption");
        assert_eq!(peeked.len(), 1024);
        assert_eq!(collect_forward(forward).await, data);
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let items: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err("connection reset".to_string()),
        ];
        let (peek, mut forward) = fork(stream::iter(items), 1024, 4);
        assert_eq!(collect_peek(peek).await, b"abc".to_vec());
        assert_eq!(forward.next().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        let err = forward.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(forward.next().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_peek_limit() {
        let data = b"payload".to_vec();
        let (peek, forward) = fork(stream::iter(chunked(&data, 2)), 0, 4);
        assert!(collect_peek(peek).await.is_empty());
        assert_eq!(collect_forward(forward).await, data);
    }

    #[tokio::test]
    async fn test_empty_chunks_are_dropped() {
        // A flood of empty frames must not be queued while the peek branch is open.
        let mut items: Vec<Result<Bytes, Infallible>> = (0..100_000).map(|_| Ok(Bytes::new())).collect();
        items.push(Ok(Bytes::from_static(b"{\"method\":\"tools/list\"}")));
        let (peek, forward) = fork(stream::iter(items), 1024, 4);

        let chunks: Vec<Bytes> = forward.map(|item| item.unwrap()).collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"{\"method\":\"tools/list\"}")]);
        assert_eq!(collect_peek(peek).await, b"{\"method\":\"tools/list\"}".to_vec());
    }

    #[tokio::test]
    async fn test_empty_chunks_then_stall_stay_bounded() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let source = stream::iter(0..1_000_000)
            .map(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Bytes::new())
            })
            .chain(stream::pending());
        let (_peek, mut forward) = fork(source, 1024, 4);

        // Every empty chunk is consumed and discarded without reaching the forward queue.
        let next = tokio::time::timeout(Duration::from_millis(200), forward.next()).await;
        assert!(next.is_err(), "no data should be forwarded");
        assert!(reads.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_source_paused_when_forward_stalls() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let source = stream::repeat_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Bytes::from_static(b"0123456789abcdef"))
        });
        // Four 16-byte chunks complete the peek, then the forward queue holds four more.
        let (peek, forward) = fork(source, 64, 4);
        assert_eq!(collect_peek(peek).await.len(), 64);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = reads.load(Ordering::SeqCst);
        assert!(settled <= 16, "source read {} times with a stalled forward branch", settled);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reads.load(Ordering::SeqCst), settled);
        drop(forward);
    }
}
