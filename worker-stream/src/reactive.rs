//! Channel-backed stream used by the reactive types

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Message stream for reactive consumption
///
/// Ends once every sender is dropped.
pub struct MessageStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> MessageStream<T> {
    /// Create a new message stream from a receiver
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self { receiver }
    }
}

impl<T> Stream for MessageStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_ends_when_senders_drop() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        drop(tx);

        let values: Vec<i32> = MessageStream::new(rx).collect().await;
        assert_eq!(values, vec![1, 2]);
    }
}
