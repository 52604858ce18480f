//! One-shot replies and the fix stream handed to callers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use async_channel::{Receiver, Sender, unbounded};
use futures::FutureExt;
use futures::Stream;
use futures::channel::oneshot;
use log::debug;

use crate::{LocationError, LocationFix, LocationResult};

/// Resolves once with the result of a one-shot call.
///
/// If the bridge abandons the call because a newer one took its slot, the
/// reply resolves with [`LocationError::Superseded`].
#[must_use = "a reply does nothing unless awaited"]
pub struct Reply<T> {
    receiver: oneshot::Receiver<LocationResult<T>>,
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").finish_non_exhaustive()
    }
}

impl<T> Reply<T> {
    /// A reply paired with the responder that will complete it.
    pub(crate) fn channel() -> (Responder<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        (Responder { sender }, Self { receiver })
    }

    /// A reply that is already complete.
    pub(crate) fn ready(result: LocationResult<T>) -> Self {
        let (responder, reply) = Self::channel();
        responder.send(result);
        reply
    }

    /// The result, if the reply has completed.
    ///
    /// Returns `None` while the call is still outstanding.
    pub fn try_take(&mut self) -> Option<LocationResult<T>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(LocationError::Superseded)),
        }
    }
}

impl<T> Future for Reply<T> {
    type Output = LocationResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut()
            .receiver
            .poll_unpin(cx)
            .map(|result| result.unwrap_or(Err(LocationError::Superseded)))
    }
}

/// The completing half of a [`Reply`].
pub(crate) struct Responder<T> {
    sender: oneshot::Sender<LocationResult<T>>,
}

impl<T> fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder").finish_non_exhaustive()
    }
}

impl<T> Responder<T> {
    pub(crate) fn send(self, result: LocationResult<T>) {
        if self.sender.send(result).is_err() {
            debug!("reply dropped by caller before completion");
        }
    }
}

/// An item on the fix stream: a fix or the error that ended the stream.
pub type StreamItem = LocationResult<LocationFix>;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Receiving end of a location subscription.
///
/// Yields fixes until the subscription is cancelled or fails. Dropping it is
/// noticed on the next fix, which then stops provider updates.
pub struct LocationStream {
    id: u64,
    receiver: Pin<Box<Receiver<StreamItem>>>,
}

impl fmt::Debug for LocationStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationStream")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl LocationStream {
    pub(crate) fn channel() -> (EventSink, Self) {
        let id = NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded();
        (
            EventSink { id, sender },
            Self {
                id,
                receiver: Box::pin(receiver),
            },
        )
    }

    /// Identifier of this subscription.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Take the next queued item without waiting.
    pub fn try_next(&self) -> Option<StreamItem> {
        self.receiver.try_recv().ok()
    }

    /// Whether the bridge has let go of this subscription and every queued
    /// item has been taken.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.receiver.is_closed() && self.receiver.is_empty()
    }
}

impl Stream for LocationStream {
    type Item = StreamItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.as_mut().poll_next(cx)
    }
}

/// Sending end of a location subscription, owned by the bridge.
#[derive(Debug)]
pub(crate) struct EventSink {
    id: u64,
    sender: Sender<StreamItem>,
}

impl EventSink {
    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    /// Deliver an item. Returns `false` once the listener has gone away.
    pub(crate) fn send(&self, item: StreamItem) -> bool {
        self.sender.try_send(item).is_ok()
    }
}
