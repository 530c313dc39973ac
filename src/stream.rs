use std::pin::Pin;
use std::task::{Context, Poll};
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc::Receiver;
use crate::events::Notification;

/// Stream of [`Notification`]s. Only one instance can be active at a time,
/// dropping it makes the notifications available to the next one.
pub struct NotificationStream<'a> {
    mutex: &'a Mutex<Option<Receiver<Notification>>>,
    recv: Option<Receiver<Notification>>
}

impl<'a> NotificationStream<'a> {
    pub(crate) fn new(mutex: &'a Mutex<Option<Receiver<Notification>>>) -> Option<Self> {
        let recv = mutex.lock().take()?;

        Some(Self {
            mutex,
            recv: Some(recv)
        })
    }
}

impl<'a> Stream for NotificationStream<'a> {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().recv.as_mut() {
            Some(recv) => recv.poll_recv(cx),
            None => Poll::Ready(None)
        }
    }
}

impl<'a> Drop for NotificationStream<'a> {
    fn drop(&mut self) {
        *self.mutex.lock() = self.recv.take();
    }
}
