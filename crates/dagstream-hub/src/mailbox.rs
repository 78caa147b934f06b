use dagstream_core::SubscriberId;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::types::Delivery;

/// Per-subscriber FIFO queue of pending messages.
///
/// The mailbox is created by the transport when a client connects. While it is
/// unregistered it still owns its own sending half; [`HubHandle::register`]
/// moves that half into the hub, which from then on is the only party able to
/// enqueue into it or close it.
///
/// [`HubHandle::register`]: crate::hub::HubHandle::register
pub struct Mailbox {
    id: SubscriberId,
    rx: mpsc::Receiver<String>,
    sender: Option<MailboxSender>,
}

impl Mailbox {
    /// Create an empty, open mailbox holding at most `capacity` undelivered
    /// messages. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = SubscriberId::new();
        Self {
            sender: Some(MailboxSender { id: id.clone(), tx }),
            id,
            rx,
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// True once the sending half has been handed to a hub.
    pub fn is_registered(&self) -> bool {
        self.sender.is_none()
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the hub has closed the mailbox and every message
    /// queued before the close has been read.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Read and discard messages until the mailbox is closed.
    ///
    /// Used when the consumer has gone away but the hub may still be
    /// delivering to it: the hub's enqueue never waits on a reader that will
    /// not come back. The task resolves to the number of discarded messages.
    pub fn drain_to_closed(mut self) -> JoinHandle<usize> {
        // an unregistered mailbox would otherwise keep itself open forever
        drop(self.sender.take());
        let id = self.id.clone();
        tokio::spawn(async move {
            let mut discarded = 0usize;
            while self.rx.recv().await.is_some() {
                discarded += 1;
            }
            debug!(subscriber = %id, discarded, "mailbox drained");
            discarded
        })
    }

    pub(crate) fn take_sender(&mut self) -> Option<MailboxSender> {
        self.sender.take()
    }
}

/// Hub-side half of a [`Mailbox`].
pub(crate) struct MailboxSender {
    id: SubscriberId,
    tx: mpsc::Sender<String>,
}

impl MailboxSender {
    pub(crate) fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Append to the queue, waiting while it is full.
    pub(crate) async fn enqueue(&self, message: String) -> Delivery {
        match self.tx.send(message).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Closed,
        }
    }

    /// Append to the queue if there is room, otherwise drop the message.
    pub(crate) fn try_enqueue(&self, message: String) -> Delivery {
        match self.tx.try_send(message) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Close the mailbox. Consuming `self` makes a second close impossible.
    pub(crate) fn close(self) {
        debug!(subscriber = %self.id, "mailbox closed");
    }
}
