use dagstream_core::SubscriberId;
use tracing::{debug, warn};

use crate::{error::Result, hub::HubHandle, mailbox::Mailbox};

/// A registered mailbox tied to the hub it is registered with.
///
/// Dropping a `Subscription` drains the mailbox in the background and
/// unregisters it, which is all a transport has to do when its client goes
/// away.
pub struct Subscription {
    id: SubscriberId,
    mailbox: Option<Mailbox>,
    hub: HubHandle,
}

impl Subscription {
    pub(crate) fn new(mailbox: Mailbox, hub: HubHandle) -> Self {
        Self {
            id: mailbox.id().clone(),
            mailbox: Some(mailbox),
            hub,
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Next broadcast message, or `None` once the hub has closed the mailbox.
    pub async fn recv(&mut self) -> Option<String> {
        match self.mailbox.as_mut() {
            Some(mailbox) => mailbox.recv().await,
            None => None,
        }
    }

    /// Unregister and wait for it to take effect.
    ///
    /// Returns how many undelivered messages were discarded on the way out.
    pub async fn unsubscribe(mut self) -> Result<usize> {
        let Some(mailbox) = self.mailbox.take() else {
            return Ok(0);
        };
        let drain = mailbox.drain_to_closed();
        self.hub.unregister(&self.id).await?;
        Ok(drain.await.unwrap_or(0))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(mailbox) = self.mailbox.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                subscriber = %self.id,
                "subscription dropped outside a runtime, not unregistered"
            );
            return;
        };

        let drain = mailbox.drain_to_closed();
        let hub = self.hub.clone();
        let id = self.id.clone();
        runtime.spawn(async move {
            if let Err(e) = hub.unregister(&id).await {
                debug!(subscriber = %id, error = %e, "unregister after disconnect failed");
            }
            let _ = drain.await;
        });
    }
}
