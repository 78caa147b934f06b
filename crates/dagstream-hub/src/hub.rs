use std::collections::HashMap;

use dagstream_core::{
    config::{Backpressure, HubConfig},
    SubscriberId,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    error::{HubError, Result},
    mailbox::{Mailbox, MailboxSender},
    subscription::Subscription,
    types::{Delivery, HubStats},
};

/// Requests handled by the control loop, one at a time, in arrival order.
enum Command {
    Register {
        sender: MailboxSender,
        ack: oneshot::Sender<usize>,
    },
    Unregister {
        id: SubscriberId,
        ack: oneshot::Sender<bool>,
    },
    Publish {
        message: String,
        ack: oneshot::Sender<()>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Owner of the membership set. Run it with [`BroadcastHub::run`] and talk to
/// it through the [`HubHandle`] returned by [`BroadcastHub::new`].
pub struct BroadcastHub {
    commands: mpsc::Receiver<Command>,
    members: HashMap<SubscriberId, MailboxSender>,
    backpressure: Backpressure,
    stats: HubStats,
}

impl BroadcastHub {
    pub fn new(config: &HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let hub = Self {
            commands: rx,
            members: HashMap::new(),
            backpressure: config.backpressure,
            stats: HubStats::default(),
        };
        let handle = HubHandle {
            tx,
            mailbox_capacity: config.mailbox_capacity.max(1),
        };
        (hub, handle)
    }

    /// Control loop. Returns once every [`HubHandle`] has been dropped.
    pub async fn run(mut self) {
        info!(backpressure = ?self.backpressure, "broadcast hub started");
        while let Some(cmd) = self.commands.recv().await {
            self.handle(cmd).await;
        }
        info!(
            subscribers = self.members.len(),
            "all hub handles dropped, broadcast hub stopped"
        );
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Register { sender, ack } => {
                let count = self.register(sender);
                let _ = ack.send(count);
            }
            Command::Unregister { id, ack } => {
                let removed = self.unregister(&id);
                let _ = ack.send(removed);
            }
            Command::Publish { message, ack } => {
                self.publish(message).await;
                let _ = ack.send(());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn register(&mut self, sender: MailboxSender) -> usize {
        let id = sender.id().clone();
        self.members.insert(id.clone(), sender);
        info!(subscriber = %id, subscribers = self.members.len(), "client added");
        self.members.len()
    }

    fn unregister(&mut self, id: &SubscriberId) -> bool {
        match self.members.remove(id) {
            Some(sender) => {
                sender.close();
                info!(subscriber = %id, subscribers = self.members.len(), "client removed");
                true
            }
            None => {
                debug!(subscriber = %id, "unregister for unknown subscriber ignored");
                false
            }
        }
    }

    /// Hand `message` to every current member.
    ///
    /// Under `Block` a full mailbox holds up the whole pass, and every later
    /// command, until its consumer reads.
    async fn publish(&mut self, message: String) {
        self.stats.published += 1;
        let mut closed = Vec::new();

        for (id, sender) in &self.members {
            let outcome = match self.backpressure {
                Backpressure::Block => sender.enqueue(message.clone()).await,
                Backpressure::DropNew => sender.try_enqueue(message.clone()),
            };
            match outcome {
                Delivery::Delivered => self.stats.delivered += 1,
                Delivery::Dropped => {
                    self.stats.dropped += 1;
                    debug!(subscriber = %id, "mailbox full, message dropped");
                }
                Delivery::Closed => closed.push(id.clone()),
            }
        }

        for id in closed {
            if let Some(sender) = self.members.remove(&id) {
                sender.close();
                warn!(
                    subscriber = %id,
                    subscribers = self.members.len(),
                    "consumer went away without unregistering, removed"
                );
            }
        }
    }

    fn snapshot(&self) -> HubStats {
        HubStats {
            subscribers: self.members.len(),
            ..self.stats
        }
    }
}

/// Cloneable entry point to a running [`BroadcastHub`].
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<Command>,
    mailbox_capacity: usize,
}

impl HubHandle {
    /// Add `mailbox` to the membership set.
    ///
    /// Resolves after the control loop has inserted it, so anything published
    /// afterwards reaches it. Returns the new member count.
    ///
    /// The mailbox keeps its sending half unless the command actually reaches
    /// the loop, so a failed attempt against a closed hub can be retried.
    pub async fn register(&self, mailbox: &mut Mailbox) -> Result<usize> {
        if mailbox.is_registered() {
            return Err(HubError::AlreadyRegistered {
                id: mailbox.id().clone(),
            });
        }
        let permit = self.tx.reserve().await.map_err(|_| HubError::Closed)?;
        let sender = mailbox.take_sender().ok_or_else(|| HubError::AlreadyRegistered {
            id: mailbox.id().clone(),
        })?;
        let (ack, done) = oneshot::channel();
        permit.send(Command::Register { sender, ack });
        done.await.map_err(|_| HubError::Closed)
    }

    /// Remove and close the mailbox with `id`.
    ///
    /// Returns `false` when it was not a member. The consumer must keep reading
    /// (or [`Mailbox::drain_to_closed`]) until this resolves, otherwise a
    /// blocked delivery to it would keep the loop from getting here.
    pub async fn unregister(&self, id: &SubscriberId) -> Result<bool> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Unregister {
            id: id.clone(),
            ack,
        })
        .await?;
        done.await.map_err(|_| HubError::Closed)
    }

    /// Deliver `message` to every member registered when the loop reaches it.
    ///
    /// Resolves once the fan-out pass is complete. Under `Block` that means
    /// every member's mailbox has taken the message, so a full, unread mailbox
    /// keeps the caller waiting.
    pub async fn publish(&self, message: impl Into<String>) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Publish {
            message: message.into(),
            ack,
        })
        .await?;
        done.await.map_err(|_| HubError::Closed)
    }

    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        done.await.map_err(|_| HubError::Closed)
    }

    /// Create a mailbox with the hub's configured capacity and register it.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let mut mailbox = Mailbox::new(self.mailbox_capacity);
        self.register(&mut mailbox).await?;
        Ok(Subscription::new(mailbox, self.clone()))
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| HubError::Closed)
    }
}

/// Build a hub from `config` and run its loop on its own task.
pub fn spawn_hub(config: &HubConfig) -> HubHandle {
    let (hub, handle) = BroadcastHub::new(config);
    tokio::spawn(hub.run());
    handle
}
