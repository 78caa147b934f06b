use dagstream_core::SubscriberId;
use thiserror::Error;

/// Errors returned by [`HubHandle`](crate::hub::HubHandle) operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// The control loop has stopped; no command can be delivered.
    #[error("broadcast hub is closed")]
    Closed,

    /// The mailbox already handed its sending half to a hub.
    #[error("subscriber {id} is already registered")]
    AlreadyRegistered { id: SubscriberId },
}

pub type Result<T> = std::result::Result<T, HubError>;
