//! `dagstream-hub`: in-process broadcast hub for long-lived stream consumers.
//!
//! # Overview
//!
//! A [`BroadcastHub`] owns the set of registered subscriber mailboxes and runs
//! a single control loop. Every membership change and every publish is a
//! command on one queue, so the loop is the only writer of the membership set
//! and no locking is involved. Callers talk to the loop through a cloneable
//! [`HubHandle`].
//!
//! # Delivery
//!
//! | Backpressure | Full mailbox                                   |
//! |--------------|------------------------------------------------|
//! | `Block`      | loop waits for the consumer (head-of-line)     |
//! | `DropNew`    | message skipped for that subscriber, counted   |

pub mod error;
pub mod hub;
pub mod mailbox;
pub mod subscription;
pub mod types;

pub use dagstream_core::config::Backpressure;
pub use error::{HubError, Result};
pub use hub::{spawn_hub, BroadcastHub, HubHandle};
pub use mailbox::Mailbox;
pub use subscription::Subscription;
pub use types::HubStats;
