//! Shared building blocks for the dagstream workspace: configuration,
//! the common error type, and the JSON frames streamed to SSE clients.

pub mod config;
pub mod error;
pub mod types;

pub use config::DagstreamConfig;
pub use error::{DagstreamError, Result};
pub use types::{Dag, DagEdge, DagNode, StateFrame, SubscriberId};
