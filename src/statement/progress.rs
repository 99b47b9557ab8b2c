//! Progress reporting for long-running statements.
//!
//! The executor builds a `ProgressEvent` per poll attempt and pushes it into
//! whatever sink the caller supplied. A sink that fails means the caller is
//! gone, so the executor stops.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::client::StatementState;

/// A progress update for one poll attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    /// Poll attempts completed so far.
    pub progress: u32,
    /// Total attempt budget.
    pub total: u32,
}

impl ProgressEvent {
    /// Builds the event reported before the given poll attempt.
    pub fn for_attempt(
        attempts: u32,
        max_attempts: u32,
        poll_interval: Duration,
        state: StatementState,
    ) -> Self {
        let waited = poll_interval.as_secs() * u64::from(attempts);
        Self {
            message: format!(
                "Statement execution in progress ({waited} seconds), current status: {state}"
            ),
            progress: attempts,
            total: max_attempts,
        }
    }
}

/// Emission failure; treated as caller disconnection.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Receives progress events for a single invocation.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkError>;
}

/// Forwards progress events into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    sender: mpsc::Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(sender: mpsc::Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SinkError("caller disconnected".to_string()))
    }
}
