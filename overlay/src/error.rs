//! Engine setup errors

use thiserror::Error;

/// Errors while starting the engine's threads
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn {name} thread")]
    SpawnThread {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start event runtime")]
    Runtime(#[source] std::io::Error),

    #[error("failed to set up controller: {0}")]
    Setup(String),

    #[error("event thread exited before confirming startup")]
    StartupAborted,
}
