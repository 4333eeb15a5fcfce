//! Unified error types for Post-Scrapper

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Post-Scrapper
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Browser executable failed to spawn
    #[error("Launch failed: {0}")]
    Launch(String),

    /// CDP handshake or transport connect failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Bounded wait expired (endpoint readiness, command reply)
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Awaited DOM condition never satisfied within its bound
    #[error("Element wait timeout: {0}")]
    ElementTimeout(String),

    /// Navigation failed (bad DNS, network failure, aborted load)
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// start() called without a prior set_job()
    #[error("No job assigned to session")]
    NoJobAssigned,

    /// Operation requires a Ready session
    #[error("Session not ready: {0}")]
    SessionNotReady(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new launch error
    pub fn launch<S: Into<String>>(msg: S) -> Self {
        Error::Launch(msg.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new element wait timeout error
    pub fn element_timeout<S: Into<String>>(msg: S) -> Self {
        Error::ElementTimeout(msg.into())
    }

    /// Create a new navigation error
    pub fn navigation<S: Into<String>>(msg: S) -> Self {
        Error::Navigation(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new session-not-ready error
    pub fn session_not_ready<S: Into<String>>(msg: S) -> Self {
        Error::SessionNotReady(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
