//! Chrome DevTools Protocol (CDP) layer
//!
//! Transport plumbing for talking to a Chrome/Chromium target: JSON-RPC framing
//! over WebSocket, a typed client for the handful of commands the session layer
//! needs, and browser-level control over the discovery HTTP endpoint.
//!
//! Module structure:
//! - `traits`: abstract interfaces (`CdpConnection`, `CdpClient`, `CdpBrowser`)
//! - `types`: JSON-RPC frame definitions
//! - `connection`: WebSocket connection implementation
//! - `client`: typed client implementation
//! - `browser`: discovery-endpoint browser controller
//! - `mock`: mock implementations for testing

pub mod browser;
pub mod client;
pub mod connection;
pub mod mock;
pub mod traits;
pub mod types;

pub use browser::CdpBrowserImpl;
pub use client::CdpClientImpl;
pub use connection::CdpWebSocketConnection;
pub use traits::{
    BrowserVersion, CdpBrowser, CdpClient, CdpConnection, CdpResponse, EvaluationResult,
    NavigationResult, ScreenshotFormat, TargetInfo,
};
